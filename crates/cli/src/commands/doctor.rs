//! `ragchat doctor` — Diagnose configuration and backend health.

use ragchat_config::{AppConfig, redact_url};

use crate::backends::Backends;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 ragchat Doctor — System Diagnostics");
    println!("=====================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found at {}", config_path.display());
    } else {
        println!("  ⚠️  No config file, using defaults (run `ragchat config --init`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  Fix the configuration before running other checks.");
            return Err(e.into());
        }
    };

    println!(
        "     Vector store:   {} ({}, collection '{}')",
        config.vector_store.backend,
        redact_url(&config.vector_store.connection_string),
        config.vector_store.collection
    );
    println!(
        "     Document store: {} ({}, collection '{}')",
        config.document_store.backend,
        redact_url(&config.document_store.url),
        config.document_store.collection
    );

    let backends = match Backends::connect(&config).await {
        Ok(backends) => {
            println!("  ✅ Similarity index and document store reachable");
            Some(backends)
        }
        Err(e) => {
            println!("  ❌ Backend connection failed: {e}");
            issues += 1;
            None
        }
    };

    if let Some(backends) = &backends {
        match (backends.index.count().await, backends.store.count().await) {
            (Ok(indexed), Ok(stored)) => {
                println!("  ✅ {indexed} indexed entries, {stored} stored documents");
                if indexed == 0 || stored == 0 {
                    println!("  ⚠️  Nothing to retrieve yet — run `ragchat ingest <PATH>`");
                    issues += 1;
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                println!("  ❌ Could not count documents: {e}");
                issues += 1;
            }
        }

        let provider = &backends.provider;
        match provider.health_check().await {
            Ok(true) => {
                println!("  ✅ Provider '{}' reachable", provider.name());
                match provider.list_models().await {
                    Ok(models) if models.iter().any(|m| m.starts_with(&config.default_model)) => {
                        println!("  ✅ Model '{}' available", config.default_model);
                    }
                    Ok(models) if !models.is_empty() => {
                        println!("  ⚠️  Model '{}' not listed by the provider", config.default_model);
                        issues += 1;
                    }
                    _ => {}
                }
            }
            Ok(false) => {
                println!("  ❌ Provider '{}' returned an error status", provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Provider '{}' unreachable: {e}", provider.name());
                issues += 1;
            }
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
