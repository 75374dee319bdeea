//! `ragchat ingest` — Load JSON documents into the store and the index.

use std::path::PathBuf;

use ragchat_core::error::RetrievalError;
use ragchat_retrieval::{IngestOutcome, Ingestor};

use crate::backends::Backends;

#[derive(Default)]
struct Tally {
    ingested: usize,
    existing: usize,
    rejected: usize,
    failed: usize,
}

impl Tally {
    fn record(&mut self, label: &str, result: &Result<IngestOutcome, RetrievalError>) {
        match result {
            Ok(IngestOutcome::Ingested { id, store, index }) => {
                if !store.inserted() && !index.inserted() {
                    self.existing += 1;
                    println!("  = {label}: '{id}' already exists");
                } else {
                    self.ingested += 1;
                    println!("  + {label}: '{id}' (store: {store:?}, index: {index:?})");
                }
            }
            Ok(IngestOutcome::Rejected { reason }) => {
                self.rejected += 1;
                println!("  ! {label}: rejected, {reason}");
            }
            Err(e) => {
                self.failed += 1;
                eprintln!("  [Error] {label}: {e}");
            }
        }
    }
}

pub async fn run(paths: Vec<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let backends = Backends::connect(&config).await?;
    let ingestor = Ingestor::new(backends.store, backends.index);

    let mut tally = Tally::default();

    for path in &paths {
        if path.is_dir() {
            for report in ingestor.ingest_dir(path).await? {
                tally.record(&report.path.display().to_string(), &report.result);
            }
        } else {
            let result = ingestor.ingest_file(path).await;
            tally.record(&path.display().to_string(), &result);
        }
    }

    println!();
    println!(
        "  {} ingested, {} already present, {} rejected, {} failed",
        tally.ingested, tally.existing, tally.rejected, tally.failed
    );

    if tally.failed > 0 {
        return Err(format!("{} document(s) failed to ingest", tally.failed).into());
    }
    Ok(())
}
