//! `ragchat search` — Print the fused context for a query.

use ragchat_engine::session;

use crate::backends::Backends;

pub async fn run(query: String, num_results: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    if query.trim().is_empty() {
        return Err("query must not be empty".into());
    }

    let config = super::load_config()?;
    let backends = Backends::connect(&config).await?;
    let k = num_results.unwrap_or(config.chat.num_results);
    let timeout = (config.chat.retrieval_timeout_secs > 0)
        .then(|| std::time::Duration::from_secs(config.chat.retrieval_timeout_secs));

    let retrieved = session::retrieve(
        backends.index.as_ref(),
        backends.store.as_ref(),
        &query,
        k,
        timeout,
    )
    .await?;

    println!(
        "  {} matches, {} documents, {} fused\n",
        retrieved.matches.len(),
        retrieved.records.len(),
        retrieved.fused.len()
    );

    for (rank, item) in retrieved.fused.iter().enumerate() {
        let id = item.id().map(|id| id.0).unwrap_or_default();
        println!("  {}. [{:.4}] {id}", rank + 1, item.score);
        println!("     Summary:  {}", item.document.summary());
        println!("     Keywords: {}", item.document.keywords().join(", "));
        println!();
    }

    Ok(())
}
