//! Basic usage example for the arXiv Digest library.
//!
//! Runs one search against arXiv and enriches the results with an
//! OpenAI-compatible engine (a local Ollama server by default). Set
//! `OPENAI_API_KEY` and `ARXIV_DIGEST_TRANSFORM__BASE_URL` to use a hosted one.

use arxiv_digest::config::load_config;
use arxiv_digest::models::{BooleanOp, SearchRequest, SortChoice};
use arxiv_digest::pipeline::Pipeline;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("arxiv_digest=info"))
        .init();

    // Defaults plus any ARXIV_DIGEST_* environment overrides
    let config = load_config(None)?;

    let pipeline = Pipeline::from_config(&config)?
        .without_exporter()
        .on_progress(Arc::new(|done, total| eprintln!("  enriched {}/{}", done, total)));

    let request = SearchRequest::from_input("Large Language Model, Agent", "cs.AI, cs.CL")
        .keywords_op(BooleanOp::Or)
        .categories_op(BooleanOp::Or)
        .max_results(3)
        .sort(SortChoice::SubmittedNewest);

    let table = pipeline.search(&request).await?;
    println!("Found {} entries\n", table.len());

    for (i, entry) in table.rows().iter().enumerate() {
        println!("{}. {}", i + 1, entry.title);
        println!("   Summary:    {}", entry.summarized_abstract);
        println!("   Translated: {}", entry.translated_summary);
    }

    Ok(())
}
