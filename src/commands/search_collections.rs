use anyhow::Result;
use std::env;

use super::search::format_preview;
use crate::model::MetadataFilter;
use crate::Config;

/// Run the grouped per-collection search command.
pub async fn run(
    query: &str,
    limit: Option<usize>,
    category: Option<String>,
    json: bool,
) -> Result<()> {
    let root = env::current_dir()?;
    let config = Config::load(&root)?;
    let k = limit.unwrap_or(config.search.default_k);

    let retriever = super::build_retriever(&config, &root).await?;
    let filter = category.map(|c| MetadataFilter::field_equals("category", c));

    let grouped = retriever.search_per_collection(query, k, filter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&grouped)?);
        return Ok(());
    }

    for (collection, results) in &grouped {
        println!("== {} ({} results)", collection, results.len());

        for (i, result) in results.iter().enumerate() {
            let distance = result
                .distance
                .map(|d| format!("{:.4}", d))
                .unwrap_or_else(|| "-".to_string());
            println!("{}. {} (distance: {})", i + 1, result.id, distance);
            println!("{}", format_preview(&result.content, 3));
        }
        println!();
    }

    Ok(())
}
