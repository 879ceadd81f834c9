use anyhow::Result;
use std::env;

use crate::error::RetrievalError;
use crate::model::{CollectionSet, MetadataFilter, SearchResult};
use crate::Config;

/// Run the hybrid search command.
pub async fn run(
    query: &str,
    limit: Option<usize>,
    collections: Option<Vec<String>>,
    category: Option<String>,
    json: bool,
) -> Result<()> {
    let root = env::current_dir()?;
    let config = Config::load(&root)?;
    let k = limit.unwrap_or(config.search.default_k);

    let retriever = super::build_retriever(&config, &root).await?;

    let collections = collections
        .map(CollectionSet::new)
        .transpose()
        .map_err(anyhow::Error::from)?;
    let filter = category.map(|c| MetadataFilter::field_equals("category", c));

    let results = match retriever.search(query, k, collections, filter).await {
        Ok(results) => results,
        Err(e @ RetrievalError::TotalRetrievalFailure { .. }) => {
            eprintln!("Retrieval failed: every backend errored or timed out.");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results found for: {}", query);
        println!("\nMake sure documents have been ingested into the collections");
        return Ok(());
    }

    println!("Found {} results for: \"{}\"\n", results.len(), query);

    for (i, result) in results.iter().enumerate() {
        print_result(i + 1, result);
    }

    Ok(())
}

fn print_result(rank: usize, result: &SearchResult) {
    let source = result
        .metadata
        .get("source")
        .map(String::as_str)
        .unwrap_or("Unknown");
    let category = result
        .metadata
        .get("category")
        .map(String::as_str)
        .unwrap_or("Unknown");

    match result.distance {
        Some(distance) => println!(
            "{}. {} [{}] (distance: {:.4})",
            rank, source, category, distance
        ),
        None => println!("{}. {} [{}] (keyword match)", rank, source, category),
    }

    let preview = format_preview(&result.content, 5);
    println!("{}", preview);
    println!();
}

/// Format a preview of the content, limiting to max_lines
pub(crate) fn format_preview(content: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let preview_lines = if lines.len() > max_lines {
        let mut preview: Vec<&str> = lines.iter().take(max_lines).copied().collect();
        preview.push("   ...");
        preview
    } else {
        lines
    };

    preview_lines
        .iter()
        .map(|line| format!("   {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}
