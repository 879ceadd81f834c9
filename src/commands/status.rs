use anyhow::Result;
use std::env;

use crate::backends::TantivyKeywordBackend;
use crate::metrics::{gather_metrics, MetricSnapshot};
use crate::Config;

/// Show engine configuration and metrics.
pub async fn run(prometheus: bool) -> Result<()> {
    if prometheus {
        print!("{}", gather_metrics());
        return Ok(());
    }

    let root = env::current_dir()?;
    let config = Config::load(&root)?;
    let data_dir = Config::data_dir(&root);

    println!("mediarag status");
    println!("  data dir:        {}", data_dir.display());
    println!("  vector db:       {}", config.vector_db_path(&root).display());
    println!("  embedding model: {}", config.embeddings.model);
    println!("  default k:       {}", config.search.default_k);
    println!("  backend timeout: {}ms", config.search.backend_timeout_ms);
    println!("  collections:     {}", config.collections.registered.join(", "));
    println!(
        "  keyword index:   {}",
        if TantivyKeywordBackend::exists(&data_dir) {
            "present"
        } else {
            "missing"
        }
    );

    let snapshot = MetricSnapshot::capture();
    println!("\nmetrics (this process)");
    println!("  search requests:  {}", snapshot.search_requests_total);
    println!("  avg latency:      {:.4}s", snapshot.search_latency_avg);
    println!("  avg results:      {:.1}", snapshot.search_results_avg);
    println!("  backend failures: {}", snapshot.backend_failures_total);

    Ok(())
}
