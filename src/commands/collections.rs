use anyhow::Result;
use std::env;

use crate::Config;

/// List registered collections.
pub async fn run() -> Result<()> {
    let root = env::current_dir()?;
    let config = Config::load(&root)?;

    println!("Registered collections:");
    for collection in &config.collections.registered {
        println!("  {}", collection);
    }

    Ok(())
}
