use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mediarag")]
#[command(author, version, about = "Hybrid retrieval engine for a broadcast-media RAG assistant")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Hybrid search across all collections and the keyword index
    Search {
        /// Search query
        query: String,

        /// Maximum number of results to return
        #[arg(short = 'k', long)]
        limit: Option<usize>,

        /// Restrict the search to these collections
        #[arg(short, long, value_delimiter = ',')]
        collections: Option<Vec<String>>,

        /// Only return results from this category
        #[arg(long)]
        category: Option<String>,

        /// Emit results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Vector search grouped by collection, without merging
    SearchCollections {
        /// Search query
        query: String,

        /// Maximum number of results per collection
        #[arg(short = 'k', long)]
        limit: Option<usize>,

        /// Only return results from this category
        #[arg(long)]
        category: Option<String>,

        /// Emit results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered collections
    Collections,

    /// Show engine status and metrics
    Status {
        /// Output metrics in Prometheus format
        #[arg(long)]
        prometheus: bool,
    },
}
