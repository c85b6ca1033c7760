//! Trellis CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Incremental asset-graph construction for module bundling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Project root path (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the asset graph for the given entries
    Build {
        /// Entry files, relative to the project root
        entries: Vec<String>,

        /// Logical build name
        #[arg(long, default_value = "default")]
        name: String,

        /// Output directory recorded on targets
        #[arg(long)]
        dist_dir: Option<PathBuf>,

        /// Upper bound on concurrently running requests
        #[arg(long, default_value = "8")]
        concurrency: usize,

        /// Write the finished graph as Graphviz DOT to this path
        #[arg(long)]
        dot: Option<PathBuf>,
    },
    /// Clear the cache
    Clear,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("trellis={}", log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Trellis v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Project root: {}", cli.root.display());

    match cli.command {
        Commands::Build {
            entries,
            name,
            dist_dir,
            concurrency,
            dot,
        } => commands::build(cli.root, entries, name, dist_dir, concurrency, dot).await,
        Commands::Clear => commands::clear(cli.root),
        Commands::Version => {
            println!("Trellis v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
