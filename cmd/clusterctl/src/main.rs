//! clusterctl - operator CLI for the document clustering engine.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{
    CleanupCommand, ClustersCommand, HistoryCommand, IngestCommand, MergeCommand,
    RefreshCommand, RelatedCommand, ReprocessCommand,
};

/// clusterctl - deduplicate and cluster embedded documents.
///
/// Documents are read from YAML or JSON files that already carry their
/// embeddings. State lives in a single redb file.
///
/// Configuration is read from ~/.analyst/clusterctl/config.yaml.
#[derive(Parser)]
#[command(name = "clusterctl")]
#[command(about = "Duplicate detection and topic clustering for embedded documents")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.analyst/clusterctl/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Database file (overrides the config)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Input file (YAML or JSON)
    #[arg(short = 'f', long = "file", global = true)]
    pub input: Option<String>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register documents from a file and cluster the embedded ones
    Ingest(IngestCommand),
    /// Detach a document from its cluster and run it through again
    Reprocess(ReprocessCommand),
    /// List documents on the same topic that are not duplicates
    Related(RelatedCommand),
    /// Fold one cluster into another
    Merge(MergeCommand),
    /// Recount members and recompute priority scores
    Refresh(RefreshCommand),
    /// List active clusters by priority
    Clusters(ClustersCommand),
    /// Deactivate old clusters that have no members
    Cleanup(CleanupCommand),
    /// Show the merge audit trail
    History(HistoryCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Ingest(cmd) => cmd.run(&cli),
        Commands::Reprocess(cmd) => cmd.run(&cli),
        Commands::Related(cmd) => cmd.run(&cli),
        Commands::Merge(cmd) => cmd.run(&cli),
        Commands::Refresh(cmd) => cmd.run(&cli),
        Commands::Clusters(cmd) => cmd.run(&cli),
        Commands::Cleanup(cmd) => cmd.run(&cli),
        Commands::History(cmd) => cmd.run(&cli),
    }
}
