use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paperwhisper::{cli, Settings};

#[derive(Parser)]
#[command(name = "paperwhisper")]
#[command(about = "Ask questions about a document with retrieval-augmented generation", long_about = None)]
#[command(version)]
struct Cli {
    /// Optional TOML settings file; environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Give up on ingestion or answering after this many seconds
    #[arg(long, global = true, default_value = "300")]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, chunk and index a document
    Ingest {
        /// PDF, Markdown or plain text file
        #[arg(short, long)]
        input: PathBuf,

        /// Write the index to the data directory
        #[arg(long)]
        persist: bool,

        /// Rebuild even if an index already exists
        #[arg(long)]
        force_rebuild: bool,
    },

    /// Print the passages closest to a question
    Query {
        /// PDF, Markdown or plain text file
        #[arg(short, long)]
        input: PathBuf,

        /// Question text
        #[arg(short, long)]
        query: String,

        /// Number of passages to return (default: TOP_K setting)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Answer a question from the document
    Ask {
        /// PDF, Markdown or plain text file
        #[arg(short, long)]
        input: PathBuf,

        /// Question text
        #[arg(short, long)]
        query: String,

        /// Number of passages to use as context (default: TOP_K setting)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Remove the persisted index
    Clear,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paperwhisper=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let timeout = Duration::from_secs(cli.timeout_secs);

    cli::block_on(run(cli.command, settings, timeout))?
}

async fn run(command: Commands, settings: Settings, timeout: Duration) -> anyhow::Result<()> {
    match command {
        Commands::Ingest {
            input,
            persist,
            force_rebuild,
        } => {
            cli::ingest(settings, input, persist, force_rebuild, timeout).await?;
        }

        Commands::Query {
            input,
            query,
            top_k,
        } => {
            cli::query(settings, input, query, top_k, timeout).await?;
        }

        Commands::Ask {
            input,
            query,
            top_k,
        } => {
            cli::ask(settings, input, query, top_k, timeout).await?;
        }

        Commands::Clear => {
            cli::clear(settings).await?;
        }
    }

    Ok(())
}
