use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{IndexRequest, SearchRequest};
use flags::{EmbedModeFlag, KindFlag};
use std::path::PathBuf;
use workspace::{Overrides, Workspace};

mod commands;
mod config;
mod flags;
mod progress;
mod workspace;

#[derive(Parser)]
#[command(name = "drift")]
#[command(about = "Find documentation that has drifted from the code", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace root (defaults to current directory)
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Config file (defaults to <root>/.drift/config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override embedding backend in this process
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedModeFlag>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index every code and documentation file in the workspace
    Index(IndexArgs),

    /// Re-index only files added, modified or removed since the last pass
    Sync(OutputArgs),

    /// Report documentation that no longer matches the code
    Check(CheckArgs),

    /// Search indexed chunks by meaning
    Search(SearchArgs),

    /// Show what the index holds
    Stats(OutputArgs),

    /// Remove every entry from the index
    Clear,
}

#[derive(Args)]
struct IndexArgs {
    /// Discard the existing index before indexing
    #[arg(long)]
    full: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct OutputArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CheckArgs {
    /// Only check docs under this path, or matching this glob
    #[arg(long)]
    path: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SearchArgs {
    /// Search query
    query: String,

    /// Maximum number of results
    #[arg(short = 'k', long, default_value_t = 10)]
    top_k: usize,

    /// Only return chunks of this kind
    #[arg(long, value_enum)]
    kind: Option<KindFlag>,

    /// Drop results scoring below this
    #[arg(long)]
    min_score: Option<f32>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // ort logs every session detail at info
    if !cli.verbose {
        builder.filter_module("ort", log::LevelFilter::Off);
    }
    builder.target(env_logger::Target::Stderr).init();

    let overrides = Overrides {
        config: cli.config.clone(),
        embed_mode: cli.embed_mode.map(EmbedModeFlag::as_domain),
    };
    let ws = Workspace::resolve(&cli.root, &overrides).await?;

    let status = match cli.command {
        Commands::Index(args) => {
            commands::run_index(
                &ws,
                IndexRequest {
                    full: args.full,
                    json: args.json,
                    quiet: cli.quiet,
                },
            )
            .await?
        }
        Commands::Sync(args) => commands::run_sync(&ws, args.json, cli.quiet).await?,
        Commands::Check(args) => commands::run_check(&ws, args.path.as_deref(), args.json).await?,
        Commands::Search(args) => {
            commands::run_search(
                &ws,
                SearchRequest {
                    query: args.query,
                    top_k: args.top_k,
                    kind: args.kind.map(KindFlag::as_domain),
                    min_score: args.min_score,
                    json: args.json,
                },
            )
            .await?
        }
        Commands::Stats(args) => commands::run_stats(&ws, args.json).await?,
        Commands::Clear => commands::run_clear(&ws).await?,
    };

    if status != 0 {
        std::process::exit(status);
    }
    Ok(())
}
