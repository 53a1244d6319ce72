use clap::{Parser, Subcommand};

mod commands;

use commands::{AnalyzeArgs, HistoryArgs, PredictArgs, ReviewArgs};

#[derive(Parser)]
#[command(name = "settle")]
#[command(about = "Options positioning analytics and settlement scenarios", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single open-interest snapshot
    Analyze(AnalyzeArgs),
    /// Predict settlement scenarios from a directory of snapshots
    Predict(PredictArgs),
    /// Score a stored prediction against the actual settlement price
    Review(ReviewArgs),
    /// List stored predictions and their review results
    History(HistoryArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Analyze(args) => commands::run_analyze(args)?,
        Commands::Predict(args) => commands::run_predict(args).await?,
        Commands::Review(args) => commands::run_review(args)?,
        Commands::History(args) => commands::run_history(args)?,
    }

    Ok(())
}
