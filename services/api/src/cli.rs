use crate::report::{run_rank, run_slate, RankArgs, SlateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use hiring_ops::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Hiring Ops",
    about = "Score, shortlist, and export candidate batches from the command line or over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a candidate file remotely and print the ranked table
    Rank(RankArgs),
    /// Request a team slate for a candidate file and print the cards
    Slate(SlateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the configured scoring API base URL
    #[arg(long)]
    pub(crate) scoring_url: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Rank(args) => run_rank(args).await,
        Command::Slate(args) => run_slate(args).await,
    }
}
