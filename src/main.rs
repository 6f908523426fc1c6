use clap::Parser;
use funnel_experiment_engine::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Analyze(args) => cli::analyze::run(args).await,
    }
}
