//! GRM CLI - Command line tool for Ganges river monitoring.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "grm-cli",
    version,
    about = "Ganges river monitoring toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: grm_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    grm_cmd::run(cli.command).await
}
