use clap::Parser;
use classroom_mvc::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run(&cli.config_dir).await,
        Command::Settings(args) => cli::settings::run(&cli.config_dir, args),
    }
}
