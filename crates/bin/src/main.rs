use std::{process::ExitCode, sync::Arc, time::Duration};

use clap::Parser;
use mycloud::{Client, ClientConfig, store::FileTokenStore};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};
use output::OutputFormat;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so `--json` output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("mycloud=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::builder(&cli.api_url)
        .request_timeout(Duration::from_secs(cli.timeout))
        .build()?;
    let store = Arc::new(FileTokenStore::open(&cli.state_file)?);
    tracing::debug!(state_file = %cli.state_file.display(), "opened session store");
    let client = Client::open(config, store)?;
    let format = OutputFormat::from_flag(cli.json);

    match cli.command {
        Commands::Login(args) => commands::auth::login(&client, &args, format).await,
        Commands::Register(args) => commands::auth::register(&client, &args, format).await,
        Commands::Logout => commands::auth::logout(&client, format).await,
        Commands::Whoami => commands::auth::whoami(&client, format).await,
        Commands::Status => commands::auth::status(&client, format).await,
        Commands::Files(command) => commands::files::run(&client, command, format).await,
        Commands::Admin(command) => commands::admin::run(&client, command, format).await,
        Commands::Health => commands::health::run(&client, format).await,
    }
}
