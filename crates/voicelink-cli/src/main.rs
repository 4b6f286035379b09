//! voicelink binary: token request and command listener.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use voicelink_cli::{listen, request_token, resolve_config_path, shutdown_signal, CliError};
use voicelink_session::{load_config, Config};

const DEFAULT_CONFIG_PATH: &str = "voicelink.toml";

#[derive(Debug, Parser)]
#[command(name = "voicelink", version, about = "Voice agent session tools")]
struct Cli {
    /// Config file. Falls back to VOICELINK_CONFIG_PATH, then voicelink.toml.
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch a room credential and report its length.
    Token,
    /// Join the agent's room and print requested navigations until interrupted.
    Listen,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (resolved_config_path, config_source) =
        resolve_config_path(cli.config.clone(), std::env::var("VOICELINK_CONFIG_PATH").ok());
    let selected_config_path = resolved_config_path.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);

    let config = match load_config(Some(selected_config_path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("voicelink: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config);

    tracing::info!(
        source = config_source,
        path = selected_config_path,
        "resolved startup configuration path"
    );

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("voicelink: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run(command: Command, config: &Config) -> Result<(), CliError> {
    config.connection.validate()?;

    match command {
        Command::Token => {
            let credential = request_token(config).await?;
            println!("token issued ({} chars)", credential.len());
        }
        Command::Listen => {
            listen(
                config,
                |destination: &str, options| {
                    if options.replace {
                        println!("replace {destination}");
                    } else {
                        println!("navigate {destination}");
                    }
                },
                shutdown_signal(),
            )
            .await?;
        }
    }
    Ok(())
}
