//! trustflow binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use trustflow_cli::cli::{Cli, Commands};
use trustflow_cli::commands::{CheckConfigCommand, CoordsCommand, SettleCommand};
use trustflow_cli::output::OutputFormat;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), trustflow_cli::CliError> {
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Settle(args) => {
            SettleCommand::new().execute(&mut stdout, &format, &args)?;
        }
        Commands::EncodeCoords { triples } => {
            CoordsCommand::new().encode(&mut stdout, &format, &triples)?;
        }
        Commands::DecodeCoords { hex } => {
            CoordsCommand::new().decode(&mut stdout, &format, &hex)?;
        }
        Commands::CheckConfig { path } => {
            CheckConfigCommand::new().execute(&mut stdout, &format, &path)?;
        }
    }

    Ok(())
}
