use clap::Parser;
use color_eyre::eyre::{Report, Result, WrapErr};
use kb_fasttree::run::{self, Context, Params};
use kb_fasttree::status::Status;
use kb_fasttree::{cli, cli::Cli, Config};
use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Report> {
    // ------------------------------------------------------------------------
    // CLI Setup

    // Parse CLI parameters
    let args = Cli::parse();

    // initialize color_eyre crate for colorized logs
    color_eyre::install()?;

    // Set logging/verbosity level via RUST_LOG
    std::env::set_var("RUST_LOG", args.verbosity.to_string());

    // initialize env_logger crate for logging/verbosity level
    env_logger::init();

    match args.command {
        cli::Command::Run(args) => {
            let config = Config::new(&args)?;
            let text = std::fs::read_to_string(&args.params)
                .wrap_err_with(|| format!("Failed to read params: {:?}", args.params))?;
            let params: Params = serde_json::from_str(&text)
                .wrap_err_with(|| format!("Failed to parse params: {:?}", args.params))?;

            // stop FastTree on Ctrl-C
            let cancel = CancellationToken::new();
            let token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, stopping FastTree.");
                    token.cancel();
                }
            });

            let context = Context {
                scratch: config.scratch.clone(),
                runner: config.runner().with_cancel(cancel),
                workspace: config.workspace(),
                staging: config.file_staging(),
                reports: config.reports(),
            };
            let output = run::fasttree(&params, &context).await?;
            info!("Report: {} ({})", output.report_name, output.report_ref);
            write_json(&output, &args.output)?;
        }
        cli::Command::Status => write_json(&Status::new(), &None)?,
    }

    Ok(())
}

/// Writes pretty JSON to a file, or to stdout.
fn write_json<T: Serialize>(value: &T, path: &Option<PathBuf>) -> Result<(), Report> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => std::fs::write(path, json).wrap_err_with(|| format!("Failed to write: {path:?}"))?,
        None => println!("{json}"),
    }
    Ok(())
}
