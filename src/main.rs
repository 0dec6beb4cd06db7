mod cli;
mod logging;

use std::path::Path;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use exn::ResultExt;
use narrate_config::Config;
use narrate_pipeline::error::{ErrorKind, Result};
use narrate_pipeline::{Pipeline, Report, RunOptions, document_format};

use crate::cli::{Cli, Command};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let Some(Command::Run { document: Some(document), summarize }) = cli.command else {
        // Nothing to do is not a failure.
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    };

    match run(cli.config.as_deref(), &document, RunOptions { summarize }).await {
        Ok(report) => {
            print!("{report}");
            ExitCode::SUCCESS
        },
        Err(err) => {
            eprintln!("{err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(config: Option<&Path>, document: &Path, options: RunOptions) -> Result<Report> {
    // No setup happens for a document that can't be narrated.
    let format = document_format(document)?;
    tracing::debug!(%format, "Accepted document");
    let config = Config::load(config).or_raise(|| ErrorKind::Setup)?;
    tracing::debug!(?config, "Loaded configuration");
    let pipeline = Pipeline::from_config(&config)?;
    pipeline.run(document, options).await
}
