// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use ft2_installer::{
    cli::ArgsError, parse_args, ui, Completion, Context, InquirePrompter, Manifest, Parsed,
    Pipeline, PipelineError, SystemRunner,
};

use anyhow::Result;
use std::{env, error::Error, process::exit};
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    let layer = fmt::layer()
        .compact()
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry().with(layer).with(filter).init();

    match run().await {
        Ok(code) => exit(code),
        Err(err) => {
            error!("{err:?}");
            ui::print_fatal(&format!("{err:#}"));
            exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    let manifest = Manifest::load()?;
    let config = match parse_args(env::args_os(), &manifest) {
        Ok(Parsed::Run(config)) => config,
        Ok(Parsed::Help(usage)) => {
            print!("{usage}");
            return Ok(0);
        }
        Err(ArgsError::Usage(usage)) => {
            eprint!("{usage}");
            return Ok(1);
        }
        Err(err) => {
            report(&err);
            return Ok(1);
        }
    };
    debug!("run with {config:?}");

    let runner = SystemRunner::new();
    let prompter = InquirePrompter::new();
    let pipeline = Pipeline::new(Context::new(&config, &manifest, &runner, &prompter));

    match pipeline.run().await {
        Ok(Completion::Finished) => Ok(0),
        Ok(Completion::Halted { phase, .. }) => {
            debug!("halted at {phase}");
            Ok(0)
        }
        Err(err) => {
            report(&err);
            Ok(1)
        }
    }
}

/// Print fatal error line followed by its causes.
fn report(err: &(dyn Error + 'static)) {
    ui::print_fatal(&err.to_string());

    // INVARIANT: Display of a pipeline error already includes the phase error.
    let mut source = match err.downcast_ref::<PipelineError>() {
        Some(err) => err.source.source(),
        None => err.source(),
    };
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}
