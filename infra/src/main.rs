// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use ironman_infra::app::{App, DeploymentContext};
use ironman_infra::configuration::SynthOptions;
use ironman_infra::environment::ProcessEnv;
use tracing_subscriber::EnvFilter;

fn run(options: SynthOptions) -> anyhow::Result<()> {
    let context = DeploymentContext::from(&options);
    let process = ProcessEnv::capture();

    let assembly = App::build(&context, &process)
        .context("unable to build stacks")?
        .finalize();

    for warning in &assembly.warnings {
        eprintln!("warning: {warning}");
    }

    let written = assembly
        .write_to(&options.output)
        .with_context(|| format!("unable to write assembly to {}", options.output.display()))?;

    tracing::info!(
        "[synth] wrote {} files for {} stacks",
        written.len(),
        assembly.stacks.len()
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with_current_span(false)
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let options = SynthOptions::parse();
    tracing::info!("[synth] {:?}", &options);

    match run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("[synth] {:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
