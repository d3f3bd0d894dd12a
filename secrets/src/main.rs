// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::process::ExitCode;

use clap::Parser;
use ironman_infra::environment::ProcessEnv;
use ironman_secrets::commands::{self, Flags};
use ironman_secrets::configuration::SecretsOptions;
use ironman_secrets::store::AwsSecretStore;
use ironman_secrets::terminal::Terminal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries command output, logs go to stderr
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let options = match SecretsOptions::try_parse() {
        Ok(options) => options,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let stdin = std::io::stdin();
    let mut terminal = Terminal::new(stdin.lock(), std::io::stdout());
    let command = options.command();

    // usage never needs credentials or a region
    if command.is_usage() {
        return match commands::usage(&command, &mut terminal) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("{err}");
                ExitCode::FAILURE
            }
        };
    }

    let secret_name = match options.resolve_secret_name(&ProcessEnv::capture()) {
        Ok(name) => name,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("[secrets] using {}", secret_name);

    let store = AwsSecretStore::connect(secret_name).await;
    let flags = Flags {
        force: options.force,
        plain: options.plain,
    };

    match commands::run(command, flags, &store, &mut terminal).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!("[secrets] {:?}", err);
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
