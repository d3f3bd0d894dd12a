// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use clap::{ArgAction, Parser, Subcommand};
use ironman_infra::constants::APP_NAME;
use ironman_infra::environment::{ProcessEnv, resolve_environment};
use ironman_infra::naming;

use crate::errors::SecretsError;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Manages the IronmanCountdown secret bundle", long_about = None)]
#[command(disable_help_subcommand = true)]
pub struct SecretsOptions {
    #[arg(long, default_value = APP_NAME, env("APP_NAME"))]
    pub app_name: String,
    /// Falls back to `preview-<user>` when unset.
    #[arg(long, env("ENVIRONMENT"))]
    pub environment: Option<String>,
    /// Overrides `<app>/<environment>/secrets`.
    #[arg(long, env("SECRET_NAME"))]
    pub secret_name: Option<String>,
    /// Overwrite an existing bundle on init.
    #[arg(long, global = true, default_value = "false", action = ArgAction::SetTrue)]
    pub force: bool,
    /// Print values unmasked on get.
    #[arg(long, global = true, default_value = "false", action = ArgAction::SetTrue)]
    pub plain: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Create or overwrite the bundle from a JSON object of strings
    Init { json: String },
    /// Print every key with its value masked
    Get,
    /// Set one key
    Set { key: String, value: String },
    /// Interactively review one key
    Update { key: String },
    /// Interactively review every key, writing once at the end
    UpdateAll,
    /// Remove one key
    Delete { key: String },
    /// Print usage
    Help,
    #[command(external_subcommand)]
    Unknown(Vec<String>),
}

impl Command {
    /// Commands that never touch the remote store.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Help | Self::Unknown(_))
    }
}

impl SecretsOptions {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Help)
    }

    /// `SECRET_NAME` when given, else `<app>/<environment>/secrets`.
    pub fn resolve_secret_name(&self, process: &ProcessEnv) -> Result<String, SecretsError> {
        if let Some(name) = self.secret_name.as_deref().filter(|name| !name.trim().is_empty()) {
            return Ok(name.to_string());
        }
        let environment = resolve_environment(self.environment.as_deref(), process)?;
        Ok(naming::secret_name(&self.app_name, environment.as_str()))
    }
}

impl Default for SecretsOptions {
    fn default() -> Self {
        SecretsOptions {
            app_name: APP_NAME.to_string(),
            environment: None,
            secret_name: None,
            force: false,
            plain: false,
            command: None,
        }
    }
}
