// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::app::DeploymentContext;
use crate::constants::{
    DEFAULT_BRANCH, DEFAULT_BUILD_PATH, DEFAULT_OUTPUT_DIR, DEFAULT_REGION, DEFAULT_REPOSITORY,
};

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Synthesizes the IronmanCountdown stacks", long_about = None)]
pub struct SynthOptions {
    /// Source connection for the pipeline; the pipeline stack is skipped without it.
    #[arg(long, env("CODE_CONNECTION_ARN"))]
    pub code_connection_arn: Option<String>,
    #[arg(long, default_value = DEFAULT_REPOSITORY)]
    pub repository_name: String,
    #[arg(long, default_value = DEFAULT_BRANCH)]
    pub branch_name: String,
    #[arg(long, default_value = "false", action = ArgAction::SetTrue)]
    pub pipeline_only: bool,
    /// Deployment environment; falls back to `ENVIRONMENT`, then `preview-<user>`.
    #[arg(long)]
    pub environment: Option<String>,
    #[arg(long, default_value = DEFAULT_BUILD_PATH)]
    pub build_path: PathBuf,
    #[arg(long, default_value = "true", action = ArgAction::Set)]
    pub with_assets: bool,
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,
    #[arg(long, env("CDK_DEFAULT_ACCOUNT"))]
    pub account: Option<String>,
    #[arg(long, default_value = DEFAULT_REGION, env("CDK_DEFAULT_REGION"))]
    pub region: String,
}

impl Default for SynthOptions {
    fn default() -> Self {
        SynthOptions {
            code_connection_arn: None,
            repository_name: DEFAULT_REPOSITORY.to_string(),
            branch_name: DEFAULT_BRANCH.to_string(),
            pipeline_only: false,
            environment: None,
            build_path: PathBuf::from(DEFAULT_BUILD_PATH),
            with_assets: true,
            output: PathBuf::from(DEFAULT_OUTPUT_DIR),
            account: None,
            region: DEFAULT_REGION.to_string(),
        }
    }
}

impl From<&SynthOptions> for DeploymentContext {
    fn from(options: &SynthOptions) -> Self {
        DeploymentContext {
            environment: options.environment.clone(),
            code_connection_arn: options
                .code_connection_arn
                .clone()
                .filter(|arn| !arn.trim().is_empty()),
            repository_name: options.repository_name.clone(),
            branch_name: options.branch_name.clone(),
            pipeline_only: options.pipeline_only,
            build_path: options.build_path.clone(),
            with_assets: options.with_assets,
            account: options.account.clone().filter(|account| !account.is_empty()),
            region: options.region.clone(),
        }
    }
}
