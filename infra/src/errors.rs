// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

#[derive(thiserror::Error, Debug)]
pub enum InfraError {
    #[error("invalid environment '{0}': {1}")]
    InvalidEnvironment(String, &'static str),
    #[error("invalid resource name '{0}': {1}")]
    InvalidName(String, String),
    #[error("capability '{0}' requires a scope that was not provided")]
    MissingScope(&'static str),
    #[error("asset directory not found: {0}")]
    MissingAssets(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
