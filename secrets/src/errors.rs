// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

#[derive(thiserror::Error, Debug)]
pub enum SecretsError {
    #[error("secret {0} already exists. Use --force to overwrite.")]
    AlreadyExists(String),
    #[error("invalid secrets JSON: {0}")]
    InvalidJson(String),
    #[error("key not found: {0}")]
    KeyNotFound(String),
    #[error("secret store error: {0}")]
    Store(String),
    #[error(transparent)]
    Environment(#[from] ironman_infra::errors::InfraError),
    #[error("unable to generate random bytes")]
    Random,
    #[error("terminal error: {0}")]
    Io(#[from] std::io::Error),
}
