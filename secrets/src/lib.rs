// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # IronmanCountdown Secrets
//!
//! Out-of-band management of the per-environment secret bundle the API
//! functions read at runtime.
//!
//! The bundle is one JSON object of strings stored under
//! `<app>/<environment>/secrets`, the same name the API stack grants its
//! functions read access to. It goes from absent to present on `init` and is
//! never deleted by this tool.
//!
//! ## Modules
//!
//! - [`commands`]: init, get, set, update, update-all and delete
//! - [`configuration`]: CLI argument parsing with clap
//! - [`constants`]: prompts, usage text and placeholder settings
//! - [`errors`]: error types
//! - [`models`]: the zeroizing secret bundle, masking and placeholder tokens
//! - [`store`]: the remote store trait with AWS Secrets Manager and in-memory
//!   implementations
//! - [`terminal`]: line based operator I/O
//!
//! ## Usage
//!
//! ```bash
//! secrets init '{"OPENAI_API_KEY":"TBD"}'
//! secrets update-all
//! ENVIRONMENT=prod secrets get --plain
//! ```

pub mod commands;
pub mod configuration;
pub mod constants;
pub mod errors;
pub mod models;
pub mod store;
pub mod terminal;
