// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # IronmanCountdown Infra
//!
//! Resource graphs for the IronmanCountdown training tracker, rendered as
//! CloudFormation templates for an external provisioning engine.
//!
//! ## Architecture
//!
//! ```text
//! synth options -> App::build -> Frontend / Api / Pipeline stacks
//!                      |
//!                      +-> App::finalize (global tags) -> CloudAssembly
//!                                                           |
//!                                     cdk.out/*.template.json + manifest.json
//! ```
//!
//! Nothing here calls AWS. The same inputs always produce byte identical
//! templates, so names and export names can be relied on by other tools.
//!
//! ## Modules
//!
//! - [`app`]: stack composition, global tagging and assembly output
//! - [`configuration`]: CLI argument parsing with clap
//! - [`constants`]: names, limits and defaults
//! - [`constructs`]: access role and artifacts bucket builders shared by stacks
//! - [`environment`]: deployment environment resolution and retention table
//! - [`errors`]: synthesis error types
//! - [`naming`]: deterministic stack, bucket, log group and ARN names
//! - [`policy`]: IAM statements and principals
//! - [`resources`]: resource constructs and their template rendering
//! - [`stacks`]: the frontend, api and pipeline stack builders
//! - [`template`]: intrinsic expressions, outputs and stack definitions
//!
//! ## Usage
//!
//! ```bash
//! synth --environment preview-alice --with-assets false --output cdk.out
//! ```

pub mod app;
pub mod configuration;
pub mod constants;
pub mod constructs;
pub mod environment;
pub mod errors;
pub mod naming;
pub mod policy;
pub mod resources;
pub mod stacks;
pub mod template;
