// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

pub mod api;
pub mod frontend;
pub mod pipeline;

pub use api::{ApiProps, build as build_api};
pub use frontend::{FrontendProps, build as build_frontend};
pub use pipeline::{PipelineProps, build as build_pipeline};
