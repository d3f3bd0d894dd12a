// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Deterministic resource and stack names.
//!
//! Every name is a pure function of the stack id, the account and the
//! environment, so synthesizing twice with the same inputs yields the same
//! physical names and export names.

use crate::constants::{
    ACCOUNT_ID_LENGTH, APP_NAME, APP_SLUG, MAX_BUCKET_NAME_LENGTH,
    MAX_ORIGIN_ACCESS_CONTROL_NAME_LENGTH, PIPELINE_STACK_ID,
};
use crate::environment::DeploymentEnvironment;
use crate::errors::InfraError;
use crate::template::{Expr, StackEnv};

pub fn frontend_stack_id(environment: &DeploymentEnvironment) -> String {
    format!("{APP_NAME}Frontend-{environment}")
}

pub fn api_stack_id(environment: &DeploymentEnvironment) -> String {
    format!("{APP_NAME}Api-{environment}")
}

pub fn pipeline_stack_id() -> String {
    PIPELINE_STACK_ID.to_string()
}

/// Name of the secret bundle shared by the API stack and the secrets tool.
pub fn secret_name(app_name: &str, environment: &str) -> String {
    format!("{app_name}/{environment}/secrets")
}

/// `<prefix>-<account>` bucket name, checked against the S3 length limit.
///
/// When the account is only known at deploy time the check assumes a
/// 12-digit account id.
pub fn bucket_name(prefix: &str, env: &StackEnv) -> Result<Expr, InfraError> {
    let prefix = prefix.to_lowercase();
    let account_length = env
        .account
        .as_ref()
        .map(String::len)
        .unwrap_or(ACCOUNT_ID_LENGTH);

    let length = prefix.len() + 1 + account_length;
    if length > MAX_BUCKET_NAME_LENGTH {
        return Err(InfraError::InvalidName(
            format!("{prefix}-<account>"),
            format!("bucket names are limited to {MAX_BUCKET_NAME_LENGTH} characters, got {length}"),
        ));
    }

    Ok(Expr::concat([Expr::literal(format!("{prefix}-")), env.account()]))
}

pub fn website_bucket_name(stack_id: &str, env: &StackEnv) -> Result<Expr, InfraError> {
    bucket_name(stack_id, env)
}

pub fn log_bucket_name(stack_id: &str, env: &StackEnv) -> Result<Expr, InfraError> {
    bucket_name(&format!("{stack_id}-logs"), env)
}

pub fn artifacts_bucket_name(env: &StackEnv) -> Result<Expr, InfraError> {
    bucket_name(&format!("{APP_SLUG}-pipeline-artifacts"), env)
}

/// `<stack>-oac`, checked against the CloudFront origin access control
/// name limit.
pub fn origin_access_control_name(stack_id: &str) -> Result<String, InfraError> {
    let name = format!("{stack_id}-oac");
    if name.len() > MAX_ORIGIN_ACCESS_CONTROL_NAME_LENGTH {
        return Err(InfraError::InvalidName(
            name.clone(),
            format!(
                "origin access control names are limited to {MAX_ORIGIN_ACCESS_CONTROL_NAME_LENGTH} characters, got {}",
                name.len()
            ),
        ));
    }
    Ok(name)
}

pub fn function_name(stack_id: &str, function: &str) -> String {
    format!("{stack_id}-{function}")
}

pub fn function_log_group_name(function_name: &str) -> String {
    format!("/aws/lambda/{function_name}")
}

pub fn api_log_group_name(stack_id: &str) -> String {
    format!("/aws/apigateway/{stack_id}")
}

/// Partial ARN of a secret by name; matches every version suffix when
/// followed by a wildcard.
pub fn secret_arn(env: &StackEnv, secret_name: &str) -> Expr {
    Expr::concat([
        Expr::literal(format!("arn:aws:secretsmanager:{}:", env.region)),
        env.account(),
        Expr::literal(format!(":secret:{secret_name}")),
    ])
}

pub fn bucket_arn(bucket: &Expr) -> Expr {
    Expr::concat([Expr::literal("arn:aws:s3:::"), bucket.clone()])
}

pub fn bucket_objects_arn(bucket: &Expr) -> Expr {
    Expr::concat([bucket_arn(bucket), Expr::literal("/*")])
}

pub fn distribution_arn(env: &StackEnv, distribution_id: Expr) -> Expr {
    Expr::concat([
        Expr::literal("arn:aws:cloudfront::"),
        env.account(),
        Expr::literal(":distribution/"),
        distribution_id,
    ])
}

pub fn lambda_arn(env: &StackEnv, function_name: &str) -> Expr {
    Expr::concat([
        Expr::literal(format!("arn:aws:lambda:{}:", env.region)),
        env.account(),
        Expr::literal(format!(":function:{function_name}")),
    ])
}
