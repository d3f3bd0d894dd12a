// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Deployment environment resolution and the environment class table.
//!
//! Every component that varies by environment (log retention, teardown
//! behaviour, access log expiry) reads it through [`EnvironmentClass`] rather
//! than comparing environment strings itself.

use std::fmt;

use aws_lc_rs::digest;
use data_encoding::HEXLOWER;

use crate::constants::{
    MAX_ENVIRONMENT_LENGTH, PREVIEW_ACCESS_LOG_EXPIRATION_DAYS, PREVIEW_FALLBACK,
    PREVIEW_LOG_RETENTION_DAYS, PREVIEW_PREFIX, PREVIEW_USER_HASH_BYTES,
    PRODUCTION_ACCESS_LOG_EXPIRATION_DAYS, PRODUCTION_ENVIRONMENT, PRODUCTION_LOG_RETENTION_DAYS,
};
use crate::errors::InfraError;

/// A validated deployment environment id such as `prod` or `preview-alice`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeploymentEnvironment(String);

impl DeploymentEnvironment {
    /// Validates an operator supplied environment id.
    ///
    /// The id ends up in stack ids and bucket names, so it must be lowercase
    /// alphanumeric with dashes, start with a letter and stay short enough for
    /// the S3 bucket name limit.
    pub fn parse(value: &str) -> Result<Self, InfraError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(InfraError::InvalidEnvironment(value.into(), "must not be empty"));
        }
        if value.len() > MAX_ENVIRONMENT_LENGTH {
            return Err(InfraError::InvalidEnvironment(
                value.into(),
                "must be at most 20 characters",
            ));
        }
        if !value.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err(InfraError::InvalidEnvironment(
                value.into(),
                "must start with a lowercase letter",
            ));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(InfraError::InvalidEnvironment(
                value.into(),
                "only lowercase letters, digits and '-' are allowed",
            ));
        }
        Ok(Self(value.to_string()))
    }

    /// Builds `preview-<user>` from an operator name. Never fails: unsupported
    /// characters are replaced and the result is truncated to fit.
    ///
    /// A truncated id ends in a short hash of the full sanitized name, so two
    /// operators sharing a long prefix still get separate stacks.
    pub fn preview(user: &str) -> Self {
        let sanitized: String = user
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        let sanitized = sanitized.trim_matches('-');
        if sanitized.is_empty() {
            return Self(PREVIEW_FALLBACK.to_string());
        }

        let id = format!("{PREVIEW_PREFIX}{sanitized}");
        if id.len() <= MAX_ENVIRONMENT_LENGTH {
            return Self(id);
        }

        let hash = digest::digest(&digest::SHA256, sanitized.as_bytes());
        let suffix = HEXLOWER.encode(&hash.as_ref()[..PREVIEW_USER_HASH_BYTES]);
        // sanitized is ascii, so byte truncation stays on a char boundary
        let mut head = id;
        head.truncate(MAX_ENVIRONMENT_LENGTH - suffix.len() - 1);
        Self(format!("{}-{suffix}", head.trim_end_matches('-')))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn class(&self) -> EnvironmentClass {
        EnvironmentClass::of(self)
    }
}

impl fmt::Display for DeploymentEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Values read from the process environment that feed environment resolution.
#[derive(Debug, Clone, Default)]
pub struct ProcessEnv {
    /// `ENVIRONMENT`
    pub environment: Option<String>,
    /// `USER`, or the OS identity query when unset.
    pub user: Option<String>,
}

impl ProcessEnv {
    pub fn capture() -> Self {
        let environment = non_empty(std::env::var("ENVIRONMENT").ok());
        let user = non_empty(std::env::var("USER").ok())
            .or_else(|| non_empty(whoami::fallible::username().ok()));

        Self { environment, user }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolves the environment: explicit value, then `ENVIRONMENT`, then
/// `preview-<user>`, then `preview-local`.
///
/// Only explicitly supplied values are validated; the computed fallback
/// always yields a usable id.
pub fn resolve_environment(
    explicit: Option<&str>,
    process: &ProcessEnv,
) -> Result<DeploymentEnvironment, InfraError> {
    if let Some(explicit) = explicit.filter(|v| !v.trim().is_empty()) {
        return DeploymentEnvironment::parse(explicit);
    }
    if let Some(environment) = process.environment.as_deref() {
        return DeploymentEnvironment::parse(environment);
    }

    let environment = match process.user.as_deref() {
        Some(user) => DeploymentEnvironment::preview(user),
        None => DeploymentEnvironment(PREVIEW_FALLBACK.to_string()),
    };
    tracing::debug!("[synth] no environment given, using {}", environment);
    Ok(environment)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentClass {
    Production,
    NonProduction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    Retain,
    Destroy,
}

impl RemovalPolicy {
    /// CloudFormation `DeletionPolicy` / `UpdateReplacePolicy` value.
    pub fn as_cfn(&self) -> &'static str {
        match self {
            Self::Retain => "Retain",
            Self::Destroy => "Delete",
        }
    }
}

/// Everything that differs between production and the other environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub log_retention_days: u32,
    pub removal: RemovalPolicy,
    /// Days after which CDN and bucket access logs are expired.
    pub access_log_expiration_days: u32,
}

const PRODUCTION_RETENTION: RetentionPolicy = RetentionPolicy {
    log_retention_days: PRODUCTION_LOG_RETENTION_DAYS,
    removal: RemovalPolicy::Retain,
    access_log_expiration_days: PRODUCTION_ACCESS_LOG_EXPIRATION_DAYS,
};

const NON_PRODUCTION_RETENTION: RetentionPolicy = RetentionPolicy {
    log_retention_days: PREVIEW_LOG_RETENTION_DAYS,
    removal: RemovalPolicy::Destroy,
    access_log_expiration_days: PREVIEW_ACCESS_LOG_EXPIRATION_DAYS,
};

impl EnvironmentClass {
    pub fn of(environment: &DeploymentEnvironment) -> Self {
        if environment.as_str() == PRODUCTION_ENVIRONMENT {
            Self::Production
        } else {
            Self::NonProduction
        }
    }

    pub fn retention(&self) -> RetentionPolicy {
        match self {
            Self::Production => PRODUCTION_RETENTION,
            Self::NonProduction => NON_PRODUCTION_RETENTION,
        }
    }

    pub fn access_log_expiration_days(&self) -> u32 {
        self.retention().access_log_expiration_days
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(environment: Option<&str>, user: Option<&str>) -> ProcessEnv {
        ProcessEnv {
            environment: environment.map(String::from),
            user: user.map(String::from),
        }
    }

    #[test]
    fn test_explicit_environment_wins() {
        let env = resolve_environment(Some("prod"), &process(Some("staging"), Some("alice")));
        assert_eq!(env.unwrap().as_str(), "prod");
    }

    #[test]
    fn test_env_var_before_user() {
        let env = resolve_environment(None, &process(Some("staging"), Some("alice")));
        assert_eq!(env.unwrap().as_str(), "staging");
    }

    #[test]
    fn test_preview_from_user() {
        let env = resolve_environment(None, &process(None, Some("alice"))).unwrap();
        assert_eq!(env.as_str(), "preview-alice");
    }

    #[test]
    fn test_preview_local_without_user() {
        let env = resolve_environment(None, &process(None, None)).unwrap();
        assert_eq!(env.as_str(), "preview-local");
    }

    #[test]
    fn test_blank_explicit_falls_through() {
        let env = resolve_environment(Some("  "), &process(None, Some("bob"))).unwrap();
        assert_eq!(env.as_str(), "preview-bob");
    }

    #[test]
    fn test_preview_sanitizes_user() {
        assert_eq!(DeploymentEnvironment::preview("John.Doe").as_str(), "preview-john-doe");
        assert_eq!(DeploymentEnvironment::preview("...").as_str(), "preview-local");
        assert_eq!(
            DeploymentEnvironment::preview("christopher").as_str(),
            "preview-christopher"
        );
    }

    #[test]
    fn test_long_preview_names_stay_distinct() {
        let smith = DeploymentEnvironment::preview("jonathan.smith");
        let smythe = DeploymentEnvironment::preview("jonathan.smythe");
        assert_ne!(smith, smythe);

        for env in [&smith, &smythe] {
            assert_eq!(env.as_str().len(), 20);
            assert!(env.as_str().starts_with("preview-jonatha-"));
            // still a valid explicit id
            assert_eq!(&DeploymentEnvironment::parse(env.as_str()).unwrap(), env);
        }
        assert_eq!(DeploymentEnvironment::preview("jonathan.smith"), smith);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(DeploymentEnvironment::parse("Prod").is_err());
        assert!(DeploymentEnvironment::parse("my_env").is_err());
        assert!(DeploymentEnvironment::parse("1prod").is_err());
        assert!(DeploymentEnvironment::parse("this-environment-is-too-long").is_err());
        assert!(DeploymentEnvironment::parse("").is_err());
    }

    #[test]
    fn test_invalid_env_var_is_fatal() {
        let result = resolve_environment(None, &process(Some("Not Valid"), Some("alice")));
        assert!(matches!(result, Err(InfraError::InvalidEnvironment(_, _))));
    }

    #[test]
    fn test_production_retention() {
        let env = DeploymentEnvironment::parse("prod").unwrap();
        assert_eq!(env.class(), EnvironmentClass::Production);
        let retention = env.class().retention();
        assert_eq!(retention.log_retention_days, 3653);
        assert_eq!(retention.removal, RemovalPolicy::Retain);
    }

    #[test]
    fn test_non_production_retention() {
        for id in ["preview-alice", "staging", "production", "prod-eu"] {
            let env = DeploymentEnvironment::parse(id).unwrap();
            assert_eq!(env.class(), EnvironmentClass::NonProduction);
            let retention = env.class().retention();
            assert_eq!(retention.log_retention_days, 7);
            assert_eq!(retention.removal, RemovalPolicy::Destroy);
            assert_eq!(retention.access_log_expiration_days, 7);
        }
    }

    #[test]
    fn test_access_log_expiration() {
        assert_eq!(EnvironmentClass::Production.access_log_expiration_days(), 3650);
        assert_eq!(EnvironmentClass::NonProduction.access_log_expiration_days(), 7);
    }
}
