// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Shared construct library used by the application and pipeline stacks.
//!
//! # Access roles
//!
//! [`access_role`] maps a [`CapabilitySet`] to policy statements through a
//! fixed table ([`Capability::statements`]). Capabilities only ever add
//! statements: every role also carries the baseline managed logging policy
//! of its principal, whatever flags are set.
//!
//! # Artifacts bucket
//!
//! [`artifacts_bucket`] applies the same encryption, versioning and lifecycle
//! defaults wherever pipeline artifacts are stored.

use crate::constants::{ABORT_MULTIPART_UPLOAD_DAYS, NONCURRENT_VERSION_EXPIRATION_DAYS};
use crate::environment::RemovalPolicy;
use crate::errors::InfraError;
use crate::naming;
use crate::policy::{PolicyStatement, ServicePrincipal};
use crate::resources::{Bucket, LifecycleRule, Role};
use crate::template::{Expr, StackEnv};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Capability {
    SecretsAccess,
    ArtifactReadWrite,
    CloudformationAdmin,
    BootstrapAdmin,
}

impl Capability {
    /// Table order; statements are always emitted in this order.
    pub const ALL: [Capability; 4] = [
        Capability::SecretsAccess,
        Capability::ArtifactReadWrite,
        Capability::CloudformationAdmin,
        Capability::BootstrapAdmin,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::SecretsAccess => "secretsAccess",
            Self::ArtifactReadWrite => "artifactReadWrite",
            Self::CloudformationAdmin => "cloudformationAdmin",
            Self::BootstrapAdmin => "bootstrapAdmin",
        }
    }

    /// The statements this capability grants within `scope`.
    pub fn statements(&self, scope: &CapabilityScope) -> Result<Vec<PolicyStatement>, InfraError> {
        let statements = match self {
            Self::SecretsAccess => vec![PolicyStatement::allow(
                ["secretsmanager:GetSecretValue"],
                [scope.secrets_prefix(self.name())?],
            )],
            Self::ArtifactReadWrite => {
                let bucket_arn = scope
                    .artifacts_bucket_arn
                    .clone()
                    .ok_or(InfraError::MissingScope(self.name()))?;
                let objects = Expr::concat([bucket_arn.clone(), Expr::literal("/*")]);
                vec![PolicyStatement::allow(
                    [
                        "s3:GetObject",
                        "s3:PutObject",
                        "s3:ListBucket",
                        "s3:GetBucketLocation",
                    ],
                    [bucket_arn, objects],
                )]
            }
            Self::CloudformationAdmin => vec![PolicyStatement::allow(
                [
                    "cloudformation:DescribeStacks",
                    "cloudformation:DescribeStackEvents",
                    "cloudformation:DescribeStackResources",
                    "cloudformation:GetTemplate",
                    "cloudformation:CreateStack",
                    "cloudformation:UpdateStack",
                    "cloudformation:DeleteStack",
                    "cloudformation:ValidateTemplate",
                ],
                [Expr::literal("*")],
            )],
            Self::BootstrapAdmin => vec![PolicyStatement::allow(
                ["cloudformation:*", "s3:*", "iam:*", "ssm:*", "sts:AssumeRole"],
                [Expr::literal("*")],
            )],
        };
        Ok(statements)
    }
}

/// Permission flags for an access role. Disabled flags contribute nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    pub secrets_access: bool,
    pub artifact_read_write: bool,
    pub cloudformation_admin: bool,
    pub bootstrap_admin: bool,
}

impl CapabilitySet {
    pub fn all() -> Self {
        Self {
            secrets_access: true,
            artifact_read_write: true,
            cloudformation_admin: true,
            bootstrap_admin: true,
        }
    }

    pub fn contains(&self, capability: Capability) -> bool {
        match capability {
            Capability::SecretsAccess => self.secrets_access,
            Capability::ArtifactReadWrite => self.artifact_read_write,
            Capability::CloudformationAdmin => self.cloudformation_admin,
            Capability::BootstrapAdmin => self.bootstrap_admin,
        }
    }

    pub fn enabled(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL
            .into_iter()
            .filter(move |capability| self.contains(*capability))
    }
}

/// Resources the capabilities are scoped to.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityScope {
    /// Secret name or partial ARN prefix; a trailing wildcard is appended.
    pub secrets_arn_prefix: Expr,
    pub artifacts_bucket_arn: Option<Expr>,
}

impl CapabilityScope {
    /// Secrets under `<app>/` in the stack's account and region.
    pub fn app_secrets(env: &StackEnv, app_name: &str) -> Self {
        Self {
            secrets_arn_prefix: naming::secret_arn(env, &format!("{app_name}/")),
            artifacts_bucket_arn: None,
        }
    }

    pub fn with_artifacts_bucket(mut self, bucket_arn: Expr) -> Self {
        self.artifacts_bucket_arn = Some(bucket_arn);
        self
    }

    /// An empty prefix would widen the grant to every secret.
    fn secrets_prefix(&self, capability: &'static str) -> Result<Expr, InfraError> {
        if self
            .secrets_arn_prefix
            .as_literal()
            .is_some_and(|prefix| prefix.trim().is_empty())
        {
            return Err(InfraError::MissingScope(capability));
        }
        Ok(Expr::concat([self.secrets_arn_prefix.clone(), Expr::literal("*")]))
    }
}

/// Managed logging policy every role of this principal receives.
pub fn baseline_policy(principal: ServicePrincipal) -> &'static str {
    match principal {
        ServicePrincipal::Lambda => "service-role/AWSLambdaBasicExecutionRole",
        ServicePrincipal::ApiGateway => "service-role/AmazonAPIGatewayPushToCloudWatchLogs",
        _ => "CloudWatchLogsFullAccess",
    }
}

/// Builds a role whose inline policy is exactly the statements implied by
/// `capabilities`, followed by `additional` statements.
pub fn access_role(
    description: &str,
    principal: ServicePrincipal,
    capabilities: CapabilitySet,
    scope: &CapabilityScope,
    additional: Vec<PolicyStatement>,
) -> Result<Role, InfraError> {
    let mut statements = Vec::new();
    for capability in capabilities.enabled() {
        statements.extend(capability.statements(scope)?);
    }
    statements.extend(additional);

    Ok(Role {
        description: description.to_string(),
        principal,
        managed_policies: vec![baseline_policy(principal).to_string()],
        policy_name: "AccessPolicy".to_string(),
        statements,
    })
}

/// Versioned, encrypted, private pipeline artifacts bucket, kept on teardown.
pub fn artifacts_bucket(env: &StackEnv) -> Result<Bucket, InfraError> {
    let mut bucket = Bucket::private(naming::artifacts_bucket_name(env)?, RemovalPolicy::Retain);
    bucket.versioned = true;
    bucket.lifecycle_rules.push(LifecycleRule {
        id: "DeleteOldArtifacts".to_string(),
        expiration_days: None,
        noncurrent_version_expiration_days: Some(NONCURRENT_VERSION_EXPIRATION_DAYS),
        abort_incomplete_multipart_upload_days: Some(ABORT_MULTIPART_UPLOAD_DAYS),
    });
    Ok(bucket)
}
