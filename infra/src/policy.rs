// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! IAM policy statements and principals.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Value, json};

use crate::template::Expr;

pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Principal {
    Service(String),
    #[serde(rename = "AWS")]
    Aws(String),
}

/// AWS services that assume roles or receive resource grants in this app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServicePrincipal {
    Lambda,
    CodeBuild,
    CodePipeline,
    CloudFront,
    ApiGateway,
}

impl ServicePrincipal {
    pub fn host(&self) -> &'static str {
        match self {
            Self::Lambda => "lambda.amazonaws.com",
            Self::CodeBuild => "codebuild.amazonaws.com",
            Self::CodePipeline => "codepipeline.amazonaws.com",
            Self::CloudFront => "cloudfront.amazonaws.com",
            Self::ApiGateway => "apigateway.amazonaws.com",
        }
    }

    pub fn principal(&self) -> Principal {
        Principal::Service(self.host().to_string())
    }

    /// Trust policy letting this service assume a role.
    pub fn assume_role_document(&self) -> Value {
        json!({
            "Version": POLICY_VERSION,
            "Statement": [{
                "Effect": Effect::Allow,
                "Principal": self.principal(),
                "Action": "sts:AssumeRole",
            }],
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    pub action: Vec<String>,
    pub resource: Vec<Expr>,
    /// operator -> (condition key -> value)
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub condition: BTreeMap<String, BTreeMap<String, Expr>>,
}

impl PolicyStatement {
    pub fn allow<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator<Item = Expr>,
    {
        Self::new(Effect::Allow, actions, resources)
    }

    pub fn deny<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator<Item = Expr>,
    {
        Self::new(Effect::Deny, actions, resources)
    }

    fn new<A, R>(effect: Effect, actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator<Item = Expr>,
    {
        Self {
            sid: None,
            effect,
            principal: None,
            action: actions.into_iter().map(Into::into).collect(),
            resource: resources.into_iter().collect(),
            condition: BTreeMap::new(),
        }
    }

    pub fn with_sid(mut self, sid: &str) -> Self {
        self.sid = Some(sid.to_string());
        self
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_condition(mut self, operator: &str, key: &str, value: Expr) -> Self {
        self.condition
            .entry(operator.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self
    }
}

pub fn policy_document(statements: &[PolicyStatement]) -> Value {
    json!({
        "Version": POLICY_VERSION,
        "Statement": statements,
    })
}

/// Managed policy ARN for an AWS managed policy name such as
/// `service-role/AWSLambdaBasicExecutionRole`.
pub fn managed_policy_arn(name: &str) -> String {
    format!("arn:aws:iam::aws:policy/{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_serialization() {
        let statement = PolicyStatement::allow(["s3:GetObject"], [Expr::literal("arn:aws:s3:::b/*")])
            .with_principal(ServicePrincipal::CloudFront.principal())
            .with_condition("StringEquals", "AWS:SourceArn", Expr::literal("arn:dist"));

        let value = serde_json::to_value(&statement).unwrap();
        assert_eq!(
            value,
            json!({
                "Effect": "Allow",
                "Principal": { "Service": "cloudfront.amazonaws.com" },
                "Action": ["s3:GetObject"],
                "Resource": ["arn:aws:s3:::b/*"],
                "Condition": { "StringEquals": { "AWS:SourceArn": "arn:dist" } },
            })
        );
    }

    #[test]
    fn test_assume_role_document() {
        let document = ServicePrincipal::Lambda.assume_role_document();
        assert_eq!(document["Statement"][0]["Principal"]["Service"], "lambda.amazonaws.com");
        assert_eq!(document["Statement"][0]["Action"], "sts:AssumeRole");
    }

    #[test]
    fn test_managed_policy_arn() {
        assert_eq!(
            managed_policy_arn("CloudWatchLogsFullAccess"),
            "arn:aws:iam::aws:policy/CloudWatchLogsFullAccess"
        );
    }
}
