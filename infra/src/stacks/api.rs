// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Serverless API: three compute functions behind a REST gateway.

use std::collections::BTreeMap;

use serde_json::json;

use crate::constants::{
    API_STAGE_NAME, API_THROTTLE_BURST_LIMIT, API_THROTTLE_RATE_LIMIT, APP_NAME,
    CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS,
};
use crate::constructs::{CapabilityScope, CapabilitySet, access_role};
use crate::environment::DeploymentEnvironment;
use crate::errors::InfraError;
use crate::naming;
use crate::policy::ServicePrincipal;
use crate::resources::{
    Cors, Function, Integration, LogGroup, RestApi, Route, Stage, json_with_standard_fields,
};
use crate::template::{Expr, StackDefinition, StackEnv};

pub const LAMBDA_ROLE: &str = "LambdaRole";
pub const API: &str = "Api";
pub const API_LOG_GROUP: &str = "ApiLogGroup";

/// Compute contract of one backing function; the code itself is opaque here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSpec {
    pub logical_id: &'static str,
    pub name: &'static str,
    pub label: &'static str,
    pub timeout_seconds: u32,
    pub memory_mb: u32,
}

pub const FUNCTIONS: [FunctionSpec; 3] = [
    FunctionSpec {
        logical_id: "EstimateRaceTimeFunction",
        name: "estimate-race-time",
        label: "Estimate race time",
        timeout_seconds: 30,
        memory_mb: 512,
    },
    FunctionSpec {
        logical_id: "ExtractWorkoutFunction",
        name: "extract-workout",
        label: "Extract workout",
        timeout_seconds: 60,
        memory_mb: 1024,
    },
    FunctionSpec {
        logical_id: "CalculateStatisticsFunction",
        name: "calculate-statistics",
        label: "Calculate statistics",
        timeout_seconds: 30,
        memory_mb: 512,
    },
];

#[derive(Debug, Clone)]
pub struct ApiProps {
    pub environment: DeploymentEnvironment,
    pub env: StackEnv,
}

#[tracing::instrument(skip(props), fields(environment = %props.environment))]
pub fn build(id: &str, props: &ApiProps) -> Result<StackDefinition, InfraError> {
    let environment = &props.environment;
    let retention = environment.class().retention();
    let mut stack = StackDefinition::new(
        id,
        format!("Serverless API - {environment}"),
        props.env.clone(),
    );

    let secret_name = naming::secret_name(APP_NAME, environment.as_str());
    let secret_arn = naming::secret_arn(&props.env, &secret_name);

    let scope = CapabilityScope {
        secrets_arn_prefix: secret_arn.clone(),
        artifacts_bucket_arn: None,
    };
    let role = access_role(
        &format!("Execution role for {id} functions"),
        ServicePrincipal::Lambda,
        CapabilitySet {
            secrets_access: true,
            ..Default::default()
        },
        &scope,
        Vec::new(),
    )?;
    stack.add(LAMBDA_ROLE, role);

    let mut routes = Vec::new();
    for function in FUNCTIONS {
        let function_name = naming::function_name(id, function.name);

        // created up front so retention is ours rather than the runtime's default
        stack.add(
            &format!("{}LogGroup", function.logical_id),
            LogGroup {
                name: naming::function_log_group_name(&function_name),
                retention_days: retention.log_retention_days,
                removal: retention.removal,
            },
        );

        stack.add(
            function.logical_id,
            Function {
                name: function_name,
                description: format!("{} function for {environment}", function.label),
                code_path: format!("lambda/{}", function.name),
                role: LAMBDA_ROLE.to_string(),
                timeout_seconds: function.timeout_seconds,
                memory_mb: function.memory_mb,
                environment: BTreeMap::from([
                    ("ENVIRONMENT".to_string(), Expr::literal(environment.as_str())),
                    ("SECRETS_ARN".to_string(), secret_arn.clone()),
                ]),
            },
        );

        routes.push(Route {
            path: function.name.to_string(),
            method: "POST".to_string(),
            integration: Integration::LambdaProxy(function.logical_id.to_string()),
        });
    }

    routes.push(Route {
        path: "health".to_string(),
        method: "GET".to_string(),
        integration: Integration::Mock {
            status: 200,
            body: json!({ "status": "healthy", "timestamp": "$context.requestTime" }),
        },
    });

    stack.add(
        API_LOG_GROUP,
        LogGroup {
            name: naming::api_log_group_name(id),
            retention_days: retention.log_retention_days,
            removal: retention.removal,
        },
    );

    let api = RestApi {
        name: id.to_string(),
        description: format!("IronmanCountdown API - {environment}"),
        cors: Cors {
            allow_origins: vec!["*".to_string()],
            allow_methods: CORS_ALLOW_METHODS.iter().map(|m| m.to_string()).collect(),
            allow_headers: CORS_ALLOW_HEADERS.iter().map(|h| h.to_string()).collect(),
        },
        stage: Stage {
            name: API_STAGE_NAME.to_string(),
            logging_level: "INFO".to_string(),
            metrics_enabled: true,
            data_trace_enabled: false,
            access_log_group: API_LOG_GROUP.to_string(),
            access_log_format: json_with_standard_fields(),
            throttling_rate_limit: API_THROTTLE_RATE_LIMIT,
            throttling_burst_limit: API_THROTTLE_BURST_LIMIT,
        },
        routes,
    };
    let api_url = api.url(API, &props.env);
    stack.add(API, api);

    stack.add_output("ApiUrl", api_url, "API Gateway URL", "ApiUrl");
    stack.add_output("ApiId", Expr::reference(API), "API Gateway ID", "ApiId");
    stack.add_output("SecretsArn", secret_arn, "Secrets Manager ARN", "SecretsArn");

    stack.add_tag("Stack", "Backend");
    stack.add_tag("aws-mcp:deploy:type", "backend-lambda");

    tracing::debug!(
        "[synth] {} declares {} functions behind {}",
        id,
        FUNCTIONS.len(),
        API
    );
    Ok(stack)
}
