// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Resource constructs and their CloudFormation rendering.
//!
//! A construct is the unit the stack builders compose. Rendering may expand a
//! construct into several CloudFormation resources: a [`Bucket`] with policy
//! attachments also emits its `AWS::S3::BucketPolicy`, a [`Distribution`]
//! emits its origin access control and response headers policy, and a
//! [`RestApi`] emits every resource, method, permission, deployment and stage
//! behind it.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::constants::{
    AUTO_DELETE_OBJECTS_HANDLER, AUTO_DELETE_OBJECTS_MEMORY_MB, AUTO_DELETE_OBJECTS_TIMEOUT_SECONDS,
    AUTO_DELETE_OBJECTS_TYPE, INDEX_DOCUMENT, LAMBDA_HANDLER, LAMBDA_RUNTIME,
};
use crate::environment::RemovalPolicy;
use crate::naming::{bucket_arn, bucket_objects_arn};
use crate::policy::{
    PolicyStatement, Principal, ServicePrincipal, managed_policy_arn, policy_document,
};
use crate::template::{Expr, StackEnv, Tags, tags_value};

#[derive(Debug, Clone)]
pub enum ResourceConstruct {
    Role(Role),
    Bucket(Bucket),
    Function(Function),
    Distribution(Distribution),
    RestApi(RestApi),
    LogGroup(LogGroup),
    AssetDeployment(AssetDeployment),
    BuildProject(BuildProject),
    Pipeline(Pipeline),
}

impl ResourceConstruct {
    pub fn render(&self, id: &str, env: &StackEnv, tags: &Tags) -> Vec<(String, Value)> {
        match self {
            Self::Role(role) => role.render(id, tags),
            Self::Bucket(bucket) => bucket.render(id, tags),
            Self::Function(function) => function.render(id, env, tags),
            Self::Distribution(distribution) => distribution.render(id, tags),
            Self::RestApi(api) => api.render(id, env, tags),
            Self::LogGroup(group) => group.render(id, tags),
            // executed by the provisioning engine, see AssetDeployment
            Self::AssetDeployment(_) => Vec::new(),
            Self::BuildProject(project) => project.render(id, tags),
            Self::Pipeline(pipeline) => pipeline.render(id, tags),
        }
    }
}

macro_rules! impl_from_construct {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for ResourceConstruct {
                fn from(value: $variant) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from_construct!(
    Role,
    Bucket,
    Function,
    Distribution,
    RestApi,
    LogGroup,
    AssetDeployment,
    BuildProject,
    Pipeline
);

fn resource(kind: &str, properties: Value) -> Value {
    json!({ "Type": kind, "Properties": properties })
}

fn with_removal(mut body: Value, removal: RemovalPolicy) -> Value {
    body["DeletionPolicy"] = json!(removal.as_cfn());
    body["UpdateReplacePolicy"] = json!(removal.as_cfn());
    body
}

fn with_depends_on(mut body: Value, depends_on: Vec<String>) -> Value {
    if !depends_on.is_empty() {
        body["DependsOn"] = json!(depends_on);
    }
    body
}

// ==================== IAM ====================

#[derive(Debug, Clone, PartialEq)]
pub struct Role {
    pub description: String,
    pub principal: ServicePrincipal,
    pub managed_policies: Vec<String>,
    pub policy_name: String,
    pub statements: Vec<PolicyStatement>,
}

impl Role {
    fn render(&self, id: &str, tags: &Tags) -> Vec<(String, Value)> {
        let mut properties = json!({
            "AssumeRolePolicyDocument": self.principal.assume_role_document(),
            "Description": self.description,
            "ManagedPolicyArns": self
                .managed_policies
                .iter()
                .map(|name| managed_policy_arn(name))
                .collect::<Vec<_>>(),
            "Tags": tags_value(tags),
        });
        if !self.statements.is_empty() {
            properties["Policies"] = json!([{
                "PolicyName": self.policy_name,
                "PolicyDocument": policy_document(&self.statements),
            }]);
        }

        vec![(id.to_string(), resource("AWS::IAM::Role", properties))]
    }
}

// ==================== S3 ====================

#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleRule {
    pub id: String,
    pub expiration_days: Option<u32>,
    pub noncurrent_version_expiration_days: Option<u32>,
    pub abort_incomplete_multipart_upload_days: Option<u32>,
}

impl LifecycleRule {
    fn to_value(&self) -> Value {
        let mut rule = json!({ "Id": self.id, "Status": "Enabled" });
        if let Some(days) = self.expiration_days {
            rule["ExpirationInDays"] = json!(days);
        }
        if let Some(days) = self.noncurrent_version_expiration_days {
            rule["NoncurrentVersionExpiration"] = json!({ "NoncurrentDays": days });
        }
        if let Some(days) = self.abort_incomplete_multipart_upload_days {
            rule["AbortIncompleteMultipartUpload"] = json!({ "DaysAfterInitiation": days });
        }
        rule
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessLogs {
    /// Logical id of the destination bucket.
    pub destination: String,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub name: Expr,
    pub versioned: bool,
    pub enforce_ssl: bool,
    pub object_ownership: Option<String>,
    pub access_control: Option<String>,
    pub removal: RemovalPolicy,
    pub lifecycle_rules: Vec<LifecycleRule>,
    pub access_logs: Option<AccessLogs>,
    /// Resource policy statements attached to this bucket.
    pub policy: Vec<PolicyStatement>,
    /// Empty the bucket before it is deleted. Only honoured with
    /// [`RemovalPolicy::Destroy`].
    pub auto_delete_objects: bool,
}

impl Bucket {
    /// Private, SSE-S3 encrypted, TLS-only bucket with every public access
    /// block enabled.
    pub fn private(name: Expr, removal: RemovalPolicy) -> Self {
        Self {
            name,
            versioned: false,
            enforce_ssl: true,
            object_ownership: None,
            access_control: None,
            removal,
            lifecycle_rules: Vec::new(),
            access_logs: None,
            policy: Vec::new(),
            auto_delete_objects: false,
        }
    }

    /// Whether teardown first runs the object cleanup handler.
    pub fn empties_on_teardown(&self) -> bool {
        self.auto_delete_objects && self.removal == RemovalPolicy::Destroy
    }

    pub fn arn(&self) -> Expr {
        bucket_arn(&self.name)
    }

    pub fn arn_for_objects(&self) -> Expr {
        bucket_objects_arn(&self.name)
    }

    pub fn add_to_resource_policy(&mut self, statement: PolicyStatement) {
        self.policy.push(statement);
    }

    fn resource_policy(&self) -> Vec<PolicyStatement> {
        let mut statements = self.policy.clone();
        if self.enforce_ssl {
            statements.push(
                PolicyStatement::deny(["s3:*"], [self.arn(), self.arn_for_objects()])
                    .with_principal(Principal::Aws("*".to_string()))
                    .with_condition("Bool", "aws:SecureTransport", Expr::literal("false")),
            );
        }
        statements
    }

    fn render(&self, id: &str, tags: &Tags) -> Vec<(String, Value)> {
        let mut properties = json!({
            "BucketName": self.name,
            "BucketEncryption": {
                "ServerSideEncryptionConfiguration": [{
                    "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" },
                }],
            },
            "PublicAccessBlockConfiguration": {
                "BlockPublicAcls": true,
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true,
            },
            "Tags": tags_value(tags),
        });
        if self.versioned {
            properties["VersioningConfiguration"] = json!({ "Status": "Enabled" });
        }
        if let Some(ownership) = &self.object_ownership {
            properties["OwnershipControls"] = json!({ "Rules": [{ "ObjectOwnership": ownership }] });
        }
        if let Some(access_control) = &self.access_control {
            properties["AccessControl"] = json!(access_control);
        }
        if !self.lifecycle_rules.is_empty() {
            let rules: Vec<Value> = self.lifecycle_rules.iter().map(LifecycleRule::to_value).collect();
            properties["LifecycleConfiguration"] = json!({ "Rules": rules });
        }
        if let Some(logs) = &self.access_logs {
            properties["LoggingConfiguration"] = json!({
                "DestinationBucketName": Expr::reference(&logs.destination),
                "LogFilePrefix": logs.prefix,
            });
        }

        let mut rendered = vec![(
            id.to_string(),
            with_removal(resource("AWS::S3::Bucket", properties), self.removal),
        )];

        let statements = self.resource_policy();
        if !statements.is_empty() {
            rendered.push((
                format!("{id}Policy"),
                resource(
                    "AWS::S3::BucketPolicy",
                    json!({
                        "Bucket": Expr::reference(id),
                        "PolicyDocument": policy_document(&statements),
                    }),
                ),
            ));
        }
        if self.empties_on_teardown() {
            rendered.extend(self.render_auto_delete(id, !statements.is_empty(), tags));
        }
        rendered
    }

    /// Handler role, handler function and the custom resource that invokes it.
    ///
    /// The custom resource references the bucket, so the provisioning engine
    /// deletes it (and empties the bucket) before deleting the bucket itself.
    fn render_auto_delete(&self, id: &str, has_policy: bool, tags: &Tags) -> Vec<(String, Value)> {
        let role_id = format!("{id}AutoDeleteObjectsRole");
        let handler_id = format!("{id}AutoDeleteObjectsHandler");
        let custom_id = format!("{id}AutoDeleteObjects");

        let role = Role {
            description: format!("Empties {id} before it is deleted"),
            principal: ServicePrincipal::Lambda,
            managed_policies: vec!["service-role/AWSLambdaBasicExecutionRole".to_string()],
            policy_name: "AutoDeleteObjects".to_string(),
            statements: vec![
                PolicyStatement::allow(
                    ["s3:ListBucket", "s3:ListBucketVersions", "s3:GetBucketVersioning"],
                    [self.arn()],
                ),
                PolicyStatement::allow(
                    ["s3:DeleteObject", "s3:DeleteObjectVersion"],
                    [self.arn_for_objects()],
                ),
            ],
        };

        let handler = resource(
            "AWS::Lambda::Function",
            json!({
                "Description": format!("Deletes every object in {id} on stack teardown"),
                "Runtime": LAMBDA_RUNTIME,
                "Handler": LAMBDA_HANDLER,
                "Code": { "ZipFile": AUTO_DELETE_OBJECTS_HANDLER },
                "Role": Expr::get_att(&role_id, "Arn"),
                "Timeout": AUTO_DELETE_OBJECTS_TIMEOUT_SECONDS,
                "MemorySize": AUTO_DELETE_OBJECTS_MEMORY_MB,
                "Tags": tags_value(tags),
            }),
        );

        let custom = resource(
            AUTO_DELETE_OBJECTS_TYPE,
            json!({
                "ServiceToken": Expr::get_att(&handler_id, "Arn"),
                "BucketName": Expr::reference(id),
            }),
        );

        // the bucket policy must outlive the cleanup on teardown
        let custom_depends_on = if has_policy {
            vec![format!("{id}Policy")]
        } else {
            Vec::new()
        };

        let mut rendered = role.render(&role_id, tags);
        rendered.push((handler_id, with_depends_on(handler, vec![role_id])));
        rendered.push((
            custom_id,
            with_removal(with_depends_on(custom, custom_depends_on), RemovalPolicy::Destroy),
        ));
        rendered
    }
}

// ==================== Lambda ====================

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub description: String,
    /// Directory holding the function bundle, uploaded as an asset.
    pub code_path: String,
    /// Logical id of the execution role.
    pub role: String,
    pub timeout_seconds: u32,
    pub memory_mb: u32,
    pub environment: BTreeMap<String, Expr>,
}

/// A code archive the provisioning engine builds from `source_path` and
/// uploads to `bucket`/`key` before the owning stack deploys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCode {
    pub function_name: String,
    pub source_path: String,
    pub handler: &'static str,
    pub runtime: &'static str,
    pub bucket: Expr,
    pub key: String,
}

impl Function {
    /// Where the template expects this function's code archive.
    pub fn code(&self, env: &StackEnv) -> FunctionCode {
        FunctionCode {
            function_name: self.name.clone(),
            source_path: self.code_path.clone(),
            handler: LAMBDA_HANDLER,
            runtime: LAMBDA_RUNTIME,
            bucket: Expr::concat([
                Expr::literal("cdk-assets-"),
                env.account(),
                Expr::literal(format!("-{}", env.region)),
            ]),
            key: format!("{}.zip", self.name),
        }
    }

    fn render(&self, id: &str, env: &StackEnv, tags: &Tags) -> Vec<(String, Value)> {
        let code = self.code(env);
        let mut body = resource(
            "AWS::Lambda::Function",
            json!({
                "FunctionName": self.name,
                "Description": self.description,
                "Runtime": code.runtime,
                "Handler": code.handler,
                "Code": {
                    "S3Bucket": code.bucket,
                    "S3Key": code.key,
                },
                "Role": Expr::get_att(&self.role, "Arn"),
                "Timeout": self.timeout_seconds,
                "MemorySize": self.memory_mb,
                "Environment": { "Variables": self.environment },
                "Tags": tags_value(tags),
            }),
        );
        body["Metadata"] = json!({
            "aws:asset:path": self.code_path,
            "aws:asset:property": "Code",
        });

        vec![(id.to_string(), with_depends_on(body, vec![self.role.clone()]))]
    }
}

// ==================== CloudWatch Logs ====================

#[derive(Debug, Clone, PartialEq)]
pub struct LogGroup {
    pub name: String,
    pub retention_days: u32,
    pub removal: RemovalPolicy,
}

impl LogGroup {
    fn render(&self, id: &str, tags: &Tags) -> Vec<(String, Value)> {
        let body = resource(
            "AWS::Logs::LogGroup",
            json!({
                "LogGroupName": self.name,
                "RetentionInDays": self.retention_days,
                "Tags": tags_value(tags),
            }),
        );
        vec![(id.to_string(), with_removal(body, self.removal))]
    }
}

// ==================== CloudFront ====================

#[derive(Debug, Clone, PartialEq)]
pub struct SecurityHeaders {
    pub name: String,
    pub frame_option: String,
    pub hsts_max_age_seconds: u32,
    pub hsts_include_subdomains: bool,
    pub cache_control: String,
}

impl SecurityHeaders {
    fn render(&self) -> Value {
        resource(
            "AWS::CloudFront::ResponseHeadersPolicy",
            json!({
                "ResponseHeadersPolicyConfig": {
                    "Name": self.name,
                    "SecurityHeadersConfig": {
                        "ContentTypeOptions": { "Override": true },
                        "FrameOptions": { "FrameOption": self.frame_option, "Override": true },
                        "StrictTransportSecurity": {
                            "AccessControlMaxAgeSec": self.hsts_max_age_seconds,
                            "IncludeSubdomains": self.hsts_include_subdomains,
                            "Override": true,
                        },
                    },
                    "CustomHeadersConfig": {
                        "Items": [{
                            "Header": "Cache-Control",
                            "Value": self.cache_control,
                            "Override": true,
                        }],
                    },
                },
            }),
        )
    }
}

/// Maps an origin error status to the response viewers receive instead.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub origin_status: u16,
    pub response_status: u16,
    pub response_page_path: String,
    pub ttl_seconds: u32,
}

impl ErrorResponse {
    /// Serves the SPA index with a 200 so client side routes resolve.
    pub fn spa_fallback(origin_status: u16, ttl_seconds: u32) -> Self {
        Self {
            origin_status,
            response_status: 200,
            response_page_path: format!("/{INDEX_DOCUMENT}"),
            ttl_seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    pub comment: String,
    /// Logical id of the S3 origin bucket, read through origin access control.
    pub origin_bucket: String,
    pub origin_access_control_name: String,
    pub security_headers: SecurityHeaders,
    pub viewer_protocol_policy: String,
    pub allowed_methods: Vec<String>,
    pub cache_policy_id: String,
    pub compress: bool,
    pub default_root_object: String,
    pub error_responses: Vec<ErrorResponse>,
    pub price_class: String,
    pub ipv6: bool,
    pub http_version: String,
    pub minimum_protocol_version: String,
    /// Logical id of the access log bucket and the key prefix.
    pub logging: Option<AccessLogs>,
}

impl Distribution {
    /// Response a viewer gets when the origin answers with `status`, if the
    /// distribution rewrites it.
    pub fn error_response_for(&self, status: u16) -> Option<&ErrorResponse> {
        self.error_responses
            .iter()
            .find(|response| response.origin_status == status)
    }

    pub fn domain_name(id: &str) -> Expr {
        Expr::get_att(id, "DomainName")
    }

    fn render(&self, id: &str, tags: &Tags) -> Vec<(String, Value)> {
        let oac_id = format!("{id}OriginAccessControl");
        let headers_id = format!("{id}SecurityHeaders");

        let oac = resource(
            "AWS::CloudFront::OriginAccessControl",
            json!({
                "OriginAccessControlConfig": {
                    "Name": self.origin_access_control_name,
                    "OriginAccessControlOriginType": "s3",
                    "SigningBehavior": "always",
                    "SigningProtocol": "sigv4",
                },
            }),
        );

        let error_responses: Vec<Value> = self
            .error_responses
            .iter()
            .map(|response| {
                json!({
                    "ErrorCode": response.origin_status,
                    "ResponseCode": response.response_status,
                    "ResponsePagePath": response.response_page_path,
                    "ErrorCachingMinTTL": response.ttl_seconds,
                })
            })
            .collect();

        let mut config = json!({
            "Enabled": true,
            "Comment": self.comment,
            "DefaultRootObject": self.default_root_object,
            "Origins": [{
                "Id": "S3Origin",
                "DomainName": Expr::get_att(&self.origin_bucket, "RegionalDomainName"),
                "S3OriginConfig": { "OriginAccessIdentity": "" },
                "OriginAccessControlId": Expr::get_att(&oac_id, "Id"),
            }],
            "DefaultCacheBehavior": {
                "TargetOriginId": "S3Origin",
                "ViewerProtocolPolicy": self.viewer_protocol_policy,
                "AllowedMethods": self.allowed_methods,
                "CachedMethods": self.allowed_methods,
                "CachePolicyId": self.cache_policy_id,
                "Compress": self.compress,
                "ResponseHeadersPolicyId": Expr::reference(&headers_id),
            },
            "CustomErrorResponses": error_responses,
            "PriceClass": self.price_class,
            "IPV6Enabled": self.ipv6,
            "HttpVersion": self.http_version,
            "ViewerCertificate": {
                "CloudFrontDefaultCertificate": true,
                "MinimumProtocolVersion": self.minimum_protocol_version,
            },
        });
        if let Some(logging) = &self.logging {
            config["Logging"] = json!({
                "Bucket": Expr::get_att(&logging.destination, "RegionalDomainName"),
                "Prefix": logging.prefix,
                "IncludeCookies": false,
            });
        }

        let distribution = resource(
            "AWS::CloudFront::Distribution",
            json!({ "DistributionConfig": config, "Tags": tags_value(tags) }),
        );

        vec![
            (oac_id, oac),
            (headers_id, self.security_headers.render()),
            (id.to_string(), distribution),
        ]
    }
}

/// Upload of built site files into a bucket followed by a CDN invalidation.
///
/// Executed by the provisioning engine once the stack is deployed; it is
/// listed in the assembly manifest and adds no template resources.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDeployment {
    pub source_path: String,
    /// Logical id of the destination bucket.
    pub destination_bucket: String,
    /// Logical id of the distribution to invalidate.
    pub distribution: String,
    pub invalidation_paths: Vec<String>,
    pub prune: bool,
    pub memory_mb: u32,
}

// ==================== API Gateway ====================

#[derive(Debug, Clone, PartialEq)]
pub enum Integration {
    /// Lambda proxy integration; holds the function's logical id.
    LambdaProxy(String),
    /// Static response produced by the gateway itself.
    Mock { status: u16, body: Value },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub path: String,
    pub method: String,
    pub integration: Integration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cors {
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub name: String,
    pub logging_level: String,
    pub metrics_enabled: bool,
    pub data_trace_enabled: bool,
    /// Logical id of the access log group.
    pub access_log_group: String,
    pub access_log_format: String,
    pub throttling_rate_limit: f64,
    pub throttling_burst_limit: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestApi {
    pub name: String,
    pub description: String,
    pub cors: Cors,
    pub stage: Stage,
    pub routes: Vec<Route>,
}

/// `estimate-race-time` -> `EstimateRaceTime`
fn pascal_case(path: &str) -> String {
    path.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// JSON access log line with the standard request fields.
pub fn json_with_standard_fields() -> String {
    json!({
        "requestId": "$context.requestId",
        "ip": "$context.identity.sourceIp",
        "user": "$context.identity.user",
        "caller": "$context.identity.caller",
        "requestTime": "$context.requestTime",
        "httpMethod": "$context.httpMethod",
        "resourcePath": "$context.resourcePath",
        "status": "$context.status",
        "protocol": "$context.protocol",
        "responseLength": "$context.responseLength",
    })
    .to_string()
}

impl RestApi {
    pub fn url(&self, id: &str, env: &StackEnv) -> Expr {
        Expr::concat([
            Expr::literal("https://"),
            Expr::reference(id),
            Expr::literal(format!(
                ".execute-api.{}.amazonaws.com/{}/",
                env.region, self.stage.name
            )),
        ])
    }

    pub fn route(&self, method: &str, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|route| route.method == method && route.path == path)
    }

    fn cors_preflight(&self, api_id: &str, resource_id: Expr) -> Value {
        let quoted = |values: &[String]| format!("'{}'", values.join(","));
        resource(
            "AWS::ApiGateway::Method",
            json!({
                "RestApiId": Expr::reference(api_id),
                "ResourceId": resource_id,
                "HttpMethod": "OPTIONS",
                "AuthorizationType": "NONE",
                "Integration": {
                    "Type": "MOCK",
                    "RequestTemplates": { "application/json": "{ statusCode: 200 }" },
                    "IntegrationResponses": [{
                        "StatusCode": "204",
                        "ResponseParameters": {
                            "method.response.header.Access-Control-Allow-Headers": quoted(&self.cors.allow_headers),
                            "method.response.header.Access-Control-Allow-Origin": quoted(&self.cors.allow_origins),
                            "method.response.header.Access-Control-Allow-Methods": quoted(&self.cors.allow_methods),
                        },
                    }],
                },
                "MethodResponses": [{
                    "StatusCode": "204",
                    "ResponseParameters": {
                        "method.response.header.Access-Control-Allow-Headers": true,
                        "method.response.header.Access-Control-Allow-Origin": true,
                        "method.response.header.Access-Control-Allow-Methods": true,
                    },
                }],
            }),
        )
    }

    fn render(&self, id: &str, env: &StackEnv, tags: &Tags) -> Vec<(String, Value)> {
        let mut rendered = Vec::new();
        let mut methods = Vec::new();
        let root = Expr::get_att(id, "RootResourceId");

        rendered.push((
            id.to_string(),
            resource(
                "AWS::ApiGateway::RestApi",
                json!({
                    "Name": self.name,
                    "Description": self.description,
                    "Tags": tags_value(tags),
                }),
            ),
        ));

        // execution logging needs an account level CloudWatch role
        let cloudwatch_role = format!("{id}CloudWatchRole");
        rendered.push((
            cloudwatch_role.clone(),
            resource(
                "AWS::IAM::Role",
                json!({
                    "AssumeRolePolicyDocument": ServicePrincipal::ApiGateway.assume_role_document(),
                    "ManagedPolicyArns": [managed_policy_arn(
                        "service-role/AmazonAPIGatewayPushToCloudWatchLogs"
                    )],
                    "Tags": tags_value(tags),
                }),
            ),
        ));
        let account_id = format!("{id}Account");
        rendered.push((
            account_id.clone(),
            with_depends_on(
                resource(
                    "AWS::ApiGateway::Account",
                    json!({ "CloudWatchRoleArn": Expr::get_att(&cloudwatch_role, "Arn") }),
                ),
                vec![id.to_string()],
            ),
        ));

        let root_options = format!("{id}OPTIONS");
        rendered.push((root_options.clone(), self.cors_preflight(id, root.clone())));
        methods.push(root_options);

        for route in &self.routes {
            let path_id = format!("{id}{}", pascal_case(&route.path));
            let method_id = format!("{path_id}{}", route.method);
            let options_id = format!("{path_id}OPTIONS");

            rendered.push((
                path_id.clone(),
                resource(
                    "AWS::ApiGateway::Resource",
                    json!({
                        "RestApiId": Expr::reference(id),
                        "ParentId": root,
                        "PathPart": route.path,
                    }),
                ),
            ));

            let (integration, method_responses) = match &route.integration {
                Integration::LambdaProxy(function) => {
                    let uri = Expr::concat([
                        Expr::literal(format!(
                            "arn:aws:apigateway:{}:lambda:path/2015-03-31/functions/",
                            env.region
                        )),
                        Expr::get_att(function, "Arn"),
                        Expr::literal("/invocations"),
                    ]);

                    rendered.push((
                        format!("{method_id}Permission"),
                        resource(
                            "AWS::Lambda::Permission",
                            json!({
                                "Action": "lambda:InvokeFunction",
                                "FunctionName": Expr::get_att(function, "Arn"),
                                "Principal": ServicePrincipal::ApiGateway.host(),
                                "SourceArn": Expr::concat([
                                    Expr::literal(format!("arn:aws:execute-api:{}:", env.region)),
                                    env.account(),
                                    Expr::literal(":"),
                                    Expr::reference(id),
                                    Expr::literal(format!("/*/{}/{}", route.method, route.path)),
                                ]),
                            }),
                        ),
                    ));

                    (
                        json!({
                            "Type": "AWS_PROXY",
                            "IntegrationHttpMethod": "POST",
                            "Uri": uri,
                        }),
                        json!([]),
                    )
                }
                Integration::Mock { status, body } => (
                    json!({
                        "Type": "MOCK",
                        "RequestTemplates": { "application/json": json!({ "statusCode": status }).to_string() },
                        "IntegrationResponses": [{
                            "StatusCode": status.to_string(),
                            "ResponseTemplates": { "application/json": body.to_string() },
                        }],
                    }),
                    json!([{ "StatusCode": status.to_string() }]),
                ),
            };

            rendered.push((
                method_id.clone(),
                resource(
                    "AWS::ApiGateway::Method",
                    json!({
                        "RestApiId": Expr::reference(id),
                        "ResourceId": Expr::reference(&path_id),
                        "HttpMethod": route.method,
                        "AuthorizationType": "NONE",
                        "Integration": integration,
                        "MethodResponses": method_responses,
                    }),
                ),
            ));
            rendered.push((options_id.clone(), self.cors_preflight(id, Expr::reference(&path_id))));
            methods.push(method_id);
            methods.push(options_id);
        }

        let deployment_id = format!("{id}Deployment");
        rendered.push((
            deployment_id.clone(),
            with_depends_on(
                resource(
                    "AWS::ApiGateway::Deployment",
                    json!({
                        "RestApiId": Expr::reference(id),
                        "Description": "Automatically created by the RestApi construct",
                    }),
                ),
                methods,
            ),
        ));

        let stage = &self.stage;
        rendered.push((
            format!("{id}Stage{}", pascal_case(&stage.name)),
            with_depends_on(
                resource(
                    "AWS::ApiGateway::Stage",
                    json!({
                        "RestApiId": Expr::reference(id),
                        "DeploymentId": Expr::reference(&deployment_id),
                        "StageName": stage.name,
                        "AccessLogSetting": {
                            "DestinationArn": Expr::get_att(&stage.access_log_group, "Arn"),
                            "Format": stage.access_log_format,
                        },
                        "MethodSettings": [{
                            "ResourcePath": "/*",
                            "HttpMethod": "*",
                            "LoggingLevel": stage.logging_level,
                            "MetricsEnabled": stage.metrics_enabled,
                            "DataTraceEnabled": stage.data_trace_enabled,
                            "ThrottlingRateLimit": stage.throttling_rate_limit,
                            "ThrottlingBurstLimit": stage.throttling_burst_limit,
                        }],
                        "Tags": tags_value(tags),
                    }),
                ),
                vec![account_id],
            ),
        ));

        rendered
    }
}

// ==================== CI/CD ====================

#[derive(Debug, Clone, PartialEq)]
pub struct BuildProject {
    pub name: String,
    pub description: String,
    /// Logical id of the service role.
    pub role: String,
    pub image: String,
    pub buildspec: String,
    pub environment: BTreeMap<String, String>,
}

impl BuildProject {
    fn render(&self, id: &str, tags: &Tags) -> Vec<(String, Value)> {
        let variables: Vec<Value> = self
            .environment
            .iter()
            .map(|(name, value)| json!({ "Name": name, "Value": value, "Type": "PLAINTEXT" }))
            .collect();

        vec![(
            id.to_string(),
            resource(
                "AWS::CodeBuild::Project",
                json!({
                    "Name": self.name,
                    "Description": self.description,
                    "ServiceRole": Expr::get_att(&self.role, "Arn"),
                    "Artifacts": { "Type": "CODEPIPELINE" },
                    "Source": { "Type": "CODEPIPELINE", "BuildSpec": self.buildspec },
                    "Environment": {
                        "ComputeType": "BUILD_GENERAL1_SMALL",
                        "Image": self.image,
                        "Type": "LINUX_CONTAINER",
                        "PrivilegedMode": false,
                        "EnvironmentVariables": variables,
                    },
                    "Tags": tags_value(tags),
                }),
            ),
        )]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub name: String,
    /// Logical id of the pipeline service role.
    pub role: String,
    /// Logical id of the artifacts bucket.
    pub artifacts_bucket: String,
    pub connection_arn: String,
    pub repository: String,
    pub branch: String,
    /// Logical id of the build project.
    pub build_project: String,
}

impl Pipeline {
    fn render(&self, id: &str, tags: &Tags) -> Vec<(String, Value)> {
        let stages = json!([
            {
                "Name": "Source",
                "Actions": [{
                    "Name": "Source",
                    "ActionTypeId": {
                        "Category": "Source",
                        "Owner": "AWS",
                        "Provider": "CodeStarSourceConnection",
                        "Version": "1",
                    },
                    "Configuration": {
                        "ConnectionArn": self.connection_arn,
                        "FullRepositoryId": self.repository,
                        "BranchName": self.branch,
                        "OutputArtifactFormat": "CODE_ZIP",
                    },
                    "OutputArtifacts": [{ "Name": "SourceOutput" }],
                    "RunOrder": 1,
                }],
            },
            {
                "Name": "Build",
                "Actions": [{
                    "Name": "Build",
                    "ActionTypeId": {
                        "Category": "Build",
                        "Owner": "AWS",
                        "Provider": "CodeBuild",
                        "Version": "1",
                    },
                    "Configuration": { "ProjectName": Expr::reference(&self.build_project) },
                    "InputArtifacts": [{ "Name": "SourceOutput" }],
                    "RunOrder": 1,
                }],
            },
        ]);

        let mut properties = Map::new();
        properties.insert("Name".into(), json!(self.name));
        properties.insert("PipelineType".into(), json!("V2"));
        properties.insert("RoleArn".into(), json!(Expr::get_att(&self.role, "Arn")));
        properties.insert(
            "ArtifactStore".into(),
            json!({ "Type": "S3", "Location": Expr::reference(&self.artifacts_bucket) }),
        );
        properties.insert("Stages".into(), stages);
        properties.insert("Tags".into(), tags_value(tags));

        vec![(
            id.to_string(),
            with_depends_on(
                resource("AWS::CodePipeline::Pipeline", Value::Object(properties)),
                vec![self.role.clone()],
            ),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags() -> Tags {
        Tags::from([("Stack".to_string(), "Test".to_string())])
    }

    fn env() -> StackEnv {
        StackEnv {
            account: Some("123456789012".into()),
            region: "us-east-1".into(),
        }
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("estimate-race-time"), "EstimateRaceTime");
        assert_eq!(pascal_case("health"), "Health");
        assert_eq!(pascal_case("v1"), "V1");
    }

    #[test]
    fn test_bucket_enforces_ssl_with_policy() {
        let bucket = Bucket::private(Expr::literal("my-bucket"), RemovalPolicy::Destroy);
        let rendered = bucket.render("Site", &tags());

        assert_eq!(rendered.len(), 2);
        let (id, body) = &rendered[0];
        assert_eq!(id, "Site");
        assert_eq!(body["Type"], "AWS::S3::Bucket");
        assert_eq!(body["DeletionPolicy"], "Delete");
        assert_eq!(
            body["Properties"]["PublicAccessBlockConfiguration"]["BlockPublicPolicy"],
            true
        );

        let (policy_id, policy) = &rendered[1];
        assert_eq!(policy_id, "SitePolicy");
        let statement = &policy["Properties"]["PolicyDocument"]["Statement"][0];
        assert_eq!(statement["Effect"], "Deny");
        assert_eq!(statement["Condition"]["Bool"]["aws:SecureTransport"], "false");
    }

    #[test]
    fn test_auto_delete_renders_cleanup_resources() {
        let mut bucket = Bucket::private(Expr::literal("my-bucket"), RemovalPolicy::Destroy);
        bucket.auto_delete_objects = true;
        let rendered: BTreeMap<String, Value> = bucket.render("Site", &tags()).into_iter().collect();

        let custom = &rendered["SiteAutoDeleteObjects"];
        assert_eq!(custom["Type"], "Custom::S3AutoDeleteObjects");
        assert_eq!(
            custom["Properties"]["ServiceToken"],
            json!({ "Fn::GetAtt": ["SiteAutoDeleteObjectsHandler", "Arn"] })
        );
        assert_eq!(custom["DependsOn"], json!(["SitePolicy"]));

        let handler = &rendered["SiteAutoDeleteObjectsHandler"];
        assert_eq!(handler["DependsOn"], json!(["SiteAutoDeleteObjectsRole"]));
        assert!(
            handler["Properties"]["Code"]["ZipFile"]
                .as_str()
                .unwrap()
                .contains("DeleteObjectsCommand")
        );

        let statements = &rendered["SiteAutoDeleteObjectsRole"]["Properties"]["Policies"][0]
            ["PolicyDocument"]["Statement"];
        assert_eq!(statements[1]["Resource"], json!(["arn:aws:s3:::my-bucket/*"]));
    }

    #[test]
    fn test_retained_bucket_is_never_emptied() {
        let mut bucket = Bucket::private(Expr::literal("my-bucket"), RemovalPolicy::Retain);
        bucket.auto_delete_objects = true;
        assert!(!bucket.empties_on_teardown());
        assert_eq!(bucket.render("Site", &tags()).len(), 2);
    }

    #[test]
    fn test_lifecycle_rule_rendering() {
        let rule = LifecycleRule {
            id: "DeleteOldArtifacts".into(),
            expiration_days: None,
            noncurrent_version_expiration_days: Some(30),
            abort_incomplete_multipart_upload_days: Some(7),
        };
        assert_eq!(
            rule.to_value(),
            json!({
                "Id": "DeleteOldArtifacts",
                "Status": "Enabled",
                "NoncurrentVersionExpiration": { "NoncurrentDays": 30 },
                "AbortIncompleteMultipartUpload": { "DaysAfterInitiation": 7 },
            })
        );
    }

    #[test]
    fn test_function_depends_on_role() {
        let function = Function {
            name: "Api-dev-extract-workout".into(),
            description: "Extract workout function for dev".into(),
            code_path: "lambda/extract-workout".into(),
            role: "LambdaRole".into(),
            timeout_seconds: 60,
            memory_mb: 1024,
            environment: BTreeMap::from([("ENVIRONMENT".to_string(), Expr::literal("dev"))]),
        };
        let rendered = function.render("ExtractWorkout", &env(), &tags());
        let body = &rendered[0].1;

        assert_eq!(body["DependsOn"], json!(["LambdaRole"]));
        assert_eq!(body["Properties"]["Timeout"], 60);
        assert_eq!(body["Properties"]["MemorySize"], 1024);
        assert_eq!(body["Properties"]["Environment"]["Variables"]["ENVIRONMENT"], "dev");
        assert_eq!(body["Metadata"]["aws:asset:path"], "lambda/extract-workout");
    }

    #[test]
    fn test_mock_route_renders_without_permission() {
        let api = RestApi {
            name: "Api".into(),
            description: "test".into(),
            cors: Cors {
                allow_origins: vec!["*".into()],
                allow_methods: vec!["GET".into()],
                allow_headers: vec!["Content-Type".into()],
            },
            stage: Stage {
                name: "v1".into(),
                logging_level: "INFO".into(),
                metrics_enabled: true,
                data_trace_enabled: false,
                access_log_group: "ApiLogGroup".into(),
                access_log_format: json_with_standard_fields(),
                throttling_rate_limit: 100.0,
                throttling_burst_limit: 200,
            },
            routes: vec![Route {
                path: "health".into(),
                method: "GET".into(),
                integration: Integration::Mock {
                    status: 200,
                    body: json!({ "status": "healthy" }),
                },
            }],
        };

        let rendered: BTreeMap<String, Value> = api.render("Api", &env(), &tags()).into_iter().collect();
        let method = &rendered["ApiHealthGET"];
        assert_eq!(method["Properties"]["Integration"]["Type"], "MOCK");
        assert!(!rendered.keys().any(|key| key.ends_with("Permission")));
        assert!(rendered.contains_key("ApiStageV1"));
        assert_eq!(
            rendered["ApiDeployment"]["DependsOn"],
            json!(["ApiOPTIONS", "ApiHealthGET", "ApiHealthOPTIONS"])
        );
    }
}
