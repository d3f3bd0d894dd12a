// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Static website hosting: private S3 origin behind CloudFront.

use std::path::PathBuf;

use crate::constants::{
    ASSET_DEPLOYMENT_MEMORY_MB, CACHE_CONTROL_OVERRIDE, CACHING_OPTIMIZED_POLICY_ID,
    HSTS_MAX_AGE_SECONDS, INDEX_DOCUMENT, MINIMUM_TLS_PROTOCOL, PRICE_CLASS,
    SPA_FALLBACK_TTL_SECONDS,
};
use crate::environment::{DeploymentEnvironment, RemovalPolicy};
use crate::errors::InfraError;
use crate::naming;
use crate::policy::{PolicyStatement, ServicePrincipal};
use crate::resources::{
    AccessLogs, AssetDeployment, Bucket, Distribution, ErrorResponse, LifecycleRule,
    SecurityHeaders,
};
use crate::template::{Expr, StackDefinition, StackEnv};

pub const LOG_BUCKET: &str = "LogBucket";
pub const WEBSITE_BUCKET: &str = "WebsiteBucket";
pub const DISTRIBUTION: &str = "Distribution";
pub const DEPLOY_WEBSITE: &str = "DeployWebsite";

#[derive(Debug, Clone)]
pub struct FrontendProps {
    pub environment: DeploymentEnvironment,
    pub env: StackEnv,
    pub build_output_path: PathBuf,
    pub with_assets: bool,
}

#[tracing::instrument(skip(props), fields(environment = %props.environment))]
pub fn build(id: &str, props: &FrontendProps) -> Result<StackDefinition, InfraError> {
    let environment = &props.environment;
    let class = environment.class();
    let mut stack = StackDefinition::new(
        id,
        format!("Static website hosting - {environment}"),
        props.env.clone(),
    );

    // access logs for both the website bucket and the distribution
    let mut log_bucket = Bucket::private(
        naming::log_bucket_name(id, &props.env)?,
        RemovalPolicy::Destroy,
    );
    log_bucket.object_ownership = Some("BucketOwnerPreferred".to_string());
    log_bucket.access_control = Some("LogDeliveryWrite".to_string());
    log_bucket.auto_delete_objects = true;
    log_bucket.lifecycle_rules.push(LifecycleRule {
        id: "DeleteOldLogs".to_string(),
        expiration_days: Some(class.access_log_expiration_days()),
        noncurrent_version_expiration_days: None,
        abort_incomplete_multipart_upload_days: None,
    });
    let log_bucket_name = log_bucket.name.clone();
    stack.add(LOG_BUCKET, log_bucket);

    let mut website_bucket = Bucket::private(
        naming::website_bucket_name(id, &props.env)?,
        RemovalPolicy::Destroy,
    );
    website_bucket.auto_delete_objects = true;
    website_bucket.access_logs = Some(AccessLogs {
        destination: LOG_BUCKET.to_string(),
        prefix: format!("s3/{environment}/"),
    });

    let distribution = Distribution {
        comment: format!("{id} - {environment}"),
        origin_bucket: WEBSITE_BUCKET.to_string(),
        origin_access_control_name: naming::origin_access_control_name(id)?,
        security_headers: SecurityHeaders {
            name: format!("{id}-security-headers"),
            frame_option: "DENY".to_string(),
            hsts_max_age_seconds: HSTS_MAX_AGE_SECONDS,
            hsts_include_subdomains: true,
            cache_control: CACHE_CONTROL_OVERRIDE.to_string(),
        },
        viewer_protocol_policy: "redirect-to-https".to_string(),
        allowed_methods: vec!["GET".into(), "HEAD".into(), "OPTIONS".into()],
        cache_policy_id: CACHING_OPTIMIZED_POLICY_ID.to_string(),
        compress: true,
        default_root_object: INDEX_DOCUMENT.to_string(),
        error_responses: vec![
            ErrorResponse::spa_fallback(403, SPA_FALLBACK_TTL_SECONDS),
            ErrorResponse::spa_fallback(404, SPA_FALLBACK_TTL_SECONDS),
        ],
        price_class: PRICE_CLASS.to_string(),
        ipv6: true,
        http_version: "http2and3".to_string(),
        minimum_protocol_version: MINIMUM_TLS_PROTOCOL.to_string(),
        logging: Some(AccessLogs {
            destination: LOG_BUCKET.to_string(),
            prefix: format!("cloudfront/{environment}/"),
        }),
    };

    // only this distribution may read the origin
    let source_arn = naming::distribution_arn(&props.env, Expr::reference(DISTRIBUTION));
    website_bucket.add_to_resource_policy(
        PolicyStatement::allow(["s3:GetObject"], [website_bucket.arn_for_objects()])
            .with_principal(ServicePrincipal::CloudFront.principal())
            .with_condition("StringEquals", "AWS:SourceArn", source_arn),
    );
    let website_bucket_name = website_bucket.name.clone();
    stack.add(WEBSITE_BUCKET, website_bucket);
    stack.add(DISTRIBUTION, distribution);

    if props.with_assets {
        if !props.build_output_path.is_dir() {
            return Err(InfraError::MissingAssets(
                props.build_output_path.display().to_string(),
            ));
        }
        stack.add(
            DEPLOY_WEBSITE,
            AssetDeployment {
                source_path: props.build_output_path.display().to_string(),
                destination_bucket: WEBSITE_BUCKET.to_string(),
                distribution: DISTRIBUTION.to_string(),
                invalidation_paths: vec!["/*".to_string()],
                prune: true,
                memory_mb: ASSET_DEPLOYMENT_MEMORY_MB,
            },
        );
    } else {
        tracing::info!("[synth] skipping website asset deployment for {}", id);
    }

    let domain = Distribution::domain_name(DISTRIBUTION);
    stack.add_output(
        "WebsiteURL",
        Expr::concat([Expr::literal("https://"), domain.clone()]),
        "CloudFront distribution URL",
        "WebsiteURL",
    );
    stack.add_output("BucketName", website_bucket_name, "S3 bucket name", "BucketName");
    stack.add_output(
        "DistributionId",
        Expr::reference(DISTRIBUTION),
        "CloudFront distribution ID",
        "DistributionId",
    );
    stack.add_output(
        "DistributionDomainName",
        domain,
        "CloudFront domain name",
        "DistributionDomain",
    );
    stack.add_output("LogBucketName", log_bucket_name, "Bucket for logs", "LogBucket");

    stack.add_tag("Stack", "Frontend");
    stack.add_tag("aws-mcp:deploy:type", "webapp-cloudfront");

    Ok(stack)
}
