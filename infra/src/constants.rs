// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

pub const APP_NAME: &str = "IronmanCountdown";
pub const APP_SLUG: &str = "ironman-countdown";
pub const MANAGED_BY: &str = "CDK";
pub const PRODUCTION_ENVIRONMENT: &str = "prod";
pub const PREVIEW_PREFIX: &str = "preview-";
pub const PREVIEW_FALLBACK: &str = "preview-local";
/// Bytes of the user name hash kept when a preview id has to be truncated.
pub const PREVIEW_USER_HASH_BYTES: usize = 2;

/// Longest environment id that still keeps `<stack>-logs-<account>` within
/// the 63 character S3 bucket name limit.
pub const MAX_ENVIRONMENT_LENGTH: usize = 20;
pub const MAX_BUCKET_NAME_LENGTH: usize = 63;
pub const MAX_ORIGIN_ACCESS_CONTROL_NAME_LENGTH: usize = 64;
/// Placeholder length used for bucket name checks when the account is only
/// known at deploy time.
pub const ACCOUNT_ID_LENGTH: usize = 12;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_REPOSITORY: &str = "marinsokol5/ironman-countdown";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_BUILD_PATH: &str = "../dist";
pub const DEFAULT_OUTPUT_DIR: &str = "cdk.out";
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

// log retention (CloudWatch only accepts a fixed set of day counts)
pub const PRODUCTION_LOG_RETENTION_DAYS: u32 = 3653; // ten years
pub const PREVIEW_LOG_RETENTION_DAYS: u32 = 7; // one week
pub const PRODUCTION_ACCESS_LOG_EXPIRATION_DAYS: u32 = 3650;
pub const PREVIEW_ACCESS_LOG_EXPIRATION_DAYS: u32 = 7;

// artifacts bucket lifecycle
pub const NONCURRENT_VERSION_EXPIRATION_DAYS: u32 = 30;
pub const ABORT_MULTIPART_UPLOAD_DAYS: u32 = 7;

// frontend
pub const INDEX_DOCUMENT: &str = "index.html";
pub const SPA_FALLBACK_TTL_SECONDS: u32 = 300;
pub const HSTS_MAX_AGE_SECONDS: u32 = 47_304_000; // ~18 months
pub const CACHE_CONTROL_OVERRIDE: &str = "no-store, no-cache";
pub const MINIMUM_TLS_PROTOCOL: &str = "TLSv1.2_2021";
pub const PRICE_CLASS: &str = "PriceClass_100";
/// AWS managed `CachingOptimized` cache policy.
pub const CACHING_OPTIMIZED_POLICY_ID: &str = "658327ea-f89d-4fab-a63d-7e88639e58f6";
pub const ASSET_DEPLOYMENT_MEMORY_MB: u32 = 512;

// api
pub const API_STAGE_NAME: &str = "v1";
pub const API_THROTTLE_RATE_LIMIT: f64 = 100.0;
pub const API_THROTTLE_BURST_LIMIT: u32 = 200;
pub const LAMBDA_RUNTIME: &str = "nodejs22.x";
pub const LAMBDA_HANDLER: &str = "index.handler";
pub const CORS_ALLOW_HEADERS: [&str; 6] = [
    "Content-Type",
    "X-Amz-Date",
    "Authorization",
    "X-Api-Key",
    "x-client-info",
    "apikey",
];
pub const CORS_ALLOW_METHODS: [&str; 7] = ["OPTIONS", "GET", "PUT", "POST", "DELETE", "PATCH", "HEAD"];

// pipeline
pub const PIPELINE_STACK_ID: &str = "IronmanCountdownPipelineStack";
pub const BUILD_IMAGE: &str = "aws/codebuild/standard:7.0";

// bucket cleanup on teardown
pub const AUTO_DELETE_OBJECTS_TYPE: &str = "Custom::S3AutoDeleteObjects";
pub const AUTO_DELETE_OBJECTS_TIMEOUT_SECONDS: u32 = 900;
pub const AUTO_DELETE_OBJECTS_MEMORY_MB: u32 = 128;
/// Inline handler: deletes every object version and delete marker when the
/// custom resource is deleted, and acknowledges every other request.
pub const AUTO_DELETE_OBJECTS_HANDLER: &str = r#"const { S3Client, ListObjectVersionsCommand, DeleteObjectsCommand } = require('@aws-sdk/client-s3');
const response = require('cfn-response');
const s3 = new S3Client({});

async function empty(Bucket) {
  let page = {};
  do {
    page = await s3.send(new ListObjectVersionsCommand({
      Bucket,
      KeyMarker: page.NextKeyMarker,
      VersionIdMarker: page.NextVersionIdMarker,
    }));
    const Objects = [...(page.Versions || []), ...(page.DeleteMarkers || [])]
      .map(({ Key, VersionId }) => ({ Key, VersionId }));
    if (Objects.length > 0) {
      await s3.send(new DeleteObjectsCommand({ Bucket, Delete: { Objects, Quiet: true } }));
    }
  } while (page.IsTruncated);
}

exports.handler = async (event, context) => {
  try {
    if (event.RequestType === 'Delete') {
      await empty(event.ResourceProperties.BucketName);
    }
    await response.send(event, context, response.SUCCESS, {});
  } catch (err) {
    if (err.name === 'NoSuchBucket') {
      await response.send(event, context, response.SUCCESS, {});
      return;
    }
    console.error(err);
    await response.send(event, context, response.FAILED, {});
  }
};
"#;
