// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! End to end synthesis tests.
//!
//! These tests run the full stack composition from resolved options to the
//! rendered templates and manifest on disk.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::fs;
use std::path::PathBuf;

use ironman_infra::app::{App, CloudAssembly, DeploymentContext, MANIFEST_FILE};
use ironman_infra::configuration::SynthOptions;
use ironman_infra::environment::ProcessEnv;
use ironman_infra::errors::InfraError;
use serde_json::{Value, json};

const ACCOUNT: &str = "123456789012";
const FRONTEND: &str = "IronmanCountdownFrontend-preview-alice";
const API: &str = "IronmanCountdownApi-preview-alice";

/// Options for a local run by `alice` without built assets or a pipeline.
fn preview_options() -> SynthOptions {
    SynthOptions {
        with_assets: false,
        account: Some(ACCOUNT.to_string()),
        ..Default::default()
    }
}

fn alice() -> ProcessEnv {
    ProcessEnv {
        environment: None,
        user: Some("alice".to_string()),
    }
}

fn synth(options: &SynthOptions, process: &ProcessEnv) -> CloudAssembly {
    App::build(&DeploymentContext::from(options), process)
        .unwrap()
        .finalize()
}

fn template(assembly: &CloudAssembly, id: &str) -> Value {
    assembly.stack(id).unwrap().render()
}

fn resources_of_type<'a>(template: &'a Value, kind: &str) -> Vec<(&'a String, &'a Value)> {
    template["Resources"]
        .as_object()
        .unwrap()
        .iter()
        .filter(|(_, body)| body["Type"] == kind)
        .collect()
}

// =============================================================================
// Composition
// =============================================================================

#[test]
fn test_preview_scenario() {
    let assembly = synth(&preview_options(), &alice());

    let ids: Vec<&str> = assembly.stacks.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec![FRONTEND, API]);
    assert_eq!(assembly.warnings.len(), 1);

    let frontend = template(&assembly, FRONTEND);
    assert_eq!(frontend["Description"], "Static website hosting - preview-alice");

    let api = template(&assembly, API);
    let groups = resources_of_type(&api, "AWS::Logs::LogGroup");
    assert_eq!(groups.len(), 4);
    for (_, group) in groups {
        assert_eq!(group["Properties"]["RetentionInDays"], 7);
        assert_eq!(group["DeletionPolicy"], "Delete");
    }
}

#[test]
fn test_global_tags_reach_resources() {
    let assembly = synth(&preview_options(), &alice());
    let frontend = template(&assembly, FRONTEND);

    let tags = &frontend["Resources"]["WebsiteBucket"]["Properties"]["Tags"];
    assert_eq!(
        tags,
        &json!([
            { "Key": "Environment", "Value": "preview-alice" },
            { "Key": "ManagedBy", "Value": "CDK" },
            { "Key": "Project", "Value": "IronmanCountdown" },
            { "Key": "Stack", "Value": "Frontend" },
            { "Key": "aws-mcp:deploy:type", "Value": "webapp-cloudfront" },
        ])
    );
}

#[test]
fn test_environment_variable_selects_environment() {
    let process = ProcessEnv {
        environment: Some("prod".to_string()),
        user: Some("alice".to_string()),
    };
    let assembly = synth(&preview_options(), &process);
    let api = template(&assembly, "IronmanCountdownApi-prod");

    for (_, group) in resources_of_type(&api, "AWS::Logs::LogGroup") {
        assert_eq!(group["Properties"]["RetentionInDays"], 3653);
        assert_eq!(group["DeletionPolicy"], "Retain");
    }
}

#[test]
fn test_synthesis_is_deterministic() {
    let first = synth(&preview_options(), &alice());
    let second = synth(&preview_options(), &alice());

    for (a, b) in first.stacks.iter().zip(&second.stacks) {
        assert_eq!(
            serde_json::to_string(&a.render()).unwrap(),
            serde_json::to_string(&b.render()).unwrap()
        );
    }
    assert_eq!(first.manifest().unwrap(), second.manifest().unwrap());
}

#[test]
fn test_pipeline_with_connection() {
    let options = SynthOptions {
        code_connection_arn: Some(
            "arn:aws:codeconnections:us-east-1:123456789012:connection/abc".to_string(),
        ),
        ..preview_options()
    };
    let assembly = synth(&options, &alice());

    assert_eq!(assembly.stacks.len(), 3);
    assert!(assembly.warnings.is_empty());

    let pipeline = template(&assembly, "IronmanCountdownPipelineStack");
    assert_eq!(pipeline["Description"], "CI/CD Pipeline for IronmanCountdown");
    assert_eq!(
        pipeline["Outputs"]["PipelineName"]["Export"]["Name"],
        "IronmanCountdownPipelineStack-PipelineName"
    );
    assert_eq!(resources_of_type(&pipeline, "AWS::IAM::Role").len(), 2);
}

// =============================================================================
// Frontend
// =============================================================================

#[test]
fn test_spa_fallback_rendered() {
    let assembly = synth(&preview_options(), &alice());
    let frontend = template(&assembly, FRONTEND);

    let responses = &frontend["Resources"]["Distribution"]["Properties"]["DistributionConfig"]
        ["CustomErrorResponses"];
    assert_eq!(
        responses,
        &json!([
            { "ErrorCode": 403, "ResponseCode": 200, "ResponsePagePath": "/index.html", "ErrorCachingMinTTL": 300 },
            { "ErrorCode": 404, "ResponseCode": 200, "ResponsePagePath": "/index.html", "ErrorCachingMinTTL": 300 },
        ])
    );
}

#[test]
fn test_origin_read_scoped_to_distribution() {
    let assembly = synth(&preview_options(), &alice());
    let frontend = template(&assembly, FRONTEND);

    let statements =
        &frontend["Resources"]["WebsiteBucketPolicy"]["Properties"]["PolicyDocument"]["Statement"];
    assert_eq!(statements[0]["Principal"]["Service"], "cloudfront.amazonaws.com");
    assert_eq!(
        statements[0]["Condition"]["StringEquals"]["AWS:SourceArn"],
        json!({
            "Fn::Join": ["", [
                "arn:aws:cloudfront::123456789012:distribution/",
                { "Ref": "Distribution" },
            ]]
        })
    );
    assert_eq!(statements[1]["Effect"], "Deny");
}

#[test]
fn test_assets_listed_in_manifest() {
    let dist = tempfile::tempdir().unwrap();
    fs::write(dist.path().join("index.html"), "<html></html>").unwrap();

    let options = SynthOptions {
        with_assets: true,
        build_path: dist.path().to_path_buf(),
        ..preview_options()
    };
    let assembly = synth(&options, &alice());
    let manifest = assembly.manifest().unwrap();

    let deployments = manifest["assetDeployments"].as_array().unwrap();
    assert_eq!(deployments.len(), 1);
    assert_eq!(deployments[0]["stack"], FRONTEND);
    assert_eq!(deployments[0]["destinationBucket"], "WebsiteBucket");
    assert_eq!(deployments[0]["invalidationPaths"], json!(["/*"]));
    assert_eq!(deployments[0]["prune"], true);

    // the engine runs the upload; nothing lands in the template
    let frontend = template(&assembly, FRONTEND);
    assert!(frontend["Resources"].get("DeployWebsite").is_none());
}

#[test]
fn test_every_function_archive_is_listed_in_manifest() {
    let assembly = synth(&preview_options(), &alice());
    let manifest = assembly.manifest().unwrap();
    let api = template(&assembly, API);

    let listed: Vec<(&Value, &Value)> = manifest["functionAssets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|asset| (&asset["bucket"], &asset["key"]))
        .collect();

    let functions = resources_of_type(&api, "AWS::Lambda::Function");
    assert_eq!(functions.len(), 3);
    assert_eq!(listed.len(), functions.len());
    for (_, function) in functions {
        let code = &function["Properties"]["Code"];
        assert!(listed.contains(&(&code["S3Bucket"], &code["S3Key"])));
    }

    let first = &manifest["functionAssets"][0];
    assert_eq!(first["stack"], API);
    assert_eq!(first["sourcePath"], "lambda/estimate-race-time");
    assert_eq!(first["handler"], "index.handler");
    assert_eq!(first["key"], format!("{API}-estimate-race-time.zip"));
}

#[test]
fn test_long_user_names_stay_within_cloudfront_limits() {
    let process = ProcessEnv {
        environment: None,
        user: Some("christopher.lee".to_string()),
    };
    let assembly = synth(&preview_options(), &process);
    let frontend = assembly
        .stacks
        .iter()
        .find(|stack| stack.id.starts_with("IronmanCountdownFrontend-"))
        .unwrap()
        .render();

    for (_, oac) in resources_of_type(&frontend, "AWS::CloudFront::OriginAccessControl") {
        let name = oac["Properties"]["OriginAccessControlConfig"]["Name"].as_str().unwrap();
        assert!(name.len() <= 64, "{name} is {} characters", name.len());
    }
}

#[test]
fn test_missing_build_path_fails() {
    let options = SynthOptions {
        with_assets: true,
        build_path: PathBuf::from("/definitely/not/here"),
        ..preview_options()
    };
    let result = App::build(&DeploymentContext::from(&options), &alice());
    assert!(matches!(result, Err(InfraError::MissingAssets(_))));
}

// =============================================================================
// Output
// =============================================================================

#[test]
fn test_write_to_creates_templates_and_manifest() {
    let out = tempfile::tempdir().unwrap();
    let dir = out.path().join("cdk.out");

    let assembly = synth(&preview_options(), &alice());
    let written = assembly.write_to(&dir).unwrap();
    assert_eq!(written.len(), 3);

    let frontend: Value =
        serde_json::from_str(&fs::read_to_string(dir.join(format!("{FRONTEND}.template.json"))).unwrap())
            .unwrap();
    assert_eq!(frontend["AWSTemplateFormatVersion"], "2010-09-09");
    assert_eq!(
        frontend["Outputs"]["DistributionDomainName"]["Export"]["Name"],
        format!("{FRONTEND}-DistributionDomain")
    );

    let manifest: Value =
        serde_json::from_str(&fs::read_to_string(dir.join(MANIFEST_FILE)).unwrap()).unwrap();
    assert_eq!(manifest["stacks"].as_array().unwrap().len(), 2);
    assert_eq!(manifest["stacks"][1]["id"], API);
}

#[test]
fn test_unknown_account_uses_pseudo_parameter() {
    let options = SynthOptions {
        account: None,
        ..preview_options()
    };
    let assembly = synth(&options, &alice());
    let frontend = template(&assembly, FRONTEND);

    assert_eq!(
        frontend["Resources"]["WebsiteBucket"]["Properties"]["BucketName"],
        json!({
            "Fn::Join": ["", [
                "ironmancountdownfrontend-preview-alice-",
                { "Ref": "AWS::AccountId" },
            ]]
        })
    );
}
