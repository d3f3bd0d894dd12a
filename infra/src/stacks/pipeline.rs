// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! CI/CD pipeline: source connection into a single build stage.

use std::collections::BTreeMap;

use crate::constants::{APP_NAME, BUILD_IMAGE};
use crate::constructs::{CapabilityScope, CapabilitySet, access_role, artifacts_bucket};
use crate::errors::InfraError;
use crate::policy::{PolicyStatement, ServicePrincipal};
use crate::resources::{BuildProject, Pipeline};
use crate::template::{Expr, StackDefinition, StackEnv};

pub const ARTIFACTS_BUCKET: &str = "ArtifactsBucket";
pub const BUILD_ROLE: &str = "BuildRole";
pub const PIPELINE_ROLE: &str = "PipelineRole";
pub const BUILD_PROJECT: &str = "BuildProject";
pub const PIPELINE: &str = "Pipeline";

// the repository carries its own buildspec
const BUILDSPEC: &str = "buildspec.yml";

#[derive(Debug, Clone)]
pub struct PipelineProps {
    pub env: StackEnv,
    pub connection_arn: String,
    pub repository: String,
    pub branch: String,
}

fn build_project_arn(env: &StackEnv, project_name: &str) -> Expr {
    Expr::concat([
        Expr::literal(format!("arn:aws:codebuild:{}:", env.region)),
        env.account(),
        Expr::literal(format!(":project/{project_name}")),
    ])
}

#[tracing::instrument(skip(props), fields(repository = %props.repository, branch = %props.branch))]
pub fn build(id: &str, props: &PipelineProps) -> Result<StackDefinition, InfraError> {
    let mut stack = StackDefinition::new(
        id,
        format!("CI/CD Pipeline for {APP_NAME}"),
        props.env.clone(),
    );

    let bucket = artifacts_bucket(&props.env)?;
    let bucket_arn = bucket.arn();
    let bucket_name = bucket.name.clone();
    stack.add(ARTIFACTS_BUCKET, bucket);

    let scope = CapabilityScope::app_secrets(&props.env, APP_NAME).with_artifacts_bucket(bucket_arn);

    // deploys every stack of the app, so it needs the whole table
    let build_role = access_role(
        &format!("Build role for {APP_NAME}"),
        ServicePrincipal::CodeBuild,
        CapabilitySet::all(),
        &scope,
        Vec::new(),
    )?;
    stack.add(BUILD_ROLE, build_role);

    let project_name = format!("{APP_NAME}-build");
    let pipeline_role = access_role(
        &format!("Pipeline role for {APP_NAME}"),
        ServicePrincipal::CodePipeline,
        CapabilitySet {
            artifact_read_write: true,
            ..Default::default()
        },
        &scope,
        vec![
            PolicyStatement::allow(
                ["codestar-connections:UseConnection"],
                [Expr::literal(props.connection_arn.as_str())],
            ),
            PolicyStatement::allow(
                ["codebuild:StartBuild", "codebuild:BatchGetBuilds"],
                [build_project_arn(&props.env, &project_name)],
            ),
        ],
    )?;
    stack.add(PIPELINE_ROLE, pipeline_role);

    stack.add(
        BUILD_PROJECT,
        BuildProject {
            name: project_name,
            description: format!("Builds and deploys {APP_NAME}"),
            role: BUILD_ROLE.to_string(),
            image: BUILD_IMAGE.to_string(),
            buildspec: BUILDSPEC.to_string(),
            environment: BTreeMap::from([("AWS_REGION".to_string(), props.env.region.clone())]),
        },
    );

    let pipeline_name = format!("{APP_NAME}-pipeline");
    stack.add(
        PIPELINE,
        Pipeline {
            name: pipeline_name.clone(),
            role: PIPELINE_ROLE.to_string(),
            artifacts_bucket: ARTIFACTS_BUCKET.to_string(),
            connection_arn: props.connection_arn.clone(),
            repository: props.repository.clone(),
            branch: props.branch.clone(),
            build_project: BUILD_PROJECT.to_string(),
        },
    );

    stack.add_output(
        "PipelineName",
        Expr::literal(pipeline_name),
        "CodePipeline name",
        "PipelineName",
    );
    stack.add_output(
        "ArtifactsBucketName",
        bucket_name,
        "Pipeline artifacts bucket",
        "ArtifactsBucketName",
    );

    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructs::Capability;
    use crate::resources::{ResourceConstruct, Role};

    const CONNECTION: &str = "arn:aws:codeconnections:us-east-1:123456789012:connection/abc";

    fn props() -> PipelineProps {
        PipelineProps {
            env: StackEnv {
                account: Some("123456789012".into()),
                region: "us-east-1".into(),
            },
            connection_arn: CONNECTION.to_string(),
            repository: "marinsokol5/ironman-countdown".to_string(),
            branch: "main".to_string(),
        }
    }

    fn role<'a>(stack: &'a StackDefinition, id: &str) -> &'a Role {
        match stack.resource(id) {
            Some(ResourceConstruct::Role(role)) => role,
            other => panic!("unexpected construct: {other:?}"),
        }
    }

    #[test]
    fn test_build_role_has_every_capability() {
        let stack = build("Pipeline", &props()).unwrap();
        let role = role(&stack, BUILD_ROLE);
        let scope = CapabilityScope::app_secrets(&props().env, APP_NAME).with_artifacts_bucket(
            Expr::literal("arn:aws:s3:::ironman-countdown-pipeline-artifacts-123456789012"),
        );

        let expected: Vec<PolicyStatement> = Capability::ALL
            .iter()
            .flat_map(|capability| capability.statements(&scope).unwrap())
            .collect();
        assert_eq!(role.statements, expected);
        assert_eq!(role.principal, ServicePrincipal::CodeBuild);
    }

    #[test]
    fn test_pipeline_role_can_use_connection() {
        let stack = build("Pipeline", &props()).unwrap();
        let role = role(&stack, PIPELINE_ROLE);

        assert_eq!(role.statements.len(), 3);
        assert_eq!(role.statements[1].action, vec!["codestar-connections:UseConnection"]);
        assert_eq!(role.statements[1].resource, vec![Expr::literal(CONNECTION)]);
        assert_eq!(
            role.statements[2].resource,
            vec![Expr::literal(
                "arn:aws:codebuild:us-east-1:123456789012:project/IronmanCountdown-build"
            )]
        );
    }

    #[test]
    fn test_pipeline_source_and_outputs() {
        let stack = build("Pipeline", &props()).unwrap();
        let Some(ResourceConstruct::Pipeline(pipeline)) = stack.resource(PIPELINE) else {
            panic!("missing pipeline");
        };
        assert_eq!(pipeline.name, "IronmanCountdown-pipeline");
        assert_eq!(pipeline.branch, "main");
        assert_eq!(pipeline.repository, "marinsokol5/ironman-countdown");

        assert_eq!(
            stack.output("PipelineName").unwrap().value,
            Expr::literal("IronmanCountdown-pipeline")
        );
        assert_eq!(
            stack.output("ArtifactsBucketName").unwrap().value,
            Expr::literal("ironman-countdown-pipeline-artifacts-123456789012")
        );
        assert_eq!(stack.description, "CI/CD Pipeline for IronmanCountdown");
    }

    #[test]
    fn test_rendered_pipeline_stages() {
        let stack = build("Pipeline", &props()).unwrap();
        let template = stack.render();
        let stages = &template["Resources"][PIPELINE]["Properties"]["Stages"];
        assert_eq!(stages[0]["Name"], "Source");
        assert_eq!(stages[0]["Actions"][0]["Configuration"]["ConnectionArn"], CONNECTION);
        assert_eq!(stages[1]["Name"], "Build");
        assert_eq!(
            template["Resources"][ARTIFACTS_BUCKET]["DeletionPolicy"],
            "Retain"
        );
    }
}
