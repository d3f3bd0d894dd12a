// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Composition of the application and pipeline stacks into one assembly.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::constants::{APP_NAME, MANAGED_BY};
use crate::environment::{DeploymentEnvironment, ProcessEnv, resolve_environment};
use crate::errors::InfraError;
use crate::naming;
use crate::resources::{AssetDeployment, FunctionCode, ResourceConstruct};
use crate::stacks::{self, ApiProps, FrontendProps, PipelineProps};
use crate::template::{StackDefinition, StackEnv, Tags};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Explicit overrides for one synthesis run.
#[derive(Debug, Clone)]
pub struct DeploymentContext {
    pub environment: Option<String>,
    pub code_connection_arn: Option<String>,
    pub repository_name: String,
    pub branch_name: String,
    pub pipeline_only: bool,
    pub build_path: PathBuf,
    pub with_assets: bool,
    pub account: Option<String>,
    pub region: String,
}

impl DeploymentContext {
    fn stack_env(&self) -> StackEnv {
        StackEnv {
            account: self.account.clone(),
            region: self.region.clone(),
        }
    }
}

/// Stacks built for one run, not yet tagged.
#[derive(Debug)]
pub struct App {
    environment: Option<DeploymentEnvironment>,
    stacks: Vec<StackDefinition>,
    warnings: Vec<String>,
}

impl App {
    pub fn build(context: &DeploymentContext, process: &ProcessEnv) -> Result<Self, InfraError> {
        let env = context.stack_env();
        let mut definitions = Vec::new();
        let mut warnings = Vec::new();
        let mut environment = None;

        if !context.pipeline_only {
            let resolved = resolve_environment(context.environment.as_deref(), process)?;
            tracing::info!("[synth] building application stacks for {}", resolved);

            definitions.push(stacks::build_frontend(
                &naming::frontend_stack_id(&resolved),
                &FrontendProps {
                    environment: resolved.clone(),
                    env: env.clone(),
                    build_output_path: context.build_path.clone(),
                    with_assets: context.with_assets,
                },
            )?);
            definitions.push(stacks::build_api(
                &naming::api_stack_id(&resolved),
                &ApiProps {
                    environment: resolved.clone(),
                    env: env.clone(),
                },
            )?);
            environment = Some(resolved);
        }

        match &context.code_connection_arn {
            Some(connection_arn) => {
                definitions.push(stacks::build_pipeline(
                    &naming::pipeline_stack_id(),
                    &PipelineProps {
                        env,
                        connection_arn: connection_arn.clone(),
                        repository: context.repository_name.clone(),
                        branch: context.branch_name.clone(),
                    },
                )?);
            }
            None => {
                let warning = "codeConnectionArn not provided, skipping pipeline stack".to_string();
                tracing::warn!("[synth] {}", warning);
                warnings.push(warning);
            }
        }

        Ok(Self {
            environment,
            stacks: definitions,
            warnings,
        })
    }

    pub fn stacks(&self) -> &[StackDefinition] {
        &self.stacks
    }

    /// Applies the composition wide tags and seals the result.
    pub fn finalize(self) -> CloudAssembly {
        let mut global = Tags::new();
        global.insert("Project".to_string(), APP_NAME.to_string());
        global.insert("ManagedBy".to_string(), MANAGED_BY.to_string());
        if let Some(environment) = &self.environment {
            global.insert("Environment".to_string(), environment.to_string());
        }

        let stacks = self
            .stacks
            .into_iter()
            .map(|mut stack| {
                stack.tags.extend(global.clone());
                stack
            })
            .collect();

        CloudAssembly {
            environment: self.environment,
            stacks,
            warnings: self.warnings,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestStack<'a> {
    id: &'a str,
    template_file: String,
    description: &'a str,
    environment: &'a StackEnv,
    tags: &'a Tags,
    outputs: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestAsset<'a> {
    stack: &'a str,
    logical_id: &'a str,
    #[serde(flatten)]
    deployment: &'a AssetDeployment,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestFunctionCode<'a> {
    stack: &'a str,
    logical_id: &'a str,
    #[serde(flatten)]
    code: FunctionCode,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest<'a> {
    app: &'static str,
    environment: Option<&'a str>,
    stacks: Vec<ManifestStack<'a>>,
    asset_deployments: Vec<ManifestAsset<'a>>,
    function_assets: Vec<ManifestFunctionCode<'a>>,
    warnings: &'a [String],
}

/// The finalized stacks, ready to hand to the provisioning engine.
#[derive(Debug)]
pub struct CloudAssembly {
    pub environment: Option<DeploymentEnvironment>,
    pub stacks: Vec<StackDefinition>,
    pub warnings: Vec<String>,
}

impl CloudAssembly {
    pub fn stack(&self, id: &str) -> Option<&StackDefinition> {
        self.stacks.iter().find(|stack| stack.id == id)
    }

    pub fn template_file(stack: &StackDefinition) -> String {
        format!("{}.template.json", stack.id)
    }

    /// Asset deployments the engine runs after the owning stack deploys.
    pub fn asset_deployments(&self) -> Vec<(&str, &str, &AssetDeployment)> {
        self.stacks
            .iter()
            .flat_map(|stack| {
                stack.resources.iter().filter_map(|resource| match &resource.construct {
                    ResourceConstruct::AssetDeployment(deployment) => {
                        Some((stack.id.as_str(), resource.logical_id.as_str(), deployment))
                    }
                    _ => None,
                })
            })
            .collect()
    }

    /// Code archives the engine must build and upload before deploying the
    /// stack that references them.
    pub fn function_assets(&self) -> Vec<(&str, &str, FunctionCode)> {
        self.stacks
            .iter()
            .flat_map(|stack| {
                stack.resources.iter().filter_map(|resource| match &resource.construct {
                    ResourceConstruct::Function(function) => Some((
                        stack.id.as_str(),
                        resource.logical_id.as_str(),
                        function.code(&stack.env),
                    )),
                    _ => None,
                })
            })
            .collect()
    }

    pub fn manifest(&self) -> Result<Value, InfraError> {
        let manifest = Manifest {
            app: APP_NAME,
            environment: self.environment.as_ref().map(DeploymentEnvironment::as_str),
            stacks: self
                .stacks
                .iter()
                .map(|stack| ManifestStack {
                    id: &stack.id,
                    template_file: Self::template_file(stack),
                    description: &stack.description,
                    environment: &stack.env,
                    tags: &stack.tags,
                    outputs: stack.outputs.iter().map(|output| output.name.as_str()).collect(),
                })
                .collect(),
            asset_deployments: self
                .asset_deployments()
                .into_iter()
                .map(|(stack, logical_id, deployment)| ManifestAsset {
                    stack,
                    logical_id,
                    deployment,
                })
                .collect(),
            function_assets: self
                .function_assets()
                .into_iter()
                .map(|(stack, logical_id, code)| ManifestFunctionCode {
                    stack,
                    logical_id,
                    code,
                })
                .collect(),
            warnings: &self.warnings,
        };
        Ok(serde_json::to_value(manifest)?)
    }

    /// Writes every template and the manifest into `dir`.
    ///
    /// Everything is rendered before the first write, so a failure leaves the
    /// directory untouched.
    #[tracing::instrument(skip(self), fields(stacks = self.stacks.len()))]
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>, InfraError> {
        let mut files = Vec::with_capacity(self.stacks.len() + 1);
        for stack in &self.stacks {
            let body = serde_json::to_string_pretty(&stack.render())?;
            files.push((dir.join(Self::template_file(stack)), body));
        }
        files.push((
            dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&self.manifest()?)?,
        ));

        fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(files.len());
        for (path, body) in files {
            fs::write(&path, body)?;
            tracing::info!("[synth] wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}
