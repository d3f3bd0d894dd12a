// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Stack definitions and their CloudFormation rendering.
//!
//! A [`StackDefinition`] is the in-memory resource graph for one stack: an
//! ordered list of constructs plus the named outputs other stacks and tools
//! consume. [`StackDefinition::render`] turns it into template JSON; nothing
//! here talks to AWS.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

use crate::constants::TEMPLATE_FORMAT_VERSION;
use crate::resources::ResourceConstruct;

/// A template value: either a literal or a CloudFormation intrinsic that the
/// provisioning engine resolves at deploy time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(String),
    Ref(String),
    GetAtt(String, String),
    Join(Vec<Expr>),
}

impl Expr {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn reference(logical_id: impl Into<String>) -> Self {
        Self::Ref(logical_id.into())
    }

    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::GetAtt(logical_id.into(), attribute.into())
    }

    /// Concatenates parts, folding adjacent literals so fully known values
    /// collapse back into a plain string.
    pub fn concat(parts: impl IntoIterator<Item = Expr>) -> Self {
        let mut folded: Vec<Expr> = Vec::new();
        for part in parts {
            let parts = match part {
                Expr::Join(inner) => inner,
                other => vec![other],
            };
            for part in parts {
                match part {
                    Expr::Literal(next) => match folded.last_mut() {
                        Some(Expr::Literal(last)) => last.push_str(&next),
                        _ => folded.push(Expr::Literal(next)),
                    },
                    other => folded.push(other),
                }
            }
        }

        match folded.len() {
            0 => Expr::Literal(String::new()),
            1 => folded.remove(0),
            _ => Expr::Join(folded),
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(value) => Some(value),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Literal(value) => Value::String(value.clone()),
            Self::Ref(id) => json!({ "Ref": id }),
            Self::GetAtt(id, attribute) => json!({ "Fn::GetAtt": [id, attribute] }),
            Self::Join(parts) => {
                let parts: Vec<Value> = parts.iter().map(Expr::to_value).collect();
                json!({ "Fn::Join": ["", parts] })
            }
        }
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Account and region a stack deploys into. An unknown account is left to
/// the `AWS::AccountId` pseudo parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackEnv {
    pub account: Option<String>,
    pub region: String,
}

impl StackEnv {
    pub fn account(&self) -> Expr {
        match &self.account {
            Some(account) => Expr::literal(account.clone()),
            None => Expr::reference("AWS::AccountId"),
        }
    }

    pub fn region(&self) -> Expr {
        Expr::literal(self.region.clone())
    }
}

pub type Tags = BTreeMap<String, String>;

pub fn tags_value(tags: &Tags) -> Value {
    Value::Array(
        tags.iter()
            .map(|(key, value)| json!({ "Key": key, "Value": value }))
            .collect(),
    )
}

/// A named output, exported so other stacks and tools can import it.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub name: String,
    pub value: Expr,
    pub description: String,
    pub export_name: String,
}

#[derive(Debug, Clone)]
pub struct Resource {
    pub logical_id: String,
    pub construct: ResourceConstruct,
}

#[derive(Debug, Clone)]
pub struct StackDefinition {
    pub id: String,
    pub description: String,
    pub env: StackEnv,
    pub resources: Vec<Resource>,
    pub outputs: Vec<Output>,
    pub tags: Tags,
}

impl StackDefinition {
    pub fn new(id: impl Into<String>, description: impl Into<String>, env: StackEnv) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            env,
            resources: Vec::new(),
            outputs: Vec::new(),
            tags: Tags::new(),
        }
    }

    /// Adds a construct and returns its logical id for later references.
    pub fn add(&mut self, logical_id: &str, construct: impl Into<ResourceConstruct>) -> String {
        self.resources.push(Resource {
            logical_id: logical_id.to_string(),
            construct: construct.into(),
        });
        logical_id.to_string()
    }

    pub fn add_output(&mut self, name: &str, value: Expr, description: &str, export_suffix: &str) {
        self.outputs.push(Output {
            name: name.to_string(),
            value,
            description: description.to_string(),
            export_name: format!("{}-{}", self.id, export_suffix),
        });
    }

    pub fn add_tag(&mut self, key: &str, value: &str) {
        self.tags.insert(key.to_string(), value.to_string());
    }

    pub fn resource(&self, logical_id: &str) -> Option<&ResourceConstruct> {
        self.resources
            .iter()
            .find(|resource| resource.logical_id == logical_id)
            .map(|resource| &resource.construct)
    }

    pub fn output(&self, name: &str) -> Option<&Output> {
        self.outputs.iter().find(|output| output.name == name)
    }

    /// Renders the CloudFormation template. Stack tags are stamped onto every
    /// taggable resource.
    pub fn render(&self) -> Value {
        let mut resources = Map::new();
        for resource in &self.resources {
            for (id, body) in resource
                .construct
                .render(&resource.logical_id, &self.env, &self.tags)
            {
                resources.insert(id, body);
            }
        }

        let mut outputs = Map::new();
        for output in &self.outputs {
            outputs.insert(
                output.name.clone(),
                json!({
                    "Description": output.description,
                    "Value": output.value,
                    "Export": { "Name": output.export_name },
                }),
            );
        }

        json!({
            "AWSTemplateFormatVersion": TEMPLATE_FORMAT_VERSION,
            "Description": self.description,
            "Resources": resources,
            "Outputs": outputs,
        })
    }
}
