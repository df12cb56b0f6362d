//! Declarative resource programs
//!
//! A [`Program`] is what gets handed to the engine for create and update. It
//! follows the Pulumi YAML document shape: named variables, named resources
//! with a type token and properties, and named outputs. Values may reference
//! other resources with `${resource.property}` interpolation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declarative description of a stack's resources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Values computed once per deployment (e.g. data source lookups)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, serde_json::Value>,

    /// Resources indexed by logical name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, Resource>,

    /// Stack outputs indexed by output name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, serde_json::Value>,
}

impl Program {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    /// Program with no resources, used when only a stack handle is needed
    pub fn noop() -> Self {
        Self::default()
    }

    pub fn is_noop(&self) -> bool {
        self.variables.is_empty() && self.resources.is_empty() && self.outputs.is_empty()
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn with_resource(mut self, name: impl Into<String>, resource: Resource) -> Self {
        self.resources.insert(name.into(), resource);
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.set_output(name, value);
        self
    }

    pub fn set_output(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.outputs.insert(name.into(), value);
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    pub fn by_type(&self, resource_type: &str) -> Vec<&Resource> {
        self.resources
            .values()
            .filter(|r| r.resource_type == resource_type)
            .collect()
    }
}

/// A single declared resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Type token (e.g., "aws:s3:Bucket")
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Resource-specific properties
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub properties: serde_json::Value,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, properties: serde_json::Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties,
        }
    }

    /// Get a property value as a specific type
    pub fn get_property<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.properties
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Escape user-supplied text so the engine does not treat `${...}` as interpolation
pub fn literal(text: &str) -> String {
    text.replace("${", "$${")
}

/// Reference to a property of another resource
pub fn reference(resource: &str, property: &str) -> String {
    format!("${{{resource}.{property}}}")
}
