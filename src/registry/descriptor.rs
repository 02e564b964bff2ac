//! Module, operation and configuration descriptors
//!
//! Descriptors are read-only once built and shared through `Arc`.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::ast::ComponentNode;

/// Name of a module's configuration global element (`<prefix>:config`)
pub const CONFIG_ELEMENT: &str = "config";
/// Name of the connection child of a configuration (`<prefix>:connection`)
pub const CONNECTION_ELEMENT: &str = "connection";
/// Parameter through which a call names its configuration
pub const CONFIG_REF_PARAM: &str = "config-ref";

/// A declared property or operation parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub default: Option<String>,
    pub required: bool,
}

impl PropertyDescriptor {
    pub fn optional(name: impl Into<String>, default: Option<&str>) -> Self {
        Self {
            name: name.into(),
            default: default.map(String::from),
            required: false,
        }
    }

    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            required: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionShape {
    pub properties: Vec<PropertyDescriptor>,
}

/// Properties a module's `config` element accepts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigShape {
    pub properties: Vec<PropertyDescriptor>,
    pub connection: Option<ConnectionShape>,
}

impl ConfigShape {
    /// True when nothing but `name` is required, so a default instance can exist.
    pub fn allows_defaults(&self) -> bool {
        !self
            .properties
            .iter()
            .any(|p| p.required && p.name != "name")
    }

    pub fn property_defaults(&self) -> impl Iterator<Item = (&str, &str)> {
        defaults_of(&self.properties)
    }

    pub fn connection_defaults(&self) -> impl Iterator<Item = (&str, &str)> {
        self.connection
            .iter()
            .flat_map(|c| defaults_of(&c.properties))
    }
}

fn defaults_of(properties: &[PropertyDescriptor]) -> impl Iterator<Item = (&str, &str)> {
    properties
        .iter()
        .filter_map(|p| p.default.as_deref().map(|d| (p.name.as_str(), d)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    pub name: String,
    pub parameters: Vec<PropertyDescriptor>,
    /// Body template; same-module calls use the `tns` prefix
    pub body: Vec<Arc<ComponentNode>>,
}

impl OperationDescriptor {
    pub fn parameter_defaults(&self) -> impl Iterator<Item = (&str, &str)> {
        defaults_of(&self.parameters)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDescriptor {
    pub name: String,
    pub prefix: String,
    pub namespace_uri: String,
    /// Prefixes or namespace URIs of modules and connectors this one uses
    pub dependencies: Vec<String>,
    pub config: Option<ConfigShape>,
    pub global_elements: Vec<Arc<ComponentNode>>,
    pub operations: Vec<OperationDescriptor>,
}

impl ModuleDescriptor {
    pub fn operation(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// Declared ids of the global-element templates
    pub fn global_element_ids(&self) -> BTreeSet<String> {
        self.global_elements
            .iter()
            .filter_map(|g| g.id.clone())
            .collect()
    }

    /// Every template node: global elements and operation bodies
    pub fn templates(&self) -> impl Iterator<Item = &Arc<ComponentNode>> {
        self.global_elements
            .iter()
            .chain(self.operations.iter().flat_map(|op| op.body.iter()))
    }
}
