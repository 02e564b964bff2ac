//! Component nodes
//!
//! A node is immutable once built; children and nested parameter nodes
//! are shared through `Arc` so copies only allocate what they change.

use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};

use super::identifier::ComponentIdentifier;
use super::location::Location;

/// Component-kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    Flow,
    SubFlow,
    Operation,
    Config,
    Connection,
    Scope,
    Processor,
}

impl ComponentKind {
    /// Kind implied by an identifier when none is declared.
    pub fn infer(identifier: &ComponentIdentifier) -> Self {
        match identifier.name.as_str() {
            "flow" => Self::Flow,
            "sub-flow" => Self::SubFlow,
            "config" => Self::Config,
            "connection" => Self::Connection,
            "module-operation-chain" => Self::Scope,
            _ => Self::Processor,
        }
    }

    #[inline]
    pub fn is_flow(self) -> bool {
        matches!(self, Self::Flow | Self::SubFlow)
    }
}

/// Model a node was bound to by the loader, if any
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundModel {
    Operation { name: String },
    Configuration,
    Connection,
}

/// One `source → target` pair of an error-mappings parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorMapping {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Literal(String),
    Node(Arc<ComponentNode>),
    ErrorMappings(Vec<ErrorMapping>),
    Absent,
}

impl ParamValue {
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: ParamValue,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: ParamValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, ParamValue::Literal(value.into()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentNode {
    #[serde(rename = "element")]
    pub identifier: ComponentIdentifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Location::is_empty")]
    pub location: Location,
    #[serde(rename = "params", serialize_with = "serialize_params", skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Arc<ComponentNode>>,
    pub kind: ComponentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<BoundModel>,
    /// Identifier of the module operation this node was expanded from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<ComponentIdentifier>,
}

fn serialize_params<S: Serializer>(params: &[Parameter], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(params.iter().map(|p| (&p.name, &p.value)))
}

impl ComponentNode {
    pub fn new(identifier: ComponentIdentifier) -> Self {
        let kind = ComponentKind::infer(&identifier);
        Self {
            identifier,
            id: None,
            location: Location::default(),
            parameters: Vec::new(),
            children: Vec::new(),
            kind,
            model: None,
            origin: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn with_kind(mut self, kind: ComponentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_model(mut self, model: BoundModel) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.parameters.push(Parameter::new(name, value));
        self
    }

    pub fn with_literal(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_param(name, ParamValue::Literal(value.into()))
    }

    pub fn with_child(mut self, child: impl Into<Arc<ComponentNode>>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    /// Literal value of a parameter; `None` when absent or not a literal.
    pub fn literal_param(&self, name: &str) -> Option<&str> {
        self.param(name).and_then(ParamValue::as_literal)
    }

    /// Every set literal parameter, in declared order.
    pub fn literal_params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters
            .iter()
            .filter_map(|p| p.value.as_literal().map(|v| (p.name.as_str(), v)))
    }

    /// Nodes nested in parameter values.
    pub fn param_nodes(&self) -> impl Iterator<Item = &Arc<ComponentNode>> {
        self.parameters.iter().filter_map(|p| match &p.value {
            ParamValue::Node(node) => Some(node),
            _ => None,
        })
    }

    #[inline]
    pub fn is_flow(&self) -> bool {
        self.kind.is_flow()
    }

    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.identifier.namespace == namespace
    }
}
