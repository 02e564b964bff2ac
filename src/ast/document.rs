//! YAML application documents
//!
//! ```yaml
//! name: shop-app
//! components:
//!   - element: math:config
//!     id: cfg1
//!     params: { host: a.b.com }
//!   - element: flow
//!     id: main
//!     children:
//!       - element: math:add
//!         params: { config-ref: cfg1, value: "3" }
//! ```
//!
//! Parameter values: scalars are literals, `null` is absent, a mapping
//! with an `element` key is a nested node, and a sequence of
//! `{source, target}` mappings is an error-mappings value.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use super::artifact::ArtifactTree;
use super::identifier::ComponentIdentifier;
use super::location::{Location, LocationPart};
use super::node::{ComponentKind, ComponentNode, ErrorMapping, ParamValue};
use crate::error::{ModexError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct AppDocument {
    #[serde(default)]
    pub name: Option<String>,
    /// Stamped on every location part
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub components: Vec<RawComponent>,
}

/// A component as authored, before identifiers and parameters are typed
#[derive(Debug, Clone, Deserialize)]
pub struct RawComponent {
    pub element: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub params: Mapping,
    #[serde(default)]
    pub children: Vec<RawComponent>,
    #[serde(default)]
    pub kind: Option<ComponentKind>,
    #[serde(default)]
    pub line: Option<u32>,
}

impl AppDocument {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut doc = Self::from_yaml(&content)?;
        if doc.file.is_none() {
            doc.file = path.file_name().map(|f| f.to_string_lossy().into_owned());
        }
        Ok(doc)
    }

    pub fn into_tree(self) -> Result<ArtifactTree> {
        let file = self.file.as_deref();
        let roots = self
            .components
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let path = raw.id.clone().unwrap_or_else(|| i.to_string());
                let location = Location::new(vec![LocationPart::new(path).at(file.map(String::from), raw.line)]);
                raw.to_node(location, file).map(Arc::new)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ArtifactTree::new(roots))
    }
}

impl RawComponent {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Type this component (and its subtree) at `location`.
    pub fn to_node(&self, location: Location, file: Option<&str>) -> Result<ComponentNode> {
        let identifier = ComponentIdentifier::parse(&self.element)?;
        let mut node = ComponentNode::new(identifier).with_location(location.clone());
        node.id = self.id.clone();
        if let Some(kind) = self.kind {
            node.kind = kind;
        }

        for (key, value) in &self.params {
            let name = key.as_str().ok_or_else(|| self.invalid("parameter names must be strings"))?;
            let part = LocationPart::new(name).at(file.map(String::from), self.line);
            let value = self.param_value(name, value, location.child(part), file)?;
            node = node.with_param(name, value);
        }

        for (i, child) in self.children.iter().enumerate() {
            let part = LocationPart::new(i.to_string()).at(file.map(String::from), child.line);
            node = node.with_child(child.to_node(location.child(part), file)?);
        }

        Ok(node)
    }

    fn param_value(
        &self,
        name: &str,
        value: &Value,
        location: Location,
        file: Option<&str>,
    ) -> Result<ParamValue> {
        match value {
            Value::Null => Ok(ParamValue::Absent),
            Value::Bool(b) => Ok(ParamValue::Literal(b.to_string())),
            Value::Number(n) => Ok(ParamValue::Literal(n.to_string())),
            Value::String(s) => Ok(ParamValue::Literal(s.clone())),
            Value::Mapping(map) if map.contains_key("element") => {
                let raw: RawComponent = serde_yaml::from_value(value.clone())?;
                Ok(ParamValue::Node(Arc::new(raw.to_node(location, file)?)))
            }
            Value::Sequence(_) => {
                let mappings: Vec<ErrorMapping> = serde_yaml::from_value(value.clone())
                    .map_err(|_| self.invalid(&format!("parameter '{name}' must be a list of {{source, target}}")))?;
                Ok(ParamValue::ErrorMappings(mappings))
            }
            _ => Err(self.invalid(&format!("unsupported value for parameter '{name}'"))),
        }
    }

    fn invalid(&self, reason: &str) -> ModexError {
        ModexError::InvalidDocument {
            source_name: self.element.clone(),
            reason: reason.to_string(),
        }
    }
}
