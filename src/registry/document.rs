//! `*.module.yaml` documents
//!
//! ```yaml
//! name: math
//! prefix: math
//! namespace: http://example.com/math
//! dependencies: [http]
//! config:
//!   properties:
//!     - { name: host, default: localhost }
//!   connection:
//!     properties: [ { name: user } ]
//! global-elements:
//!   - element: http:request-config
//!     id: http-cfg
//!     params: { host: "#[vars.host]" }
//! operations:
//!   - name: add
//!     parameters: [ { name: value, default: "0" } ]
//!     body:
//!       - element: http:request
//!         params: { config-ref: http-cfg, path: "#[vars.value]" }
//! ```
//!
//! Global element `i` is located at `<module>/global-elements/<i>` and
//! body node `i` of operation `op` at `<op>/body/<i>`, so dropping the
//! first two segments of any template location leaves its position
//! inside the template.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_yaml::Value;

use super::descriptor::{
    ConfigShape, ConnectionShape, ModuleDescriptor, OperationDescriptor, PropertyDescriptor,
};
use crate::ast::{ComponentNode, Location, LocationPart, RawComponent};
use crate::error::{ModexError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleDocument {
    pub name: String,
    pub prefix: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub config: Option<RawConfigShape>,
    #[serde(default)]
    pub global_elements: Vec<RawComponent>,
    #[serde(default)]
    pub operations: Vec<RawOperation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigShape {
    #[serde(default)]
    pub properties: Vec<RawProperty>,
    #[serde(default)]
    pub connection: Option<RawConnectionShape>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConnectionShape {
    #[serde(default)]
    pub properties: Vec<RawProperty>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawProperty {
    pub name: String,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawOperation {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<RawProperty>,
    #[serde(default)]
    pub body: Vec<RawComponent>,
}

impl ModuleDocument {
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

    pub fn into_descriptor(self) -> Result<ModuleDescriptor> {
        if self.name.trim().is_empty() || self.prefix.trim().is_empty() {
            return Err(ModexError::InvalidDocument {
                source_name: self.file.clone().unwrap_or_else(|| "<module>".into()),
                reason: "module 'name' and 'prefix' must not be empty".into(),
            });
        }
        let file = self.file.as_deref();

        let config = self
            .config
            .map(|shape| -> Result<ConfigShape> {
                Ok(ConfigShape {
                    properties: properties(shape.properties)?,
                    connection: shape
                        .connection
                        .map(|c| properties(c.properties).map(|properties| ConnectionShape { properties }))
                        .transpose()?,
                })
            })
            .transpose()?;

        let global_elements = templates(&self.global_elements, &self.name, "global-elements", file)?;

        let operations = self
            .operations
            .into_iter()
            .map(|op| {
                Ok(OperationDescriptor {
                    body: templates(&op.body, &op.name, "body", file)?,
                    name: op.name,
                    parameters: properties(op.parameters)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ModuleDescriptor {
            namespace_uri: self.namespace.unwrap_or_default(),
            name: self.name,
            prefix: self.prefix,
            dependencies: self.dependencies,
            config,
            global_elements,
            operations,
        })
    }
}

fn templates(
    raw: &[RawComponent],
    owner: &str,
    section: &str,
    file: Option<&str>,
) -> Result<Vec<Arc<ComponentNode>>> {
    raw.iter()
        .enumerate()
        .map(|(i, component)| {
            let at = |path: String, line| LocationPart::new(path).at(file.map(String::from), line);
            let location = Location::new(vec![
                at(owner.to_string(), component.line),
                at(section.to_string(), component.line),
                at(i.to_string(), component.line),
            ]);
            component.to_node(location, file).map(Arc::new)
        })
        .collect()
}

fn properties(raw: Vec<RawProperty>) -> Result<Vec<PropertyDescriptor>> {
    raw.into_iter()
        .map(|p| {
            let default = match p.default {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s),
                Some(Value::Bool(b)) => Some(b.to_string()),
                Some(Value::Number(n)) => Some(n.to_string()),
                Some(_) => {
                    return Err(ModexError::InvalidDocument {
                        source_name: p.name,
                        reason: "property defaults must be scalars".into(),
                    })
                }
            };
            Ok(PropertyDescriptor {
                name: p.name,
                default,
                required: p.required,
            })
        })
        .collect()
}
