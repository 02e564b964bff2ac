//! Registry Module - Module descriptors available to the expander
//!
//! - `descriptor`: ModuleDescriptor, OperationDescriptor, ConfigShape
//! - `document`: `*.module.yaml` documents → ModuleDescriptor
//! - `loader`: ModuleLoader (directory scan)
//!
//! The registry is built once and read-only afterwards; share it via `Arc`.

mod descriptor;
mod document;
mod loader;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub use descriptor::{
    ConfigShape, ConnectionShape, ModuleDescriptor, OperationDescriptor, PropertyDescriptor,
    CONFIG_ELEMENT, CONFIG_REF_PARAM, CONNECTION_ELEMENT,
};
pub use document::{ModuleDocument, RawConfigShape, RawConnectionShape, RawOperation, RawProperty};
pub use loader::ModuleLoader;

use crate::error::{ModexError, Result};

#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    /// prefix -> descriptor
    modules: BTreeMap<String, Arc<ModuleDescriptor>>,
    /// namespace URI -> prefix
    uris: BTreeMap<String, String>,
    /// namespaces of native, non-expandable connectors
    native: BTreeSet<String>,
}

impl ModuleRegistry {
    pub fn builder() -> ModuleRegistryBuilder {
        ModuleRegistryBuilder::default()
    }

    pub fn get(&self, prefix: &str) -> Option<&Arc<ModuleDescriptor>> {
        self.modules.get(prefix)
    }

    /// Look up by prefix or namespace URI.
    pub fn resolve(&self, namespace: &str) -> Option<&Arc<ModuleDescriptor>> {
        self.modules.get(namespace).or_else(|| {
            self.uris
                .get(namespace)
                .and_then(|prefix| self.modules.get(prefix))
        })
    }

    #[inline]
    pub fn is_module(&self, prefix: &str) -> bool {
        self.modules.contains_key(prefix)
    }

    #[inline]
    pub fn is_native(&self, namespace: &str) -> bool {
        self.native.contains(namespace)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Arc<ModuleDescriptor>> {
        self.modules.values()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ModuleRegistryBuilder {
    modules: Vec<ModuleDescriptor>,
    native: BTreeSet<String>,
}

impl ModuleRegistryBuilder {
    pub fn module(mut self, module: ModuleDescriptor) -> Self {
        self.modules.push(module);
        self
    }

    pub fn modules(mut self, modules: impl IntoIterator<Item = ModuleDescriptor>) -> Self {
        self.modules.extend(modules);
        self
    }

    pub fn native(mut self, namespace: impl Into<String>) -> Self {
        self.native.insert(namespace.into());
        self
    }

    pub fn build(self) -> Result<ModuleRegistry> {
        let mut registry = ModuleRegistry {
            native: self.native,
            ..ModuleRegistry::default()
        };

        for module in self.modules {
            if registry.native.contains(&module.prefix) {
                return Err(ModexError::NativeClash {
                    prefix: module.prefix,
                });
            }
            if registry.modules.contains_key(&module.prefix) {
                return Err(ModexError::DuplicateModule {
                    prefix: module.prefix,
                });
            }
            if !module.namespace_uri.is_empty() {
                registry
                    .uris
                    .insert(module.namespace_uri.clone(), module.prefix.clone());
            }
            registry
                .modules
                .insert(module.prefix.clone(), Arc::new(module));
        }

        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(prefix: &str) -> ModuleDescriptor {
        ModuleDescriptor {
            name: format!("module-{prefix}"),
            prefix: prefix.to_string(),
            namespace_uri: format!("http://example.com/{prefix}"),
            dependencies: Vec::new(),
            config: None,
            global_elements: Vec::new(),
            operations: Vec::new(),
        }
    }

    #[test]
    fn test_resolve_by_prefix_or_uri() {
        let registry = ModuleRegistry::builder()
            .module(module("math"))
            .native("http")
            .build()
            .unwrap();

        assert!(registry.resolve("math").is_some());
        assert!(registry.resolve("http://example.com/math").is_some());
        assert!(registry.resolve("http").is_none());
        assert!(registry.is_native("http"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_prefix_rejected() {
        let err = ModuleRegistry::builder()
            .modules([module("math"), module("math")])
            .build()
            .unwrap_err();
        assert!(matches!(err, ModexError::DuplicateModule { .. }));
    }

    #[test]
    fn test_native_clash_rejected() {
        let err = ModuleRegistry::builder()
            .module(module("http"))
            .native("http")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("MX-031"));
    }
}
