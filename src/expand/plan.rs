//! Per-module expansion plan
//!
//! Everything about a module that does not depend on the artifact being
//! expanded, computed once and cached by the orchestrator.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::ast::{BoundModel, ComponentNode};
use crate::registry::{ModuleDescriptor, CONFIG_ELEMENT, CONNECTION_ELEMENT};

/// Root holding a config-less module's default global elements
pub const DEFAULT_GLOBAL_ELEMENTS: &str = "_defaultGlobalElements";
/// Name of the scope an operation call expands into (core namespace)
pub const OPERATION_CHAIN: &str = "module-operation-chain";

#[derive(Debug, Clone)]
pub struct ModulePlan {
    pub module: Arc<ModuleDescriptor>,
    /// Ids of the module's global-element templates
    pub global_ids: Arc<BTreeSet<String>>,
    /// Suffix for calls of a module with global elements but no config
    pub default_global_name: Option<String>,
    /// Name of the implicit config, when the config shape allows one
    pub implicit_config_name: Option<String>,
}

impl ModulePlan {
    pub fn new(module: Arc<ModuleDescriptor>) -> Self {
        let default_global_name = (module.config.is_none() && !module.global_elements.is_empty())
            .then(|| format!("{}-default-config-global-element-suffix", module.name));
        let implicit_config_name = module
            .config
            .as_ref()
            .filter(|shape| shape.allows_defaults())
            .map(|_| format!("{}-implicit-config", module.name));

        Self {
            global_ids: Arc::new(module.global_element_ids()),
            default_global_name,
            implicit_config_name,
            module,
        }
    }

    #[inline]
    pub fn prefix(&self) -> &str {
        &self.module.prefix
    }

    /// Operation a node invokes: its bound model, else its name.
    pub fn operation_name<'n>(&self, node: &'n ComponentNode) -> &'n str {
        match &node.model {
            Some(BoundModel::Operation { name }) => name,
            _ => &node.identifier.name,
        }
    }

    pub fn is_operation_call(&self, node: &ComponentNode) -> bool {
        if !node.in_namespace(self.prefix()) {
            return false;
        }
        match &node.model {
            Some(BoundModel::Operation { .. }) => true,
            Some(_) => false,
            None => self.module.operation(&node.identifier.name).is_some(),
        }
    }

    pub fn is_global_element(&self, node: &ComponentNode) -> bool {
        if !node.in_namespace(self.prefix()) {
            return false;
        }
        match &node.model {
            Some(BoundModel::Configuration) => true,
            Some(_) => false,
            None => node.identifier.name == CONFIG_ELEMENT,
        }
    }

    pub fn is_default_global_elements(&self, node: &ComponentNode) -> bool {
        node.in_namespace(self.prefix()) && node.identifier.name == DEFAULT_GLOBAL_ELEMENTS
    }

    fn is_connection(&self, node: &ComponentNode) -> bool {
        match &node.model {
            Some(BoundModel::Connection) => true,
            Some(_) => false,
            None => node.identifier.name == CONNECTION_ELEMENT,
        }
    }

    /// A node in this module's namespace that expansion cannot handle:
    /// neither an operation call nor a config, connection or default holder.
    pub fn is_unknown_element(&self, node: &ComponentNode) -> bool {
        node.in_namespace(self.prefix())
            && !self.is_operation_call(node)
            && !self.is_global_element(node)
            && !self.is_connection(node)
            && !self.is_default_global_elements(node)
    }
}
