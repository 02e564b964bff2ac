//! Module expander: one module's pass over the artifact tree
//!
//! Two phases, each a full copy of the tree:
//!
//! 1. Global elements. Every `<prefix>:config` gets a copy of the
//!    module's global-element templates appended to its children, bound
//!    to that config. The implicit config and the default global
//!    elements are added as extra roots.
//! 2. Operation calls. Every call becomes a `module-operation-chain`
//!    scope holding a rebound copy of the operation body. Config
//!    references resolve against the phase-1 tree, so the copies made
//!    there are visible.
//!
//! Nothing is mutated: both phases share every untouched subtree with
//! their input.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use super::implicit::{self, ImplicitConfig};
use super::literals::{is_expression, InvocationContext, LiteralBindings};
use super::plan::{ModulePlan, DEFAULT_GLOBAL_ELEMENTS, OPERATION_CHAIN};
use super::rebind::{NestedExpansion, RebindScope};
use crate::ast::{
    copy_node_recursively, ArtifactTree, ComponentIdentifier, ComponentKind, ComponentNode,
    DecoratedNode, Location, LocationPart, ParamValue, Parameter, CORE_NAMESPACE,
};
use crate::config::FeatureFlags;
use crate::error::{ModexError, Result};
use crate::registry::{CONFIG_REF_PARAM, CONNECTION_ELEMENT};

/// A module's plan plus the per-artifact implicit-config decision
#[derive(Debug, Clone)]
pub struct ModuleState {
    pub plan: Arc<ModulePlan>,
    pub implicit: ImplicitConfig,
}

/// Where an operation call takes its config-ref from
#[derive(Debug, Clone, Copy)]
enum ConfigSource<'c> {
    /// The call's own `config-ref`, or the module's fallback
    CallSite,
    /// Same-module call: the enclosing invocation's config-ref
    Propagated(Option<&'c str>),
}

pub struct ModuleExpander<'a> {
    state: &'a ModuleState,
    flags: &'a FeatureFlags,
    /// Modules already expanded earlier in the pass, by prefix
    upstream: &'a BTreeMap<String, ModuleState>,
    /// Operations currently being expanded, innermost last
    active: RefCell<Vec<String>>,
}

/// Default global elements are inserted once and never rewritten.
fn is_sealed(node: &ComponentNode) -> bool {
    node.identifier.name == DEFAULT_GLOBAL_ELEMENTS
}

impl<'a> ModuleExpander<'a> {
    pub fn new(
        state: &'a ModuleState,
        flags: &'a FeatureFlags,
        upstream: &'a BTreeMap<String, ModuleState>,
    ) -> Self {
        Self {
            state,
            flags,
            upstream,
            active: RefCell::new(Vec::new()),
        }
    }

    fn plan(&self) -> &ModulePlan {
        &self.state.plan
    }

    /// Run both phases over `tree`.
    pub fn expand(&self, tree: &ArtifactTree) -> Result<ArtifactTree> {
        let plan = self.plan();

        debug!(module = %plan.prefix(), "Expanding global elements");
        let with_globals = tree.copy_recursively(
            |node| {
                if plan.is_global_element(node) {
                    self.expand_global_element(node, tree).map(Some)
                } else {
                    Ok(None)
                }
            },
            || self.synthesized_roots(tree),
            is_sealed,
        )?;

        debug!(module = %plan.prefix(), "Expanding operation calls");
        with_globals.copy_recursively(
            |node| self.expand_call_site(node, &with_globals),
            || Ok(Vec::new()),
            is_sealed,
        )
    }

    // ═══════════════════════════════════════════
    // GLOBAL ELEMENTS
    // ═══════════════════════════════════════════

    /// Append the module's global elements, bound to this config, to its children.
    fn expand_global_element(
        &self,
        config: &Arc<ComponentNode>,
        lookup: &ArtifactTree,
    ) -> Result<Arc<ComponentNode>> {
        let plan = self.plan();
        let properties = self.config_properties(config);
        let context = InvocationContext {
            config_ref: config.id.clone(),
            suffix: config.id.clone().unwrap_or_default(),
            literals: Arc::new(LiteralBindings::resolve(
                properties.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                Vec::<(&str, &str)>::new(),
            )),
            global_ids: Arc::clone(&plan.global_ids),
        };

        let mut children = config.children.clone();
        children.extend(self.expand_templates(&context, lookup)?);

        debug!(
            module = %plan.prefix(),
            config = config.id.as_deref().unwrap_or_default(),
            globals = plan.module.global_elements.len(),
            "Expanded global element"
        );
        Ok(DecoratedNode::new(Arc::clone(config))
            .with_children(children)
            .into_node())
    }

    fn expand_templates(
        &self,
        context: &InvocationContext,
        lookup: &ArtifactTree,
    ) -> Result<Vec<Arc<ComponentNode>>> {
        self.plan()
            .module
            .global_elements
            .iter()
            .map(|template| {
                let anchor = global_anchor(template, &context.suffix);
                let scope = RebindScope {
                    context,
                    anchor: &anchor,
                    lookup,
                    nested: self,
                };
                scope.rebind_tree(template)
            })
            .collect()
    }

    /// The implicit config and the default global elements, each only once.
    fn synthesized_roots(&self, tree: &ArtifactTree) -> Result<Vec<Arc<ComponentNode>>> {
        let plan = self.plan();
        let mut roots = Vec::new();

        if self.state.implicit.synthesize {
            if let Some(name) = plan.implicit_config_name.as_deref() {
                let exists = tree
                    .find(|n| plan.is_global_element(n) && n.id.as_deref() == Some(name))
                    .is_some();
                if !exists {
                    if let Some(config) = implicit::synthesize(plan) {
                        debug!(module = %plan.prefix(), config = name, "Adding implicit config");
                        roots.push(self.expand_global_element(&Arc::new(config), tree)?);
                    }
                }
            }
        }

        if let Some(name) = plan.default_global_name.as_deref() {
            let exists = tree.roots.iter().any(|r| plan.is_default_global_elements(r));
            if !exists {
                let context = InvocationContext {
                    config_ref: Some(name.to_string()),
                    suffix: name.to_string(),
                    literals: Arc::new(LiteralBindings::default()),
                    global_ids: Arc::clone(&plan.global_ids),
                };
                let mut holder = ComponentNode::new(ComponentIdentifier::new(
                    plan.prefix(),
                    DEFAULT_GLOBAL_ELEMENTS,
                ))
                .with_location(Location::root(DEFAULT_GLOBAL_ELEMENTS));
                holder.children = self.expand_templates(&context, tree)?;
                roots.push(Arc::new(holder));
            }
        }

        Ok(roots)
    }

    /// Shape defaults, the config's own literals, then its connection's.
    fn config_properties(&self, config: &ComponentNode) -> Vec<(String, String)> {
        let mut properties: Vec<(String, String)> = Vec::new();
        let shape = self.plan().module.config.as_ref();

        if let Some(shape) = shape {
            properties.extend(
                shape
                    .property_defaults()
                    .map(|(k, v)| (k.to_string(), v.to_string())),
            );
        }
        properties.extend(
            config
                .literal_params()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );

        if let Some(shape) = shape.filter(|s| s.connection.is_some()) {
            properties.extend(
                shape
                    .connection_defaults()
                    .map(|(k, v)| (k.to_string(), v.to_string())),
            );
            let connection = config
                .children
                .iter()
                .find(|c| c.identifier.name == CONNECTION_ELEMENT);
            if let Some(connection) = connection {
                properties.extend(
                    connection
                        .literal_params()
                        .map(|(k, v)| (k.to_string(), v.to_string())),
                );
            }
        }
        properties
    }

    // ═══════════════════════════════════════════
    // OPERATION CALLS
    // ═══════════════════════════════════════════

    fn expand_call_site(
        &self,
        node: &Arc<ComponentNode>,
        lookup: &ArtifactTree,
    ) -> Result<Option<Arc<ComponentNode>>> {
        let plan = self.plan();
        if plan.is_operation_call(node) {
            return self
                .expand_operation(node, ConfigSource::CallSite, lookup)
                .map(Some);
        }
        if plan.is_unknown_element(node) {
            return Err(ModexError::UnknownOperation {
                module: plan.module.name.clone(),
                operation: plan.operation_name(node).to_string(),
            });
        }
        Ok(None)
    }

    fn expand_operation(
        &self,
        call: &Arc<ComponentNode>,
        source: ConfigSource<'_>,
        lookup: &ArtifactTree,
    ) -> Result<Arc<ComponentNode>> {
        let plan = self.plan();
        let name = plan.operation_name(call);
        let operation = plan
            .module
            .operation(name)
            .ok_or_else(|| ModexError::UnknownOperation {
                module: plan.module.name.clone(),
                operation: name.to_string(),
            })?;

        if self.active.borrow().iter().any(|active| active == name) {
            return Err(ModexError::RecursiveOperation {
                module: plan.module.name.clone(),
                operation: name.to_string(),
            });
        }

        let config_ref = match source {
            ConfigSource::CallSite => self.resolve_config_ref(call),
            ConfigSource::Propagated(inherited) => inherited.map(String::from),
        };
        let properties = self.extract_properties(config_ref.as_deref(), lookup)?;
        let parameters = operation
            .parameter_defaults()
            .chain(call.literal_params().filter(|(k, _)| *k != CONFIG_REF_PARAM));
        let literals = LiteralBindings::resolve(
            properties.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            parameters,
        );

        let context = InvocationContext {
            suffix: config_ref.clone().unwrap_or_default(),
            config_ref,
            literals: Arc::new(literals),
            global_ids: Arc::clone(&plan.global_ids),
        };
        let anchor = operation_anchor(call, &operation.name);
        let scope = RebindScope {
            context: &context,
            anchor: &anchor,
            lookup,
            nested: self,
        };

        self.active.borrow_mut().push(operation.name.clone());
        let body: Result<Vec<_>> = operation
            .body
            .iter()
            .map(|template| scope.rebind_tree(template))
            .collect();
        self.active.borrow_mut().pop();
        let body = body?;

        let parameters = self.expand_call_parameters(call, lookup)?;

        trace!(
            module = %plan.prefix(),
            operation = %operation.name,
            config_ref = context.config_ref.as_deref().unwrap_or_default(),
            literals = context.literals.len(),
            "Expanded operation call"
        );
        Ok(DecoratedNode::new(Arc::clone(call))
            .with_identifier(ComponentIdentifier::new(CORE_NAMESPACE, OPERATION_CHAIN))
            .with_kind(ComponentKind::Scope)
            .with_origin(ComponentIdentifier::new(plan.prefix(), operation.name.as_str()))
            .with_parameters(parameters)
            .with_children(body)
            .into_node())
    }

    /// Module usages nested in the call's object-valued parameters.
    fn expand_call_parameters(
        &self,
        call: &ComponentNode,
        lookup: &ArtifactTree,
    ) -> Result<Vec<Parameter>> {
        let mut replace = |node: &Arc<ComponentNode>| self.expand_call_site(node, lookup);
        call.parameters
            .iter()
            .map(|param| {
                let value = match &param.value {
                    ParamValue::Node(inner) => {
                        ParamValue::Node(copy_node_recursively(inner, &mut replace, &is_sealed)?)
                    }
                    other => other.clone(),
                };
                Ok(Parameter::new(param.name.clone(), value))
            })
            .collect()
    }

    /// Explicit `config-ref`, else the default global-element name, else
    /// the implicit config when one was inserted.
    fn resolve_config_ref(&self, call: &ComponentNode) -> Option<String> {
        let plan = self.plan();
        if let Some(config_ref) = call.literal_param(CONFIG_REF_PARAM) {
            return Some(config_ref.to_string());
        }
        if let Some(name) = &plan.default_global_name {
            return Some(name.clone());
        }
        if self.state.implicit.synthesize {
            return plan.implicit_config_name.clone();
        }
        None
    }

    /// Properties of the referenced config, looked up in `lookup` and then
    /// its parents.
    fn extract_properties(
        &self,
        config_ref: Option<&str>,
        lookup: &ArtifactTree,
    ) -> Result<Vec<(String, String)>> {
        let plan = self.plan();
        let Some(name) = config_ref else {
            return Ok(Vec::new());
        };
        if self.flags.dynamic_config_ref && is_expression(name) {
            debug!(module = %plan.prefix(), config_ref = name, "Dynamic config-ref, nothing to fold");
            return Ok(Vec::new());
        }
        if plan.default_global_name.as_deref() == Some(name) {
            return Ok(Vec::new());
        }

        let config = lookup
            .find_in_scope(|n| plan.is_global_element(n) && n.id.as_deref() == Some(name))
            .ok_or_else(|| ModexError::UnresolvedConfigRef {
                prefix: plan.prefix().to_string(),
                name: name.to_string(),
            })?;
        Ok(self.config_properties(&config))
    }

    /// Expand a node of this module found inside a rebound template.
    fn expand_owned(
        &self,
        node: Arc<ComponentNode>,
        lookup: &ArtifactTree,
        include_globals: bool,
    ) -> Result<Arc<ComponentNode>> {
        let plan = self.plan();
        if plan.is_operation_call(&node) {
            self.expand_operation(&node, ConfigSource::CallSite, lookup)
        } else if include_globals && plan.is_global_element(&node) {
            self.expand_global_element(&node, lookup)
        } else if plan.is_unknown_element(&node) {
            Err(ModexError::UnknownOperation {
                module: plan.module.name.clone(),
                operation: plan.operation_name(&node).to_string(),
            })
        } else {
            Ok(node)
        }
    }
}

impl NestedExpansion for ModuleExpander<'_> {
    fn expand_nested(
        &self,
        node: Arc<ComponentNode>,
        scope: &RebindScope<'_>,
    ) -> Result<Arc<ComponentNode>> {
        if node.identifier.is_same_module_call() {
            let inherited = scope.context.config_ref.as_deref();
            return self.expand_operation(&node, ConfigSource::Propagated(inherited), scope.lookup);
        }
        if node.in_namespace(self.plan().prefix()) {
            return self.expand_owned(node, scope.lookup, false);
        }
        match self.upstream.get(&node.identifier.namespace) {
            Some(state) => ModuleExpander::new(state, self.flags, self.upstream).expand_owned(
                node,
                scope.lookup,
                true,
            ),
            None => Ok(node),
        }
    }
}

/// `<template id>-<suffix>`, or the bare suffix for anonymous templates.
fn global_anchor(template: &ComponentNode, suffix: &str) -> LocationPart {
    let path = match &template.id {
        Some(id) => format!("{id}-{suffix}"),
        None => suffix.to_string(),
    };
    let (file, line) = template
        .location
        .first()
        .map(|p| (p.file.clone(), p.line))
        .unwrap_or_default();
    LocationPart::new(path).at(file, line)
}

/// `<call location>-<operation>`, keeping the call's file and line.
fn operation_anchor(call: &ComponentNode, operation: &str) -> LocationPart {
    let enclosing = if call.location.is_empty() {
        call.id.clone().unwrap_or_default()
    } else {
        call.location.to_string()
    };
    let (file, line) = call
        .location
        .last()
        .map(|p| (p.file.clone(), p.line))
        .unwrap_or_default();
    LocationPart::new(format!("{enclosing}-{operation}")).at(file, line)
}
