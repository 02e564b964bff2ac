//! Macro expander - the whole pass
//!
//! Orders the used modules, runs one [`ModuleExpander`] per module (each
//! seeing the previous module's output) and hoists flows at the end.
//! Per-module plans are cached, so one expander can serve many
//! artifacts, concurrently if needed.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, instrument};

use super::hoist::hoist_flows;
use super::implicit;
use super::module::{ModuleExpander, ModuleState};
use super::plan::ModulePlan;
use super::sorter::DependencyGraph;
use crate::ast::{ArtifactTree, ComponentNode, Descendants};
use crate::config::FeatureFlags;
use crate::error::{ModexError, Result};
use crate::registry::ModuleRegistry;

pub struct MacroExpander {
    registry: Arc<ModuleRegistry>,
    flags: FeatureFlags,
    /// prefix -> plan, filled on first use
    plans: DashMap<String, Arc<ModulePlan>>,
}

impl MacroExpander {
    pub fn new(registry: Arc<ModuleRegistry>, flags: FeatureFlags) -> Self {
        Self {
            registry,
            flags,
            plans: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn flags(&self) -> FeatureFlags {
        self.flags
    }

    /// Cached plan for a registered module.
    pub fn plan(&self, prefix: &str) -> Result<Arc<ModulePlan>> {
        if let Some(plan) = self.plans.get(prefix) {
            return Ok(Arc::clone(plan.value()));
        }
        let module = self
            .registry
            .get(prefix)
            .ok_or_else(|| ModexError::UnknownModule {
                namespace: prefix.to_string(),
            })?;
        let plan = Arc::new(ModulePlan::new(Arc::clone(module)));
        self.plans.insert(prefix.to_string(), Arc::clone(&plan));
        Ok(plan)
    }

    /// Expansion order of the modules `tree` uses; empty when it uses none.
    pub fn order(&self, tree: &ArtifactTree) -> Result<Vec<String>> {
        let graph = DependencyGraph::build(tree, &self.registry)?;
        if graph.is_empty() {
            return Ok(Vec::new());
        }
        graph.topological_order()
    }

    /// Expand every module usage in `tree`.
    ///
    /// The input is never modified. On error nothing is returned: a
    /// half-expanded tree is never handed out.
    #[instrument(skip_all, fields(roots = tree.roots.len()))]
    pub fn expand(&self, tree: &ArtifactTree) -> Result<ArtifactTree> {
        let order = self.order(tree)?;
        if order.is_empty() {
            debug!("No module usages, nothing to expand");
            return Ok(hoist_flows(tree));
        }
        info!(order = %order.join(" → "), "Expanding modules");

        let plans = order
            .iter()
            .map(|prefix| self.plan(prefix))
            .collect::<Result<Vec<_>>>()?;

        let mut expanded: BTreeMap<String, ModuleState> = BTreeMap::new();
        let mut current = tree.clone();
        for (i, plan) in plans.iter().enumerate() {
            // calls still sitting in templates of modules expanded later count too
            let pending = plans[i + 1..]
                .iter()
                .flat_map(|p| p.module.templates())
                .flat_map(Descendants::of);
            let state = ModuleState {
                plan: Arc::clone(plan),
                implicit: implicit::assess(plan, current.descendants().chain(pending), &self.flags),
            };

            current = ModuleExpander::new(&state, &self.flags, &expanded).expand(&current)?;
            expanded.insert(plan.prefix().to_string(), state);
        }

        Ok(hoist_flows(&current))
    }

    /// Nodes of registered modules still present in `tree` that are not
    /// configs, connections or default holders.
    ///
    /// Empty for any tree returned by [`expand`](Self::expand).
    pub fn residual_calls<'t>(&self, tree: &'t ArtifactTree) -> Vec<&'t Arc<ComponentNode>> {
        tree.descendants()
            .filter(|node| {
                node.identifier.is_same_module_call()
                    || self
                        .plan(&node.identifier.namespace)
                        .map(|plan| plan.is_operation_call(node) || plan.is_unknown_element(node))
                        .unwrap_or(false)
            })
            .collect()
    }
}
