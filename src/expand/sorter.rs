//! Module dependency graph and its topological order
//!
//! Vertices are the module prefixes reachable from the artifact: used
//! directly anywhere in the tree, used inside another reachable module's
//! templates, or declared as a dependency. Edges run from a module to
//! each module it depends on. Native connectors are not vertices.
//!
//! The order is leaves first, so every module expands after the modules
//! it depends on. Ties are broken by prefix, which makes the order
//! independent of the order modules were supplied in.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use crate::ast::{ArtifactTree, ComponentNode, Descendants};
use crate::error::{ModexError, Result};
use crate::registry::ModuleRegistry;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    /// prefix -> prefixes it depends on
    dependencies: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Graph of every module reachable from `tree`.
    pub fn build(tree: &ArtifactTree, registry: &ModuleRegistry) -> Result<Self> {
        let mut graph = Self::default();
        let mut pending: VecDeque<String> = used_modules(tree.descendants(), registry).collect();

        while let Some(prefix) = pending.pop_front() {
            if graph.dependencies.contains_key(&prefix) {
                continue;
            }
            let module = registry
                .get(&prefix)
                .ok_or_else(|| ModexError::UnknownModule {
                    namespace: prefix.clone(),
                })?;

            let mut edges = BTreeSet::new();
            for dependency in &module.dependencies {
                if registry.is_native(dependency) {
                    continue;
                }
                let target = registry.resolve(dependency).ok_or_else(|| {
                    ModexError::UnsatisfiedDependency {
                        module: prefix.clone(),
                        dependency: dependency.clone(),
                    }
                })?;
                edges.insert(target.prefix.clone());
                pending.push_back(target.prefix.clone());
            }

            let nested = module.templates().flat_map(Descendants::of);
            pending.extend(used_modules(nested, registry).filter(|p| *p != prefix));

            graph.dependencies.insert(prefix, edges);
        }

        Ok(graph)
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.dependencies.contains_key(prefix)
    }

    pub fn dependencies_of(&self, prefix: &str) -> impl Iterator<Item = &str> {
        self.dependencies
            .get(prefix)
            .into_iter()
            .flat_map(|deps| deps.iter().map(String::as_str))
    }

    /// Detect cycles using DFS with three-color marking.
    ///
    /// Returns the cycle path (`a → b → a`) in the error.
    pub fn detect_cycles(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        fn dfs<'g>(
            node: &'g str,
            graph: &'g BTreeMap<String, BTreeSet<String>>,
            colors: &mut BTreeMap<&'g str, Color>,
            stack: &mut Vec<&'g str>,
        ) -> std::result::Result<(), String> {
            colors.insert(node, Color::Gray);
            stack.push(node);

            if let Some(neighbors) = graph.get(node) {
                for neighbor in neighbors {
                    match colors.get(neighbor.as_str()).copied() {
                        Some(Color::Gray) => {
                            let start = stack.iter().position(|n| *n == neighbor.as_str()).unwrap_or(0);
                            return Err(format!("{} → {}", stack[start..].join(" → "), neighbor));
                        }
                        Some(Color::White) | None => dfs(neighbor, graph, colors, stack)?,
                        Some(Color::Black) => {}
                    }
                }
            }

            stack.pop();
            colors.insert(node, Color::Black);
            Ok(())
        }

        let mut colors: BTreeMap<&str, Color> = self
            .dependencies
            .keys()
            .map(|k| (k.as_str(), Color::White))
            .collect();
        let mut stack = Vec::new();

        for prefix in self.dependencies.keys() {
            if colors.get(prefix.as_str()) == Some(&Color::White) {
                dfs(prefix, &self.dependencies, &mut colors, &mut stack)
                    .map_err(|cycle| ModexError::DependencyCycle { cycle })?;
            }
        }
        Ok(())
    }

    /// Kahn's algorithm, leaves first.
    ///
    /// An empty graph, a cycle, or an order that misses a vertex is fatal.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        if self.is_empty() {
            return Err(ModexError::EmptyDependencyGraph);
        }
        self.detect_cycles()?;

        let mut remaining: BTreeMap<&str, usize> = self
            .dependencies
            .iter()
            .map(|(prefix, deps)| (prefix.as_str(), deps.len()))
            .collect();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (prefix, deps) in &self.dependencies {
            for dep in deps {
                dependents.entry(dep.as_str()).or_default().push(prefix.as_str());
            }
        }

        let mut ready: BTreeSet<&str> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(prefix, _)| *prefix)
            .collect();
        let mut order = Vec::with_capacity(self.dependencies.len());

        while let Some(prefix) = ready.pop_first() {
            order.push(prefix.to_string());
            for dependent in dependents.get(prefix).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if order.len() != self.dependencies.len() {
            return Err(ModexError::IncompleteOrder {
                ordered: order.len(),
                total: self.dependencies.len(),
            });
        }
        Ok(order)
    }
}

/// Registered module prefixes used by `nodes`, in first-seen order.
fn used_modules<'a>(
    nodes: impl Iterator<Item = &'a Arc<ComponentNode>> + 'a,
    registry: &'a ModuleRegistry,
) -> impl Iterator<Item = String> + 'a {
    let mut seen = BTreeSet::new();
    nodes.filter_map(move |node| {
        let ns = &node.identifier.namespace;
        (registry.is_module(ns) && seen.insert(ns.clone())).then(|| ns.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AppDocument;
    use crate::registry::{ModuleDescriptor, ModuleDocument};

    fn module(yaml: &str) -> ModuleDescriptor {
        ModuleDocument::from_yaml(yaml).unwrap().into_descriptor().unwrap()
    }

    fn simple(prefix: &str, deps: &[&str]) -> ModuleDescriptor {
        module(&format!(
            "name: {prefix}\nprefix: {prefix}\ndependencies: [{}]\noperations:\n  - name: op\n",
            deps.join(", ")
        ))
    }

    fn app(elements: &[&str]) -> ArtifactTree {
        let components: String = elements
            .iter()
            .map(|e| format!("      - element: {e}\n"))
            .collect();
        let yaml = format!("components:\n  - element: flow\n    id: main\n    children:\n{components}");
        AppDocument::from_yaml(&yaml).unwrap().into_tree().unwrap()
    }

    #[test]
    fn test_dependency_precedes_dependent_regardless_of_supply_order() {
        for modules in [
            vec![simple("a", &[]), simple("b", &["a"])],
            vec![simple("b", &["a"]), simple("a", &[])],
        ] {
            let registry = ModuleRegistry::builder().modules(modules).build().unwrap();
            let graph = DependencyGraph::build(&app(&["b:op"]), &registry).unwrap();
            assert_eq!(graph.topological_order().unwrap(), vec!["a", "b"]);
        }
    }

    #[test]
    fn test_transitive_dependency_added_as_vertex() {
        let registry = ModuleRegistry::builder()
            .modules([simple("a", &[]), simple("b", &["a"]), simple("c", &["b"])])
            .build()
            .unwrap();
        let graph = DependencyGraph::build(&app(&["c:op"]), &registry).unwrap();

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.topological_order().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_diamond_has_single_shared_vertex() {
        let registry = ModuleRegistry::builder()
            .modules([
                simple("base", &[]),
                simple("left", &["base"]),
                simple("right", &["base"]),
                simple("top", &["left", "right"]),
            ])
            .build()
            .unwrap();
        let graph = DependencyGraph::build(&app(&["top:op"]), &registry).unwrap();
        let order = graph.topological_order().unwrap();

        assert_eq!(order, vec!["base", "left", "right", "top"]);
    }

    #[test]
    fn test_native_dependencies_are_omitted() {
        let registry = ModuleRegistry::builder()
            .module(simple("a", &["http"]))
            .native("http")
            .build()
            .unwrap();
        let graph = DependencyGraph::build(&app(&["a:op", "http:request"]), &registry).unwrap();

        assert!(!graph.contains("http"));
        assert_eq!(graph.dependencies_of("a").count(), 0);
    }

    #[test]
    fn test_dependency_by_namespace_uri() {
        let a = module("name: a\nprefix: a\nnamespace: http://x/a\n");
        let registry = ModuleRegistry::builder()
            .modules([a, simple("b", &["http://x/a"])])
            .build()
            .unwrap();
        let graph = DependencyGraph::build(&app(&["b:op"]), &registry).unwrap();
        assert_eq!(graph.dependencies_of("b").collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_unsatisfied_dependency_is_fatal() {
        let registry = ModuleRegistry::builder()
            .module(simple("a", &["ghost"]))
            .build()
            .unwrap();
        let err = DependencyGraph::build(&app(&["a:op"]), &registry).unwrap_err();
        match err {
            ModexError::UnsatisfiedDependency { module, dependency } => {
                assert_eq!(module, "a");
                assert_eq!(dependency, "ghost");
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn test_module_used_in_templates_is_a_vertex() {
        let outer = module(
            r#"
name: outer
prefix: outer
operations:
  - name: op
    body:
      - element: inner:op
"#,
        );
        let registry = ModuleRegistry::builder()
            .modules([outer, simple("inner", &[])])
            .build()
            .unwrap();
        let graph = DependencyGraph::build(&app(&["outer:op"]), &registry).unwrap();
        assert!(graph.contains("inner"));
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_cycle_is_fatal() {
        let registry = ModuleRegistry::builder()
            .modules([simple("a", &["b"]), simple("b", &["a"])])
            .build()
            .unwrap();
        let graph = DependencyGraph::build(&app(&["a:op"]), &registry).unwrap();

        let err = graph.topological_order().unwrap_err();
        assert!(err.to_string().contains("MX-021"));
        assert!(err.to_string().contains("a → b → a"));
    }

    #[test]
    fn test_empty_graph_is_fatal() {
        let registry = ModuleRegistry::builder().build().unwrap();
        let graph = DependencyGraph::build(&app(&["logger"]), &registry).unwrap();
        assert!(graph.is_empty());
        assert!(matches!(
            graph.topological_order(),
            Err(ModexError::EmptyDependencyGraph)
        ));
    }
}
