//! Artifact tree and the copy-with-substitution primitive

use std::sync::Arc;

use serde::Serialize;

use super::decorated::DecoratedNode;
use super::node::{ComponentNode, ParamValue, Parameter};

/// Root-level components of one deployable artifact.
///
/// `parent` is the enclosing artifact (e.g. a shared domain) consulted
/// when a reference cannot be resolved locally.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArtifactTree {
    pub roots: Vec<Arc<ComponentNode>>,
    #[serde(skip)]
    pub parent: Option<Arc<ArtifactTree>>,
}

impl ArtifactTree {
    pub fn new(roots: Vec<Arc<ComponentNode>>) -> Self {
        Self { roots, parent: None }
    }

    pub fn with_parent(mut self, parent: Arc<ArtifactTree>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Every node of the tree in pre-order, descending into children
    /// and node-valued parameters.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants::new(self.roots.iter().rev().collect())
    }

    pub fn find(&self, predicate: impl Fn(&ComponentNode) -> bool) -> Option<&Arc<ComponentNode>> {
        self.descendants().find(|node| predicate(node))
    }

    /// Like [`find`](Self::find), falling back to the parent chain.
    pub fn find_in_scope(
        &self,
        predicate: impl Fn(&ComponentNode) -> bool,
    ) -> Option<Arc<ComponentNode>> {
        let mut scope = Some(self);
        while let Some(tree) = scope {
            if let Some(found) = tree.find(&predicate) {
                return Some(Arc::clone(found));
            }
            scope = tree.parent.as_deref();
        }
        None
    }

    /// Copy the tree top-down.
    ///
    /// - `prune`: subtrees for which it holds are kept as is and never visited
    /// - `replace`: a `Some` result takes the node's place; the replacement
    ///   itself is not visited again
    /// - `extra_roots`: nodes appended at root level after the walk
    ///
    /// Subtrees with no replacement inside are shared, not copied.
    pub fn copy_recursively<F, S, P, E>(
        &self,
        mut replace: F,
        extra_roots: S,
        prune: P,
    ) -> Result<ArtifactTree, E>
    where
        F: FnMut(&Arc<ComponentNode>) -> Result<Option<Arc<ComponentNode>>, E>,
        S: FnOnce() -> Result<Vec<Arc<ComponentNode>>, E>,
        P: Fn(&ComponentNode) -> bool,
    {
        let mut roots = Vec::with_capacity(self.roots.len());
        for root in &self.roots {
            roots.push(copy_node_recursively(root, &mut replace, &prune)?);
        }
        roots.extend(extra_roots()?);

        Ok(ArtifactTree {
            roots,
            parent: self.parent.clone(),
        })
    }
}

/// Single-node form of [`ArtifactTree::copy_recursively`].
pub fn copy_node_recursively<F, P, E>(
    node: &Arc<ComponentNode>,
    replace: &mut F,
    prune: &P,
) -> Result<Arc<ComponentNode>, E>
where
    F: FnMut(&Arc<ComponentNode>) -> Result<Option<Arc<ComponentNode>>, E>,
    P: Fn(&ComponentNode) -> bool,
{
    if prune(node) {
        return Ok(Arc::clone(node));
    }
    if let Some(replacement) = replace(node)? {
        return Ok(replacement);
    }

    let mut changed = false;

    let mut parameters = Vec::with_capacity(node.parameters.len());
    for param in &node.parameters {
        let value = match &param.value {
            ParamValue::Node(inner) => {
                let copied = copy_node_recursively(inner, replace, prune)?;
                changed |= !Arc::ptr_eq(inner, &copied);
                ParamValue::Node(copied)
            }
            other => other.clone(),
        };
        parameters.push(Parameter::new(param.name.clone(), value));
    }

    let mut children = Vec::with_capacity(node.children.len());
    for child in &node.children {
        let copied = copy_node_recursively(child, replace, prune)?;
        changed |= !Arc::ptr_eq(child, &copied);
        children.push(copied);
    }

    if !changed {
        return Ok(Arc::clone(node));
    }
    Ok(DecoratedNode::new(Arc::clone(node))
        .with_parameters(parameters)
        .with_children(children)
        .into_node())
}

/// Pre-order iterator over nodes, their node-valued parameters, then children.
pub struct Descendants<'a> {
    stack: Vec<&'a Arc<ComponentNode>>,
}

impl<'a> Descendants<'a> {
    fn new(stack: Vec<&'a Arc<ComponentNode>>) -> Self {
        Self { stack }
    }

    /// Descendants of a single node, the node included.
    pub fn of(node: &'a Arc<ComponentNode>) -> Self {
        Self::new(vec![node])
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Arc<ComponentNode>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        let params: Vec<_> = node.param_nodes().collect();
        self.stack.extend(params.into_iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ComponentIdentifier;
    use std::convert::Infallible;

    fn node(raw: &str) -> ComponentNode {
        ComponentNode::new(ComponentIdentifier::parse(raw).unwrap())
    }

    fn sample() -> ArtifactTree {
        let payload = node("math:payload").with_child(node("math:add").with_id("inner"));
        ArtifactTree::new(vec![
            Arc::new(node("math:config").with_id("cfg1")),
            Arc::new(
                node("flow")
                    .with_id("main")
                    .with_child(node("logger").with_id("log"))
                    .with_child(
                        node("http:request")
                            .with_id("req")
                            .with_param("body", ParamValue::Node(Arc::new(payload))),
                    ),
            ),
        ])
    }

    fn ids(tree: &ArtifactTree) -> Vec<String> {
        tree.descendants()
            .map(|n| n.id.clone().unwrap_or_else(|| n.identifier.to_string()))
            .collect()
    }

    #[test]
    fn test_descendants_preorder_includes_params() {
        assert_eq!(
            ids(&sample()),
            vec!["cfg1", "main", "log", "req", "math:payload", "inner"]
        );
    }

    #[test]
    fn test_copy_without_replacement_shares_everything() {
        let tree = sample();
        let copy = tree
            .copy_recursively(|_| Ok::<_, Infallible>(None), || Ok(Vec::new()), |_| false)
            .unwrap();
        for (a, b) in tree.roots.iter().zip(&copy.roots) {
            assert!(Arc::ptr_eq(a, b));
        }
    }

    #[test]
    fn test_copy_replaces_inside_params_and_shares_siblings() {
        let tree = sample();
        let copy = tree
            .copy_recursively(
                |n| {
                    Ok::<_, Infallible>(
                        (n.id.as_deref() == Some("inner")).then(|| Arc::new(node("core:replaced"))),
                    )
                },
                || Ok(vec![Arc::new(node("extra"))]),
                |_| false,
            )
            .unwrap();

        assert!(Arc::ptr_eq(&tree.roots[0], &copy.roots[0]));
        assert!(!Arc::ptr_eq(&tree.roots[1], &copy.roots[1]));
        assert!(Arc::ptr_eq(&tree.roots[1].children[0], &copy.roots[1].children[0]));
        assert_eq!(copy.roots.len(), 3);
        assert!(copy.find(|n| n.identifier.name == "replaced").is_some());
        assert!(copy.find(|n| n.id.as_deref() == Some("inner")).is_none());
    }

    #[test]
    fn test_replacement_is_not_revisited() {
        let tree = ArtifactTree::new(vec![Arc::new(node("math:add"))]);
        let mut visits = 0;
        let copy = tree
            .copy_recursively(
                |n| {
                    visits += 1;
                    Ok::<_, Infallible>(
                        n.in_namespace("math")
                            .then(|| Arc::new(node("chain").with_child(node("math:add")))),
                    )
                },
                || Ok(Vec::new()),
                |_| false,
            )
            .unwrap();

        assert_eq!(visits, 1);
        assert_eq!(copy.roots[0].children[0].identifier.to_string(), "math:add");
    }

    #[test]
    fn test_prune_skips_subtree() {
        let tree = sample();
        let mut seen = Vec::new();
        tree.copy_recursively(
            |n| {
                seen.push(n.identifier.to_string());
                Ok::<_, Infallible>(None)
            },
            || Ok(Vec::new()),
            |n| n.is_flow(),
        )
        .unwrap();
        assert_eq!(seen, vec!["math:config"]);
    }

    #[test]
    fn test_find_in_scope_uses_parent() {
        let domain = Arc::new(ArtifactTree::new(vec![Arc::new(
            node("math:config").with_id("shared"),
        )]));
        let app = sample().with_parent(domain);

        assert!(app.find(|n| n.id.as_deref() == Some("shared")).is_none());
        assert!(app.find_in_scope(|n| n.id.as_deref() == Some("shared")).is_some());
        assert!(app.find_in_scope(|n| n.id.as_deref() == Some("missing")).is_none());
    }
}
