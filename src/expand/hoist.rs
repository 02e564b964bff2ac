//! Flow hoisting
//!
//! Expansion may nest a flow or sub-flow inside another component (a
//! module body that declares one, for example). Flows only exist at
//! root level, so every nested one is detached and appended to the
//! roots, in pre-order, with its own content unchanged apart from its
//! own nested flows.

use std::sync::Arc;

use crate::ast::{ArtifactTree, ComponentNode, DecoratedNode, ParamValue, Parameter};

/// Move every non-root flow/sub-flow to root level. Idempotent.
pub fn hoist_flows(tree: &ArtifactTree) -> ArtifactTree {
    let mut hoisted = Vec::new();
    let mut roots: Vec<Arc<ComponentNode>> = tree
        .roots
        .iter()
        .map(|root| detach_flows(root, &mut hoisted))
        .collect();
    roots.extend(hoisted);

    ArtifactTree {
        roots,
        parent: tree.parent.clone(),
    }
}

/// `node` without nested flows; detached flows are pushed to `hoisted`.
fn detach_flows(node: &Arc<ComponentNode>, hoisted: &mut Vec<Arc<ComponentNode>>) -> Arc<ComponentNode> {
    let mut changed = false;

    let mut parameters = Vec::with_capacity(node.parameters.len());
    for param in &node.parameters {
        let value = match &param.value {
            ParamValue::Node(inner) if inner.is_flow() => {
                hoist(inner, hoisted);
                changed = true;
                ParamValue::Absent
            }
            ParamValue::Node(inner) => {
                let kept = detach_flows(inner, hoisted);
                changed |= !Arc::ptr_eq(inner, &kept);
                ParamValue::Node(kept)
            }
            other => other.clone(),
        };
        parameters.push(Parameter::new(param.name.clone(), value));
    }

    let mut children = Vec::with_capacity(node.children.len());
    for child in &node.children {
        if child.is_flow() {
            hoist(child, hoisted);
            changed = true;
        } else {
            let kept = detach_flows(child, hoisted);
            changed |= !Arc::ptr_eq(child, &kept);
            children.push(kept);
        }
    }

    if !changed {
        return Arc::clone(node);
    }
    DecoratedNode::new(Arc::clone(node))
        .with_parameters(parameters)
        .with_children(children)
        .into_node()
}

fn hoist(flow: &Arc<ComponentNode>, hoisted: &mut Vec<Arc<ComponentNode>>) {
    // reserve the slot first so outer flows precede their nested ones
    let slot = hoisted.len();
    hoisted.push(Arc::clone(flow));
    let detached = detach_flows(flow, hoisted);
    hoisted[slot] = detached;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ComponentIdentifier;

    fn node(raw: &str) -> ComponentNode {
        ComponentNode::new(ComponentIdentifier::parse(raw).unwrap())
    }

    fn nested() -> ArtifactTree {
        ArtifactTree::new(vec![Arc::new(
            node("flow").with_id("main").with_child(
                node("core:module-operation-chain")
                    .with_child(node("logger").with_id("log"))
                    .with_child(
                        node("sub-flow")
                            .with_id("helper")
                            .with_child(node("flow").with_id("deep")),
                    ),
            ),
        )])
    }

    fn root_ids(tree: &ArtifactTree) -> Vec<&str> {
        tree.roots.iter().filter_map(|r| r.id.as_deref()).collect()
    }

    #[test]
    fn test_nested_flows_move_to_root() {
        let out = hoist_flows(&nested());

        assert_eq!(root_ids(&out), vec!["main", "helper", "deep"]);
        let chain = &out.roots[0].children[0];
        assert_eq!(chain.children.len(), 1);
        assert_eq!(chain.children[0].id.as_deref(), Some("log"));
        assert!(out.roots[1].children.is_empty());
        assert!(out.roots.iter().skip(1).all(|r| r.is_flow()));
    }

    #[test]
    fn test_hoist_is_idempotent() {
        let once = hoist_flows(&nested());
        let twice = hoist_flows(&once);
        assert_eq!(once, twice);
        for (a, b) in once.roots.iter().zip(&twice.roots) {
            assert!(Arc::ptr_eq(a, b));
        }
    }

    #[test]
    fn test_flows_inside_params_are_hoisted() {
        let carrier = node("core:holder").with_child(node("flow").with_id("inner"));
        let tree = ArtifactTree::new(vec![Arc::new(
            node("flow")
                .with_id("main")
                .with_child(node("http:request").with_param("body", ParamValue::Node(Arc::new(carrier)))),
        )]);

        let out = hoist_flows(&tree);
        assert_eq!(root_ids(&out), vec!["main", "inner"]);
    }

    #[test]
    fn test_flow_as_param_value_is_hoisted() {
        let tree = ArtifactTree::new(vec![Arc::new(node("flow").with_id("main").with_child(
            node("http:request").with_param(
                "body",
                ParamValue::Node(Arc::new(node("flow").with_id("inner").with_child(node("logger")))),
            ),
        ))]);

        let out = hoist_flows(&tree);
        assert_eq!(root_ids(&out), vec!["main", "inner"]);
        assert_eq!(out.roots[1].children.len(), 1);
        assert_eq!(out.roots[0].children[0].param("body"), Some(&ParamValue::Absent));
        assert_eq!(hoist_flows(&out), out);
    }

    #[test]
    fn test_flat_tree_is_shared() {
        let tree = ArtifactTree::new(vec![Arc::new(node("flow").with_child(node("logger")))]);
        let out = hoist_flows(&tree);
        assert!(Arc::ptr_eq(&tree.roots[0], &out.roots[0]));
    }
}
