//! Reference rebinding of copied template nodes
//!
//! A [`Rebound`] wraps one template node for one invocation and computes
//! each facet on first access:
//!
//! | Facet | Rule |
//! |-------|------|
//! | id | own global-element id → `id-suffix`; exact literal → literal |
//! | parameters | global-element id → `id-suffix`; variable marker → literal; error mappings remapped; nested nodes rebound and expanded |
//! | location | `<anchor>` + template segments after the first two |
//! | children | rebound and expanded children only |
//!
//! Raw template content never leaves this module: children and nested
//! parameter nodes are always rebound before they are exposed.

use std::sync::Arc;

use once_cell::unsync::OnceCell;

use super::literals::InvocationContext;
use crate::ast::{
    ArtifactTree, ComponentNode, DecoratedNode, ErrorMapping, Location, LocationPart, ParamValue,
    Parameter,
};
use crate::error::Result;

/// Template location segments owned by the template root
/// (`<owner>/<section>`), dropped from rebound locations.
pub const TEMPLATE_ROOT_SEGMENTS: usize = 2;

/// Second stage applied to every rebound node: same-module calls and
/// nodes of already expanded modules are expanded here.
pub trait NestedExpansion {
    fn expand_nested(
        &self,
        node: Arc<ComponentNode>,
        scope: &RebindScope<'_>,
    ) -> Result<Arc<ComponentNode>>;
}

/// What a rebinding is bound to
pub struct RebindScope<'a> {
    pub context: &'a InvocationContext,
    /// Head of every rebound location
    pub anchor: &'a LocationPart,
    /// Tree that config references resolve against
    pub lookup: &'a ArtifactTree,
    pub nested: &'a dyn NestedExpansion,
}

impl<'a> RebindScope<'a> {
    /// Rebind a whole template subtree and run its root through nested expansion.
    pub fn rebind_tree(&self, template: &Arc<ComponentNode>) -> Result<Arc<ComponentNode>> {
        let rebound = Rebound::new(template, self).materialize()?;
        self.nested.expand_nested(rebound, self)
    }
}

/// Lazily rebound view of one template node
pub struct Rebound<'s, 'a> {
    template: Arc<ComponentNode>,
    scope: &'s RebindScope<'a>,
    id: OnceCell<Option<String>>,
    parameters: OnceCell<Vec<Parameter>>,
    children: OnceCell<Vec<Arc<ComponentNode>>>,
    location: OnceCell<Location>,
}

impl<'s, 'a> Rebound<'s, 'a> {
    pub fn new(template: &Arc<ComponentNode>, scope: &'s RebindScope<'a>) -> Self {
        Self {
            template: Arc::clone(template),
            scope,
            id: OnceCell::new(),
            parameters: OnceCell::new(),
            children: OnceCell::new(),
            location: OnceCell::new(),
        }
    }

    pub fn template(&self) -> &Arc<ComponentNode> {
        &self.template
    }

    pub fn id(&self) -> Option<&str> {
        self.id.get_or_init(|| self.rebind_id()).as_deref()
    }

    pub fn location(&self) -> &Location {
        self.location.get_or_init(|| self.rebind_location())
    }

    pub fn parameters(&self) -> Result<&[Parameter]> {
        self.parameters
            .get_or_try_init(|| self.rebind_parameters())
            .map(Vec::as_slice)
    }

    pub fn children(&self) -> Result<&[Arc<ComponentNode>]> {
        self.children
            .get_or_try_init(|| self.rebind_children())
            .map(Vec::as_slice)
    }

    /// Force every facet and build the rebound node.
    pub fn materialize(mut self) -> Result<Arc<ComponentNode>> {
        let id = match self.id.take() {
            Some(id) => id,
            None => self.rebind_id(),
        };
        let location = match self.location.take() {
            Some(location) => location,
            None => self.rebind_location(),
        };
        let parameters = match self.parameters.take() {
            Some(parameters) => parameters,
            None => self.rebind_parameters()?,
        };
        let children = match self.children.take() {
            Some(children) => children,
            None => self.rebind_children()?,
        };

        Ok(DecoratedNode::new(self.template)
            .with_id(id)
            .with_location(location)
            .with_parameters(parameters)
            .with_children(children)
            .into_node())
    }

    fn rebind_id(&self) -> Option<String> {
        let id = self.template.id.as_deref()?;
        let ctx = self.scope.context;
        Some(
            ctx.suffixed(id)
                .or_else(|| ctx.literals.lookup(id).map(String::from))
                .unwrap_or_else(|| id.to_string()),
        )
    }

    fn rebind_location(&self) -> Location {
        self.template
            .location
            .rebased(self.scope.anchor.clone(), TEMPLATE_ROOT_SEGMENTS)
    }

    fn rebind_parameters(&self) -> Result<Vec<Parameter>> {
        let ctx = self.scope.context;
        self.template
            .parameters
            .iter()
            .map(|param| {
                let value = match &param.value {
                    ParamValue::Literal(raw) => ParamValue::Literal(
                        ctx.suffixed(raw)
                            .or_else(|| ctx.literals.lookup(raw).map(String::from))
                            .unwrap_or_else(|| raw.clone()),
                    ),
                    ParamValue::ErrorMappings(mappings) => ParamValue::ErrorMappings(
                        mappings
                            .iter()
                            .map(|m| ErrorMapping {
                                source: remap(ctx, &m.source),
                                target: remap(ctx, &m.target),
                            })
                            .collect(),
                    ),
                    ParamValue::Node(nested) => ParamValue::Node(self.scope.rebind_tree(nested)?),
                    ParamValue::Absent => ParamValue::Absent,
                };
                Ok(Parameter::new(param.name.clone(), value))
            })
            .collect()
    }

    fn rebind_children(&self) -> Result<Vec<Arc<ComponentNode>>> {
        self.template
            .children
            .iter()
            .map(|child| self.scope.rebind_tree(child))
            .collect()
    }
}

fn remap(ctx: &InvocationContext, token: &str) -> String {
    ctx.literals
        .lookup(token)
        .map(String::from)
        .unwrap_or_else(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ComponentIdentifier;
    use crate::expand::literals::LiteralBindings;
    use std::cell::Cell;

    /// Counts nested-expansion calls and leaves nodes unchanged
    #[derive(Default)]
    struct Passthrough {
        calls: Cell<usize>,
    }

    impl NestedExpansion for Passthrough {
        fn expand_nested(
            &self,
            node: Arc<ComponentNode>,
            _scope: &RebindScope<'_>,
        ) -> Result<Arc<ComponentNode>> {
            self.calls.set(self.calls.get() + 1);
            Ok(node)
        }
    }

    fn node(raw: &str) -> ComponentNode {
        ComponentNode::new(ComponentIdentifier::parse(raw).unwrap())
    }

    fn template_location(parts: &[&str]) -> Location {
        Location::new(parts.iter().map(|p| LocationPart::new(*p)).collect())
    }

    fn context() -> InvocationContext {
        InvocationContext {
            config_ref: Some("cfg1".into()),
            suffix: "cfg1".into(),
            literals: Arc::new(LiteralBindings::resolve(
                [("host", "a.b.com"), ("code", "MATH:BAD")],
                [("path", "/sum")],
            )),
            global_ids: Arc::new(["http-cfg".to_string()].into_iter().collect()),
        }
    }

    fn template() -> Arc<ComponentNode> {
        Arc::new(
            node("http:request")
                .with_id("req")
                .with_location(template_location(&["add", "body", "0"]))
                .with_literal("config-ref", "http-cfg")
                .with_literal("host", "#[vars.host]")
                .with_literal("path", "#[ vars.path ]")
                .with_literal("body", "#[payload]")
                .with_param(
                    "mappings",
                    ParamValue::ErrorMappings(vec![ErrorMapping {
                        source: "#[vars.code]".into(),
                        target: "APP:FAIL".into(),
                    }]),
                )
                .with_child(
                    node("logger")
                        .with_location(template_location(&["add", "body", "0", "0"]))
                        .with_literal("message", "#[vars.host]"),
                ),
        )
    }

    #[test]
    fn test_rebinds_every_facet() {
        let ctx = context();
        let anchor = LocationPart::new("main/0-add");
        let lookup = ArtifactTree::default();
        let nested = Passthrough::default();
        let scope = RebindScope {
            context: &ctx,
            anchor: &anchor,
            lookup: &lookup,
            nested: &nested,
        };

        let node = Rebound::new(&template(), &scope).materialize().unwrap();

        assert_eq!(node.id.as_deref(), Some("req"));
        assert_eq!(node.literal_param("config-ref"), Some("http-cfg-cfg1"));
        assert_eq!(node.literal_param("host"), Some("a.b.com"));
        assert_eq!(node.literal_param("path"), Some("/sum"));
        assert_eq!(node.literal_param("body"), Some("#[payload]"));
        match node.param("mappings") {
            Some(ParamValue::ErrorMappings(m)) => {
                assert_eq!(m[0].source, "MATH:BAD");
                assert_eq!(m[0].target, "APP:FAIL");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(node.location.to_string(), "main/0-add/0");
        assert_eq!(node.children[0].location.to_string(), "main/0-add/0/0");
        assert_eq!(node.children[0].literal_param("message"), Some("a.b.com"));
        // the child went through nested expansion
        assert_eq!(nested.calls.get(), 1);
    }

    #[test]
    fn test_facets_are_lazy() {
        let ctx = context();
        let anchor = LocationPart::new("x");
        let lookup = ArtifactTree::default();
        let nested = Passthrough::default();
        let scope = RebindScope {
            context: &ctx,
            anchor: &anchor,
            lookup: &lookup,
            nested: &nested,
        };

        let rebound = Rebound::new(&template(), &scope);
        assert_eq!(rebound.id(), Some("req"));
        assert_eq!(rebound.location().to_string(), "x/0");
        assert_eq!(nested.calls.get(), 0);

        assert_eq!(rebound.children().unwrap().len(), 1);
        assert_eq!(rebound.children().unwrap().len(), 1);
        assert_eq!(nested.calls.get(), 1);
    }

    #[test]
    fn test_global_element_id_is_suffixed() {
        let ctx = context();
        let anchor = LocationPart::new("http-cfg-cfg1");
        let lookup = ArtifactTree::default();
        let nested = Passthrough::default();
        let scope = RebindScope {
            context: &ctx,
            anchor: &anchor,
            lookup: &lookup,
            nested: &nested,
        };

        let global = Arc::new(
            node("http:request-config")
                .with_id("http-cfg")
                .with_literal("host", "#[vars.host]"),
        );
        let rebound = Rebound::new(&global, &scope);
        assert_eq!(rebound.id(), Some("http-cfg-cfg1"));
        assert_eq!(
            rebound.parameters().unwrap()[0].value,
            ParamValue::Literal("a.b.com".into())
        );
        // the template itself is untouched
        assert_eq!(rebound.template().id.as_deref(), Some("http-cfg"));
    }
}
