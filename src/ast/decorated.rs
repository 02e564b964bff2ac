//! Decorated view: an original node plus a small override set.
//!
//! Read accessors check the overrides first, then fall back to the
//! original. `into_node` materializes a plain node that still shares
//! every untouched child `Arc` with the original.

use std::sync::Arc;

use super::identifier::ComponentIdentifier;
use super::location::Location;
use super::node::{ComponentKind, ComponentNode, Parameter};

#[derive(Debug, Clone, Default, PartialEq)]
struct Overrides {
    identifier: Option<ComponentIdentifier>,
    id: Option<Option<String>>,
    parameters: Option<Vec<Parameter>>,
    children: Option<Vec<Arc<ComponentNode>>>,
    location: Option<Location>,
    kind: Option<ComponentKind>,
    origin: Option<ComponentIdentifier>,
}

impl Overrides {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct DecoratedNode {
    original: Arc<ComponentNode>,
    overrides: Overrides,
}

impl DecoratedNode {
    pub fn new(original: Arc<ComponentNode>) -> Self {
        Self {
            original,
            overrides: Overrides::default(),
        }
    }

    pub fn with_identifier(mut self, identifier: ComponentIdentifier) -> Self {
        self.overrides.identifier = Some(identifier);
        self
    }

    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.overrides.id = Some(id);
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.overrides.parameters = Some(parameters);
        self
    }

    pub fn with_children(mut self, children: Vec<Arc<ComponentNode>>) -> Self {
        self.overrides.children = Some(children);
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.overrides.location = Some(location);
        self
    }

    pub fn with_kind(mut self, kind: ComponentKind) -> Self {
        self.overrides.kind = Some(kind);
        self
    }

    pub fn with_origin(mut self, origin: ComponentIdentifier) -> Self {
        self.overrides.origin = Some(origin);
        self
    }

    pub fn original(&self) -> &Arc<ComponentNode> {
        &self.original
    }

    pub fn identifier(&self) -> &ComponentIdentifier {
        self.overrides
            .identifier
            .as_ref()
            .unwrap_or(&self.original.identifier)
    }

    pub fn id(&self) -> Option<&str> {
        match &self.overrides.id {
            Some(id) => id.as_deref(),
            None => self.original.id.as_deref(),
        }
    }

    pub fn parameters(&self) -> &[Parameter] {
        self.overrides
            .parameters
            .as_deref()
            .unwrap_or(&self.original.parameters)
    }

    pub fn children(&self) -> &[Arc<ComponentNode>] {
        self.overrides
            .children
            .as_deref()
            .unwrap_or(&self.original.children)
    }

    pub fn location(&self) -> &Location {
        self.overrides
            .location
            .as_ref()
            .unwrap_or(&self.original.location)
    }

    pub fn kind(&self) -> ComponentKind {
        self.overrides.kind.unwrap_or(self.original.kind)
    }

    /// Materialize the view. Without overrides the original `Arc` is returned as is.
    pub fn into_node(self) -> Arc<ComponentNode> {
        if self.overrides.is_empty() {
            return self.original;
        }

        let Overrides {
            identifier,
            id,
            parameters,
            children,
            location,
            kind,
            origin,
        } = self.overrides;
        let original = self.original;

        Arc::new(ComponentNode {
            identifier: identifier.unwrap_or_else(|| original.identifier.clone()),
            id: id.unwrap_or_else(|| original.id.clone()),
            location: location.unwrap_or_else(|| original.location.clone()),
            parameters: parameters.unwrap_or_else(|| original.parameters.clone()),
            children: children.unwrap_or_else(|| original.children.clone()),
            kind: kind.unwrap_or(original.kind),
            model: original.model.clone(),
            origin: origin.or_else(|| original.origin.clone()),
        })
    }
}
