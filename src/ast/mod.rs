//! AST Module - Component tree model
//!
//! Contains the immutable tree the expander rewrites:
//! - `identifier`: ComponentIdentifier (`namespace:name`)
//! - `location`: Location, LocationPart (diagnostic positions)
//! - `node`: ComponentNode, Parameter, ParamValue, ComponentKind, BoundModel
//! - `decorated`: DecoratedNode (original node + override set)
//! - `artifact`: ArtifactTree and the copy-with-substitution primitive
//! - `document`: YAML application documents → ArtifactTree
//!
//! Nodes are shared through `Arc` and never mutated in place. Every
//! transformation returns a new tree that reuses untouched subtrees.

mod artifact;
mod decorated;
mod document;
mod identifier;
mod location;
mod node;

// Re-export all public types
pub use artifact::{copy_node_recursively, ArtifactTree, Descendants};
pub use decorated::DecoratedNode;
pub use document::{AppDocument, RawComponent};
pub use identifier::{ComponentIdentifier, CORE_NAMESPACE, SAME_MODULE_PREFIX};
pub use location::{Location, LocationPart};
pub use node::{BoundModel, ComponentKind, ComponentNode, ErrorMapping, ParamValue, Parameter};
