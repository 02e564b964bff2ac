//! Modex - dependency-ordered macro expansion of module invocations
//!
//! ```text
//! app.yaml ──► AppDocument ──► ArtifactTree ─┐
//!                                            ├──► MacroExpander ──► ArtifactTree (expanded)
//! *.module.yaml ──► ModuleLoader ──► ModuleRegistry ─┘
//! ```
//!
//! The expander orders the used modules with [`expand::DependencyGraph`],
//! rewrites each module's config elements and operation calls, then
//! hoists nested flows to root level.

pub mod ast;
pub mod config;
pub mod error;
pub mod expand;
pub mod registry;

pub use ast::{ArtifactTree, AppDocument, ComponentIdentifier, ComponentNode, Location};
pub use config::{ExpansionConfig, FeatureFlags};
pub use error::{FixSuggestion, ModexError, Result};
pub use expand::{DependencyGraph, MacroExpander};
pub use registry::{ModuleDescriptor, ModuleDocument, ModuleLoader, ModuleRegistry};
