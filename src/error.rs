//! Modex Error Types with Error Codes
//!
//! Error code ranges:
//! - MX-000-009: Document and loading errors
//! - MX-010-019: Reference errors (config-ref, same-module calls, modules)
//! - MX-020-029: Dependency graph errors
//! - MX-030-039: Registry errors
//!
//! Every error is fatal for the artifact being expanded: the pass aborts
//! and no partially expanded tree is returned.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModexError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum ModexError {
    // ═══════════════════════════════════════════
    // DOCUMENT ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[MX-001] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("[MX-002] IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("[MX-003] Invalid document '{source_name}': {reason}")]
    InvalidDocument { source_name: String, reason: String },

    #[error("[MX-004] Invalid component identifier '{raw}' (expected 'namespace:name' or 'name')")]
    InvalidIdentifier { raw: String },

    #[error("[MX-005] Cannot scan modules with pattern '{pattern}': {details}")]
    ModuleScan { pattern: String, details: String },

    // ═══════════════════════════════════════════
    // REFERENCE ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[MX-010] There's no <{prefix}:config> named [{name}] in the current artifact nor in its parent")]
    UnresolvedConfigRef { prefix: String, name: String },

    #[error("[MX-011] Module '{module}' has no operation '{operation}'")]
    UnknownOperation { module: String, operation: String },

    #[error("[MX-012] No module registered for namespace '{namespace}'")]
    UnknownModule { namespace: String },

    #[error("[MX-013] Operation '{operation}' of module '{module}' expands into itself")]
    RecursiveOperation { module: String, operation: String },

    // ═══════════════════════════════════════════
    // DEPENDENCY ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[MX-020] Module '{module}' depends on '{dependency}', which is neither a registered module nor a native connector")]
    UnsatisfiedDependency { module: String, dependency: String },

    #[error("[MX-021] Dependency cycle detected between modules: {cycle}")]
    DependencyCycle { cycle: String },

    #[error("[MX-022] Cannot order an empty module dependency graph")]
    EmptyDependencyGraph,

    #[error("[MX-023] Dependency order covers {ordered} of {total} modules")]
    IncompleteOrder { ordered: usize, total: usize },

    // ═══════════════════════════════════════════
    // REGISTRY ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[MX-030] Module prefix '{prefix}' is registered twice")]
    DuplicateModule { prefix: String },

    #[error("[MX-031] Module prefix '{prefix}' clashes with a native connector namespace")]
    NativeClash { prefix: String },
}

impl ModexError {
    /// Stable error code, e.g. `MX-010`
    pub fn code(&self) -> &'static str {
        match self {
            Self::YamlParse(_) => "MX-001",
            Self::Io(_) => "MX-002",
            Self::InvalidDocument { .. } => "MX-003",
            Self::InvalidIdentifier { .. } => "MX-004",
            Self::ModuleScan { .. } => "MX-005",
            Self::UnresolvedConfigRef { .. } => "MX-010",
            Self::UnknownOperation { .. } => "MX-011",
            Self::UnknownModule { .. } => "MX-012",
            Self::RecursiveOperation { .. } => "MX-013",
            Self::UnsatisfiedDependency { .. } => "MX-020",
            Self::DependencyCycle { .. } => "MX-021",
            Self::EmptyDependencyGraph => "MX-022",
            Self::IncompleteOrder { .. } => "MX-023",
            Self::DuplicateModule { .. } => "MX-030",
            Self::NativeClash { .. } => "MX-031",
        }
    }
}

impl FixSuggestion for ModexError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            Self::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
            Self::Io(_) => Some("Check file path and permissions"),
            Self::InvalidDocument { .. } => {
                Some("Every component needs an 'element' key; modules need 'name' and 'prefix'")
            }
            Self::InvalidIdentifier { .. } => Some("Write identifiers as 'prefix:name', e.g. 'http:request'"),
            Self::ModuleScan { .. } => Some("Check the module directory path"),
            Self::UnresolvedConfigRef { .. } => {
                Some("Declare the referenced <prefix:config> globally, or fix the config-ref name")
            }
            Self::UnknownOperation { .. } => Some("Declare the operation in the module or fix the tns: reference"),
            Self::UnknownModule { .. } => Some("Load the module document with --modules"),
            Self::RecursiveOperation { .. } => {
                Some("Break the loop of operations calling each other through tns:")
            }
            Self::UnsatisfiedDependency { .. } => {
                Some("Load the missing module, or list it as a native connector with --native")
            }
            Self::DependencyCycle { .. } => Some("Remove one of the dependencies so modules form a DAG"),
            Self::EmptyDependencyGraph => None,
            Self::IncompleteOrder { .. } => Some("Check module dependencies for cycles"),
            Self::DuplicateModule { .. } => Some("Give each module a unique prefix"),
            Self::NativeClash { .. } => Some("Rename the module prefix or drop it from the native list"),
        }
    }
}
