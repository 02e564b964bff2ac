//! Expand Module - Module macro expansion
//!
//! - `sorter`: DependencyGraph (module order, leaves first)
//! - `literals`: LiteralBindings, InvocationContext
//! - `rebind`: Rebound (lazy per-template rebinding), NestedExpansion
//! - `plan`: ModulePlan (per-module constants, cached)
//! - `implicit`: implicit default configuration
//! - `module`: ModuleExpander (one module's two-phase pass)
//! - `hoist`: flow hoisting
//! - `orchestrator`: MacroExpander (the whole pass)

mod hoist;
mod implicit;
mod literals;
mod module;
mod orchestrator;
mod plan;
mod rebind;
mod sorter;

pub use hoist::hoist_flows;
pub use implicit::{assess as assess_implicit_config, synthesize as implicit_config, ImplicitConfig};
pub use literals::{is_expression, variable_key, InvocationContext, LiteralBindings, VARS_SCOPE};
pub use module::{ModuleExpander, ModuleState};
pub use orchestrator::MacroExpander;
pub use plan::{ModulePlan, DEFAULT_GLOBAL_ELEMENTS, OPERATION_CHAIN};
pub use rebind::{NestedExpansion, RebindScope, Rebound, TEMPLATE_ROOT_SEGMENTS};
pub use sorter::DependencyGraph;
