//! Parameter/literal resolution and the per-invocation context
//!
//! Module bodies read properties and parameters through variable
//! markers (`#[vars.host]`). When the value supplied at the call site
//! is a literal, the marker is folded to that literal while copying the
//! body, instead of being evaluated at runtime.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

/// Scope of the variable markers bodies use
pub const VARS_SCOPE: &str = "vars";

/// `#[ vars.<name> ]`, whitespace-tolerant
static VARIABLE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#\[\s*vars\.([A-Za-z0-9_\-]+)\s*\]$").expect("variable marker regex is valid")
});

/// An expression is anything wrapped in `#[` ... `]`.
#[inline]
pub fn is_expression(value: &str) -> bool {
    value.starts_with("#[") && value.ends_with(']')
}

/// Marker under which `name` is readable from a body: `#[vars.<name>]`.
pub fn variable_key(name: &str) -> String {
    format!("#[{VARS_SCOPE}.{name}]")
}

/// Statically known property/parameter values of one invocation,
/// keyed by their variable marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiteralBindings {
    entries: BTreeMap<String, String>,
}

impl LiteralBindings {
    /// Properties first, then parameters; a parameter overrides a
    /// property of the same name. Expression values are dropped.
    pub fn resolve<'a, P, Q>(properties: P, parameters: Q) -> Self
    where
        P: IntoIterator<Item = (&'a str, &'a str)>,
        Q: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut merged: BTreeMap<&str, &str> = properties.into_iter().collect();
        merged.extend(parameters);

        let entries = merged
            .into_iter()
            .filter(|(_, value)| !is_expression(value))
            .map(|(name, value)| (variable_key(name), value.to_string()))
            .collect();

        Self { entries }
    }

    /// Literal for a raw value: an exact key, or a variable marker
    /// written with extra whitespace.
    pub fn lookup(&self, raw: &str) -> Option<&str> {
        if let Some(value) = self.entries.get(raw) {
            return Some(value.as_str());
        }
        let caps = VARIABLE_MARKER.captures(raw)?;
        self.entries.get(&variable_key(&caps[1])).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Everything a copied template needs to know about one expansion.
///
/// Built fresh per call site or global element and dropped afterwards.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    /// Effective config-ref; propagated unchanged to same-module calls
    pub config_ref: Option<String>,
    /// Appended to the module's own global-element ids
    pub suffix: String,
    pub literals: Arc<LiteralBindings>,
    pub global_ids: Arc<BTreeSet<String>>,
}

impl InvocationContext {
    /// `id-suffix` for ids of the module's global elements.
    pub fn suffixed(&self, id: &str) -> Option<String> {
        self.global_ids
            .contains(id)
            .then(|| format!("{}-{}", id, self.suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_expression() {
        assert!(is_expression("#[vars.host]"));
        assert!(is_expression("#[payload ++ 1]"));
        assert!(!is_expression("a.b.com"));
        assert!(!is_expression("#[unterminated"));
        assert!(!is_expression("prefix #[vars.x]"));
    }

    #[test]
    fn test_parameters_override_properties() {
        let literals = LiteralBindings::resolve(
            [("host", "a.b.com"), ("port", "80")],
            [("port", "8080"), ("path", "/x")],
        );
        assert_eq!(literals.lookup("#[vars.host]"), Some("a.b.com"));
        assert_eq!(literals.lookup("#[vars.port]"), Some("8080"));
        assert_eq!(literals.lookup("#[vars.path]"), Some("/x"));
        assert_eq!(literals.len(), 3);
    }

    #[test]
    fn test_expressions_are_not_literals() {
        let literals = LiteralBindings::resolve([("host", "#[attributes.host]")], [("n", "#[payload]")]);
        assert!(literals.is_empty());
    }

    #[test]
    fn test_expression_parameter_hides_literal_property() {
        // Properties and parameters are merged before expressions are
        // dropped, so the runtime parameter shadows the property literal
        // instead of falling back to it.
        let literals = LiteralBindings::resolve([("host", "a.b.com")], [("host", "#[vars.other]")]);
        assert_eq!(literals.lookup("#[vars.host]"), None);
    }

    #[test]
    fn test_lookup_tolerates_marker_whitespace() {
        let literals = LiteralBindings::resolve([("host", "a.b.com")], Vec::<(&str, &str)>::new());
        assert_eq!(literals.lookup("#[ vars.host ]"), Some("a.b.com"));
        assert_eq!(literals.lookup("#[vars.missing]"), None);
        assert_eq!(literals.lookup("host"), None);
    }

    #[test]
    fn test_suffixed_only_for_global_ids() {
        let ctx = InvocationContext {
            config_ref: Some("cfg1".into()),
            suffix: "cfg1".into(),
            literals: Arc::new(LiteralBindings::default()),
            global_ids: Arc::new(["http-cfg".to_string()].into_iter().collect()),
        };
        assert_eq!(ctx.suffixed("http-cfg").as_deref(), Some("http-cfg-cfg1"));
        assert_eq!(ctx.suffixed("other"), None);
    }

    #[test]
    fn test_empty_suffix_keeps_separator() {
        let ctx = InvocationContext {
            config_ref: None,
            suffix: String::new(),
            literals: Arc::new(LiteralBindings::default()),
            global_ids: Arc::new(["http-cfg".to_string()].into_iter().collect()),
        };
        assert_eq!(ctx.suffixed("http-cfg").as_deref(), Some("http-cfg-"));
    }
}
