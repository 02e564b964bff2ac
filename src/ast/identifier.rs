//! Component identifiers (`namespace:name`)

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::ModexError;

/// Namespace of identifiers written without a prefix
pub const CORE_NAMESPACE: &str = "core";

/// Reserved prefix for calls between operations of the same module
pub const SAME_MODULE_PREFIX: &str = "tns";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentIdentifier {
    pub namespace: String,
    pub name: String,
}

impl ComponentIdentifier {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse `ns:name`, or a bare `name` in the core namespace.
    pub fn parse(raw: &str) -> Result<Self, ModexError> {
        let invalid = || ModexError::InvalidIdentifier { raw: raw.to_string() };
        let valid = |s: &str| !s.is_empty() && !s.chars().any(|c| c.is_whitespace() || c == ':');

        match raw.split_once(':') {
            Some((ns, name)) if valid(ns) && valid(name) => Ok(Self::new(ns, name)),
            Some(_) => Err(invalid()),
            None if valid(raw) => Ok(Self::new(CORE_NAMESPACE, raw)),
            None => Err(invalid()),
        }
    }

    #[inline]
    pub fn is_same_module_call(&self) -> bool {
        self.namespace == SAME_MODULE_PREFIX
    }
}

impl fmt::Display for ComponentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

impl FromStr for ComponentIdentifier {
    type Err = ModexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ComponentIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
