//! Diagnostic locations: ordered path segments plus file/line

use std::fmt;

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationPart {
    pub path: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl LocationPart {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file: None,
            line: None,
        }
    }

    pub fn at(mut self, file: Option<String>, line: Option<u32>) -> Self {
        self.file = file;
        self.line = line;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub parts: Vec<LocationPart>,
}

impl Location {
    pub fn new(parts: Vec<LocationPart>) -> Self {
        Self { parts }
    }

    pub fn root(path: impl Into<String>) -> Self {
        Self::new(vec![LocationPart::new(path)])
    }

    /// Location of a child: this path plus one segment.
    pub fn child(&self, part: LocationPart) -> Self {
        let mut parts = Vec::with_capacity(self.parts.len() + 1);
        parts.extend(self.parts.iter().cloned());
        parts.push(part);
        Self { parts }
    }

    /// `head` followed by this location's parts minus the first `skip`.
    pub fn rebased(&self, head: LocationPart, skip: usize) -> Self {
        let mut parts = vec![head];
        parts.extend(self.parts.iter().skip(skip).cloned());
        Self { parts }
    }

    pub fn first(&self) -> Option<&LocationPart> {
        self.parts.first()
    }

    pub fn last(&self) -> Option<&LocationPart> {
        self.parts.last()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(&part.path)?;
        }
        Ok(())
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
