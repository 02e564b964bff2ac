//! Module document loading
//!
//! Reads `*.module.yaml` files from directories (or single files) and
//! turns them into descriptors.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::descriptor::ModuleDescriptor;
use super::document::ModuleDocument;
use crate::error::{ModexError, Result};

/// File suffix of module documents
pub const MODULE_FILE_SUFFIX: &str = ".module.yaml";

/// Loads module descriptors from a set of paths
#[derive(Debug, Clone, Default)]
pub struct ModuleLoader {
    paths: Vec<PathBuf>,
}

impl ModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory to scan, or a single module file.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn paths(mut self, paths: impl IntoIterator<Item = impl AsRef<Path>>) -> Self {
        self.paths
            .extend(paths.into_iter().map(|p| p.as_ref().to_path_buf()));
        self
    }

    /// Module files found, in sorted order per directory
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for base in &self.paths {
            if base.is_file() {
                files.push(base.clone());
                continue;
            }
            // Missing directories contribute nothing
            if !base.is_dir() {
                debug!(path = %base.display(), "module path does not exist, skipping");
                continue;
            }

            let pattern = base
                .join(format!("*{MODULE_FILE_SUFFIX}"))
                .to_string_lossy()
                .to_string();
            let entries = glob::glob(&pattern).map_err(|e| ModexError::ModuleScan {
                pattern: pattern.clone(),
                details: e.to_string(),
            })?;

            let mut found = Vec::new();
            for entry in entries {
                let path = entry.map_err(|e| ModexError::ModuleScan {
                    pattern: pattern.clone(),
                    details: e.to_string(),
                })?;
                found.push(path);
            }
            found.sort();
            files.extend(found);
        }

        Ok(files)
    }

    pub fn load(&self) -> Result<Vec<ModuleDescriptor>> {
        self.scan()?
            .into_iter()
            .map(|path| {
                debug!(path = %path.display(), "loading module");
                ModuleDocument::load(&path)?.into_descriptor()
            })
            .collect()
    }
}
