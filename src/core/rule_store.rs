//! Rule directory scanning.
//!
//! A rule directory holds the selectable "modes". Top-level files are modes
//! named after the file; each top-level subdirectory contributes its direct
//! files as `"<subdir>/<file>"`. Traversal stops at that second level, and
//! hidden entries (leading `.`) are skipped everywhere.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Ordered rule ids plus the file each one names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleCatalog {
    /// Ids in discovery order.
    pub ids: Vec<String>,
    pub paths: HashMap<String, PathBuf>,
}

impl RuleCatalog {
    pub fn path(&self, id: &str) -> Option<&Path> {
        self.paths.get(id).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn push(&mut self, id: String, path: PathBuf) {
        self.ids.push(id.clone());
        self.paths.insert(id, path);
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Whether `entry` is a directory. Symlinks are followed when their target
/// exists; a dangling link counts as a plain file.
fn is_dir(entry: &std::fs::DirEntry) -> Result<bool, AppError> {
    let file_type = entry.file_type()?;
    if file_type.is_symlink() {
        return Ok(std::fs::metadata(entry.path()).is_ok_and(|meta| meta.is_dir()));
    }
    Ok(file_type.is_dir())
}

/// Scan `dir` two levels deep into a [`RuleCatalog`].
pub fn scan(dir: &Path) -> Result<RuleCatalog, AppError> {
    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => {}
        _ => return Err(AppError::NotADirectory(dir.display().to_string())),
    }

    let mut catalog = RuleCatalog::default();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_hidden(&name) {
            continue;
        }
        let path = entry.path();

        if !is_dir(&entry)? {
            catalog.push(name, path);
            continue;
        }

        for inner in std::fs::read_dir(&path)? {
            let inner = inner?;
            let file = inner.file_name().to_string_lossy().into_owned();
            if is_hidden(&file) {
                continue;
            }
            if is_dir(&inner)? {
                continue;
            }
            catalog.push(format!("{name}/{file}"), inner.path());
        }
    }

    tracing::debug!("Scanned {} rule files under {}", catalog.len(), dir.display());
    Ok(catalog)
}
