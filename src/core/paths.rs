//! Resolution of configured file and directory names against a base directory.

use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Resolves relative names against a base directory and checks the entry type.
///
/// Absolute names are used as-is. The base defaults to the process working
/// directory at construction time.
#[derive(Debug, Clone)]
pub struct PathResolver {
    base: PathBuf,
}

impl PathResolver {
    /// Resolver rooted at the current working directory.
    pub fn from_current_dir() -> Result<Self, AppError> {
        Ok(Self {
            base: std::env::current_dir()?,
        })
    }

    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn join(&self, name: &Path) -> PathBuf {
        if name.is_absolute() {
            name.to_path_buf()
        } else {
            self.base.join(name)
        }
    }

    /// Resolve `name` to an existing regular file.
    pub fn resolve_file(&self, name: impl AsRef<Path>) -> Result<PathBuf, AppError> {
        let path = self.join(name.as_ref());
        let meta = std::fs::metadata(&path)
            .map_err(|_| AppError::ConfigNotFound(path.display().to_string()))?;
        if meta.is_dir() {
            return Err(AppError::ConfigIsDirectory(path.display().to_string()));
        }
        Ok(path)
    }

    /// Resolve `name` to an existing directory.
    pub fn resolve_dir(&self, name: impl AsRef<Path>) -> Result<PathBuf, AppError> {
        let path = self.join(name.as_ref());
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => Ok(path),
            _ => Err(AppError::NotADirectory(path.display().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_file_relative_to_base() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();
        let resolver = PathResolver::with_base(dir.path());
        let path = resolver.resolve_file("config.json").unwrap();
        assert_eq!(path, dir.path().join("config.json"));
    }

    #[test]
    fn test_resolve_file_absolute_ignores_base() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("abs.json");
        std::fs::write(&file, "{}").unwrap();
        let resolver = PathResolver::with_base("/nonexistent-base");
        assert_eq!(resolver.resolve_file(&file).unwrap(), file);
    }

    #[test]
    fn test_resolve_file_missing() {
        let dir = tempdir().unwrap();
        let resolver = PathResolver::with_base(dir.path());
        let err = resolver.resolve_file("config.json").unwrap_err();
        assert_eq!(err.kind(), "ConfigNotFound");
    }

    #[test]
    fn test_resolve_file_is_directory() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("config.json")).unwrap();
        let resolver = PathResolver::with_base(dir.path());
        let err = resolver.resolve_file("config.json").unwrap_err();
        assert_eq!(err.kind(), "ConfigIsDirectory");
    }

    #[test]
    fn test_resolve_dir_rejects_file_and_missing() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("rules"), "").unwrap();
        let resolver = PathResolver::with_base(dir.path());
        assert_eq!(resolver.resolve_dir("rules").unwrap_err().kind(), "NotADirectory");
        assert_eq!(resolver.resolve_dir("missing").unwrap_err().kind(), "NotADirectory");
    }

    #[test]
    fn test_resolve_dir_ok() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("rules")).unwrap();
        let resolver = PathResolver::with_base(dir.path());
        assert_eq!(resolver.resolve_dir("rules").unwrap(), dir.path().join("rules"));
    }
}
