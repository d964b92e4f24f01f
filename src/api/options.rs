//! Purpose: Configuration for opening a manifest.
//! Exports: `ManifestOptions`.
//! Role: Builder-style settings fixed for the lifetime of one manifest handle.
//! Invariants: Defaults are relative path storage and the process working directory.
use std::path::{Path, PathBuf};

use crate::core::paths::PathMode;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ManifestOptions {
    path_mode: PathMode,
    working_dir: Option<PathBuf>,
}

impl ManifestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path_mode(mut self, path_mode: PathMode) -> Self {
        self.path_mode = path_mode;
        self
    }

    pub fn absolute_paths(self, absolute: bool) -> Self {
        self.with_path_mode(PathMode::from_absolute(absolute))
    }

    /// Directory that caller paths are relative to, instead of the process cwd.
    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    pub fn path_mode(&self) -> PathMode {
        self.path_mode
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::ManifestOptions;
    use crate::core::paths::PathMode;
    use std::path::Path;

    #[test]
    fn defaults_are_relative_and_unpinned() {
        let options = ManifestOptions::new();
        assert_eq!(options.path_mode(), PathMode::Relative);
        assert!(options.working_dir().is_none());
    }

    #[test]
    fn builders_set_fields() {
        let options = ManifestOptions::new()
            .absolute_paths(true)
            .with_working_dir("/tmp/work");
        assert_eq!(options.path_mode(), PathMode::Absolute);
        assert_eq!(options.working_dir(), Some(Path::new("/tmp/work")));
    }
}
