//! Purpose: Convert dataset paths between working-directory form and manifest-stored form.
//! Exports: `PathMode`, `PathResolver`, `to_manifest_path`, `to_working_path`, `normalize`,
//! `relative_to`.
//! Role: Keeps stored references valid when a manifest moves together with its data.
//! Invariants: Pure lexical computation; never touches the filesystem or resolves symlinks.
//! Invariants: `to_working_path(to_manifest_path(p))` names the same location as `p`.

use std::path::{Component, Path, PathBuf};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PathMode {
    /// Store paths relative to the manifest's directory.
    #[default]
    Relative,
    /// Store absolute paths.
    Absolute,
}

impl PathMode {
    pub fn from_absolute(absolute: bool) -> Self {
        if absolute {
            PathMode::Absolute
        } else {
            PathMode::Relative
        }
    }
}

/// Path conversions bound to one manifest location and one working directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathResolver {
    working_dir: PathBuf,
    base_dir: PathBuf,
    mode: PathMode,
}

impl PathResolver {
    /// `working_dir` must be absolute; `manifest_path` may be relative to it.
    pub fn new(working_dir: &Path, manifest_path: &Path, mode: PathMode) -> Self {
        let working_dir = normalize(working_dir);
        let manifest = normalize(&working_dir.join(manifest_path));
        let manifest_dir = manifest.parent().unwrap_or(&manifest).to_path_buf();
        let base_dir = relative_to(&manifest_dir, &working_dir);
        Self {
            working_dir,
            base_dir,
            mode,
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// The manifest's directory, relative to the working directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn mode(&self) -> PathMode {
        self.mode
    }

    /// Absolute location of a caller path, for filesystem access.
    pub fn absolute(&self, path: &Path) -> PathBuf {
        normalize(&self.working_dir.join(path))
    }

    pub fn to_manifest_path(&self, path: &Path) -> PathBuf {
        to_manifest_path(path, &self.base_dir, self.mode, &self.working_dir)
    }

    pub fn to_working_path(&self, stored: &Path) -> PathBuf {
        to_working_path(stored, &self.base_dir, &self.working_dir)
    }
}

pub fn to_manifest_path(path: &Path, base_dir: &Path, mode: PathMode, working_dir: &Path) -> PathBuf {
    let absolute = normalize(&working_dir.join(path));
    match mode {
        PathMode::Absolute => absolute,
        PathMode::Relative => relative_to(&absolute, &normalize(&working_dir.join(base_dir))),
    }
}

pub fn to_working_path(stored: &Path, base_dir: &Path, working_dir: &Path) -> PathBuf {
    if stored.is_absolute() {
        relative_to(&normalize(stored), &normalize(working_dir))
    } else {
        normalize(&base_dir.join(stored))
    }
}

/// Lexically removes `.` and folds `..` into its parent where one exists.
///
/// Leading `..` of a relative path are kept; `..` at a root is dropped. An
/// empty relative result becomes `.`.
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            _ => parts.push(component),
        }
    }
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Expresses absolute `path` relative to absolute `base`.
///
/// Paths on different roots (e.g. other drive prefixes) are returned unchanged.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path = normalize(path);
    let base = normalize(base);
    let path_parts = path.components().collect::<Vec<_>>();
    let base_parts = base.components().collect::<Vec<_>>();

    fn anchored<'a>(parts: &[Component<'a>]) -> Vec<Component<'a>> {
        parts
            .iter()
            .take_while(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
            .copied()
            .collect()
    }
    if anchored(&path_parts) != anchored(&base_parts) {
        return path;
    }

    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut out = PathBuf::new();
    for _ in common..base_parts.len() {
        out.push("..");
    }
    for part in &path_parts[common..] {
        out.push(part.as_os_str());
    }
    if out.as_os_str().is_empty() {
        return PathBuf::from(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{PathMode, PathResolver, normalize, relative_to, to_manifest_path, to_working_path};
    use std::path::{Path, PathBuf};

    #[test]
    fn normalize_folds_dots() {
        assert_eq!(normalize(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize(Path::new("../a/../../b")), PathBuf::from("../../b"));
        assert_eq!(normalize(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn relative_to_walks_up_and_down() {
        assert_eq!(
            relative_to(Path::new("/w/a/b.dat"), Path::new("/w/m")),
            PathBuf::from("../a/b.dat")
        );
        assert_eq!(
            relative_to(Path::new("/w/m/x"), Path::new("/w/m")),
            PathBuf::from("x")
        );
        assert_eq!(relative_to(Path::new("/w"), Path::new("/w")), PathBuf::from("."));
    }

    #[test]
    fn base_dir_is_manifest_dir_relative_to_working_dir() {
        let resolver =
            PathResolver::new(Path::new("/w"), Path::new("out/m.tpd"), PathMode::Relative);
        assert_eq!(resolver.base_dir(), Path::new("out"));

        let resolver = PathResolver::new(Path::new("/w/sub"), Path::new("/w/m.tpd"), PathMode::Relative);
        assert_eq!(resolver.base_dir(), Path::new(".."));
    }

    #[test]
    fn relative_mode_stores_manifest_relative_paths() {
        let stored = to_manifest_path(
            Path::new("data/a.dat"),
            Path::new("out"),
            PathMode::Relative,
            Path::new("/w"),
        );
        assert_eq!(stored, PathBuf::from("../data/a.dat"));
        assert_eq!(
            to_working_path(&stored, Path::new("out"), Path::new("/w")),
            PathBuf::from("data/a.dat")
        );
    }

    #[test]
    fn absolute_mode_stores_absolute_paths() {
        let stored = to_manifest_path(
            Path::new("data/a.dat"),
            Path::new("out"),
            PathMode::Absolute,
            Path::new("/w"),
        );
        assert_eq!(stored, PathBuf::from("/w/data/a.dat"));
        assert_eq!(
            to_working_path(&stored, Path::new("out"), Path::new("/w")),
            PathBuf::from("data/a.dat")
        );
    }

    #[test]
    fn round_trip_is_path_equivalent() {
        let working = Path::new("/w/project");
        let manifests = ["m.tpd", "out/m.tpd", "../elsewhere/m.tpd", "/abs/dir/m.tpd"];
        let inputs = [
            "a.dat",
            "./a.dat",
            "data/../b.dat",
            "../up/c.dat",
            "/w/project/d.dat",
            "/other/root/e.dat",
        ];
        for manifest in manifests {
            for mode in [PathMode::Relative, PathMode::Absolute] {
                let resolver = PathResolver::new(working, Path::new(manifest), mode);
                for input in inputs {
                    let input = Path::new(input);
                    let stored = resolver.to_manifest_path(input);
                    let back = resolver.to_working_path(&stored);
                    assert_eq!(
                        resolver.absolute(&back),
                        resolver.absolute(input),
                        "manifest={manifest} mode={mode:?} input={} stored={}",
                        input.display(),
                        stored.display()
                    );
                }
            }
        }
    }

    #[test]
    fn manifest_moves_with_relative_data() {
        let before = PathResolver::new(Path::new("/w"), Path::new("proj/m.tpd"), PathMode::Relative);
        let stored = before.to_manifest_path(Path::new("proj/data/a.dat"));
        assert_eq!(stored, PathBuf::from("data/a.dat"));

        let after = PathResolver::new(Path::new("/w"), Path::new("moved/m.tpd"), PathMode::Relative);
        assert_eq!(after.to_working_path(&stored), PathBuf::from("moved/data/a.dat"));
    }
}
