//! Purpose: Centralize container format tagging and versioning.
//! Exports: `CONTAINER_FORMAT`, `CONTAINER_FORMAT_VERSION`, `SUPPORTED_CONTAINER_FORMAT_VERSIONS`,
//! `check_container_format`.
//! Role: Shared gate for every container open (manifests and dataset sources alike).
//! Invariants: Version list is additive; bump only for incompatible on-disk changes.

use std::path::Path;

use crate::core::error::{Error, ErrorKind};

pub const CONTAINER_FORMAT: &str = "tpd-container";
pub const CONTAINER_FORMAT_VERSION: u32 = 1;
pub const SUPPORTED_CONTAINER_FORMAT_VERSIONS: &[u32] = &[CONTAINER_FORMAT_VERSION];

pub fn check_container_format(format: &str, version: u32, path: &Path) -> Result<(), Error> {
    if format != CONTAINER_FORMAT {
        return Err(Error::new(ErrorKind::Corrupt)
            .with_message(format!("unrecognized container format {format:?}"))
            .with_path(path)
            .with_hint("The file is not a tpd container. Recreate it with `tpd put` or `tpd init`."));
    }
    if !SUPPORTED_CONTAINER_FORMAT_VERSIONS.contains(&version) {
        let supported = SUPPORTED_CONTAINER_FORMAT_VERSIONS
            .iter()
            .map(|version| version.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(Error::new(ErrorKind::Corrupt)
            .with_message(format!(
                "unsupported container format version {version} (supported: {supported})"
            ))
            .with_path(path)
            .with_hint("Upgrade tpd to read this container."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{CONTAINER_FORMAT, CONTAINER_FORMAT_VERSION, check_container_format};
    use crate::core::error::ErrorKind;
    use std::path::Path;

    #[test]
    fn current_format_is_accepted() {
        check_container_format(CONTAINER_FORMAT, CONTAINER_FORMAT_VERSION, Path::new("x"))
            .expect("current format");
    }

    #[test]
    fn foreign_tag_and_future_version_are_corrupt() {
        let err = check_container_format("other", 1, Path::new("x")).expect_err("tag");
        assert_eq!(err.kind(), ErrorKind::Corrupt);

        let err = check_container_format(CONTAINER_FORMAT, 99, Path::new("x")).expect_err("ver");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert!(err.message().unwrap_or_default().contains("99"));
    }
}
