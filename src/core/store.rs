//! Purpose: Dataset store capability consumed by the manifest registry.
//! Exports: `DatasetStore`, `FileStore`.
//! Role: Seam between registry logic and container I/O, for sources and the manifest alike.
//! Role: Each call is one scoped open.
//! Invariants: No handle outlives a call; single-entry writes are atomic, multi-entry ones are not.
//! Invariants: Missing files and missing keys surface as `NotFound` carrying path and key.
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use ndarray::ArrayD;

use crate::core::container::{Container, Entry};
use crate::core::error::{Error, ErrorKind, io_error};
use crate::core::shape::Shape;

pub trait DatasetStore {
    fn exists(&self, path: &Path) -> bool;

    fn list_entries(&self, path: &Path) -> Result<BTreeSet<String>, Error>;

    fn read_shape(&self, path: &Path, key: &str) -> Result<Shape, Error>;

    fn read_array(&self, path: &Path, key: &str) -> Result<ArrayD<f64>, Error>;

    /// Writes `entry` under `key`, creating the container when absent.
    fn write_entry(&self, path: &Path, key: &str, entry: Entry) -> Result<(), Error>;

    /// Removes `key`; returns whether it was present.
    fn delete_entry(&self, path: &Path, key: &str) -> Result<bool, Error>;

    /// Loads a whole container; a missing file is `NotFound`.
    fn load_container(&self, path: &Path) -> Result<Container, Error>;

    /// Replaces the container at `path` in one atomic write.
    fn commit_container(&self, path: &Path, container: &Container) -> Result<(), Error>;
}

/// Store backed by container files on the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileStore;

impl FileStore {
    pub fn new() -> Self {
        Self
    }

    fn load_source(&self, path: &Path) -> Result<Container, Error> {
        Container::load(path).map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                Error::new(ErrorKind::NotFound)
                    .with_message("dataset file does not exist")
                    .with_path(path)
            } else {
                err
            }
        })
    }

    fn load_entry(&self, path: &Path, key: &str) -> Result<Entry, Error> {
        let mut container = self.load_source(path)?;
        container.remove(key).ok_or_else(|| missing_key(path, key))
    }
}

impl DatasetStore for FileStore {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn list_entries(&self, path: &Path) -> Result<BTreeSet<String>, Error> {
        let container = self.load_source(path)?;
        Ok(container.keys().map(str::to_string).collect())
    }

    fn read_shape(&self, path: &Path, key: &str) -> Result<Shape, Error> {
        let container = self.load_source(path)?;
        container
            .get(key)
            .map(Entry::shape)
            .ok_or_else(|| missing_key(path, key))
    }

    fn read_array(&self, path: &Path, key: &str) -> Result<ArrayD<f64>, Error> {
        self.load_entry(path, key)?
            .to_array()
            .map_err(|err| err.with_path(path).with_key(key))
    }

    fn write_entry(&self, path: &Path, key: &str, entry: Entry) -> Result<(), Error> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|err| io_error(err, parent, "failed to create container directory"))?;
        }
        let mut container = Container::load_or_default(path)?;
        container.insert(key, entry);
        container.commit(path)
    }

    fn delete_entry(&self, path: &Path, key: &str) -> Result<bool, Error> {
        let mut container = self.load_source(path)?;
        if container.remove(key).is_none() {
            return Ok(false);
        }
        container.commit(path)?;
        Ok(true)
    }

    fn load_container(&self, path: &Path) -> Result<Container, Error> {
        Container::load(path)
    }

    fn commit_container(&self, path: &Path, container: &Container) -> Result<(), Error> {
        container.commit(path)
    }
}

fn missing_key(path: &Path, key: &str) -> Error {
    Error::new(ErrorKind::NotFound)
        .with_message("dataset file has no such key")
        .with_path(path)
        .with_key(key)
}
