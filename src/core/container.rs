//! Purpose: On-disk container of named entries (text, integer sequences, string tables, arrays).
//! Exports: `Container`, `Entry`.
//! Role: Storage primitive behind both dataset sources and manifest files.
//! Invariants: A container is loaded whole, mutated in memory, and committed by atomic rename.
//! Invariants: A commit keeps the permissions of the file it replaces.
//! Invariants: Array entries always satisfy `data.len() == product(shape)` once loaded.
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use tempfile::Builder;

use crate::core::error::{Error, ErrorKind, io_error};
use crate::core::format::{CONTAINER_FORMAT, CONTAINER_FORMAT_VERSION, check_container_format};
use crate::core::shape::Shape;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    Text { value: String },
    Ints { values: Vec<u64> },
    Table { rows: Vec<[String; 2]> },
    Array { shape: Vec<usize>, data: Vec<f64> },
}

impl Entry {
    pub fn text(value: impl Into<String>) -> Self {
        Entry::Text {
            value: value.into(),
        }
    }

    pub fn from_array(array: &ArrayD<f64>) -> Self {
        Entry::Array {
            shape: array.shape().to_vec(),
            data: array.iter().copied().collect(),
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Entry::Text { .. } => Shape::default(),
            Entry::Ints { values } => Shape::new(&[values.len()]),
            Entry::Table { rows } => Shape::new(&[rows.len(), 2]),
            Entry::Array { shape, .. } => Shape::new(shape),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Entry::Text { .. } => "text",
            Entry::Ints { .. } => "ints",
            Entry::Table { .. } => "table",
            Entry::Array { .. } => "array",
        }
    }

    /// Numeric view of the entry; integer sequences widen to `f64`.
    pub fn to_array(&self) -> Result<ArrayD<f64>, Error> {
        match self {
            Entry::Array { shape, data } => ArrayD::from_shape_vec(IxDyn(shape), data.clone())
                .map_err(|err| {
                    Error::new(ErrorKind::Corrupt)
                        .with_message("array data does not match its shape")
                        .with_source(err)
                }),
            Entry::Ints { values } => {
                let data = values.iter().map(|&value| value as f64).collect::<Vec<_>>();
                ArrayD::from_shape_vec(IxDyn(&[data.len()]), data)
                    .map_err(|err| Error::new(ErrorKind::Internal).with_source(err))
            }
            Entry::Text { .. } | Entry::Table { .. } => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("{} entry is not numeric", self.kind_name()))),
        }
    }

    fn validate(&self) -> Result<(), String> {
        if let Entry::Array { shape, data } = self {
            let expected = shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim));
            if expected != Some(data.len()) {
                return Err(format!(
                    "array holds {} values but shape {} needs {}",
                    data.len(),
                    Shape::new(shape),
                    expected.map_or_else(|| "overflow".to_string(), |n| n.to_string())
                ));
            }
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct ContainerDoc {
    format: String,
    version: u32,
    #[serde(default)]
    entries: BTreeMap<String, Entry>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Container {
    entries: BTreeMap<String, Entry>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the container at `path`; a missing file is `NotFound`.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let file =
            fs::File::open(path).map_err(|err| io_error(err, path, "failed to open container"))?;
        let doc: ContainerDoc = serde_json::from_reader(BufReader::new(file)).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message("container is not valid JSON")
                .with_path(path)
                .with_source(err)
        })?;
        check_container_format(&doc.format, doc.version, path)?;
        for (key, entry) in &doc.entries {
            entry.validate().map_err(|message| {
                Error::new(ErrorKind::Corrupt)
                    .with_message(message)
                    .with_path(path)
                    .with_key(key)
            })?;
        }
        Ok(Self {
            entries: doc.entries,
        })
    }

    /// Loads the container, or returns an empty one when the file is absent.
    pub fn load_or_default(path: &Path) -> Result<Self, Error> {
        match Self::load(path) {
            Ok(container) => Ok(container),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::new()),
            Err(err) => Err(err),
        }
    }

    /// Writes the whole container next to `path` and renames it into place.
    pub fn commit(&self, path: &Path) -> Result<(), Error> {
        let dir = parent_dir(path);
        let existing = fs::metadata(path).ok().map(|meta| meta.permissions());
        let mut builder = Builder::new();
        builder.prefix(".tpd-");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // Same mode as a plain `File::create`; the umask still applies.
            builder.permissions(fs::Permissions::from_mode(0o666));
        }
        let staged = builder
            .tempfile_in(&dir)
            .map_err(|err| io_error(err, &dir, "failed to stage container"))?;
        if let Some(permissions) = existing {
            staged
                .as_file()
                .set_permissions(permissions)
                .map_err(|err| io_error(err, path, "failed to copy container permissions"))?;
        }
        let doc = ContainerDoc {
            format: CONTAINER_FORMAT.to_string(),
            version: CONTAINER_FORMAT_VERSION,
            entries: self.entries.clone(),
        };
        {
            let mut writer = BufWriter::new(staged.as_file());
            serde_json::to_writer(&mut writer, &doc).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to encode container")
                    .with_path(path)
                    .with_source(err)
            })?;
            writer
                .flush()
                .map_err(|err| io_error(err, path, "failed to write container"))?;
        }
        staged
            .as_file()
            .sync_all()
            .map_err(|err| io_error(err, path, "failed to sync container"))?;
        staged
            .persist(path)
            .map_err(|err| io_error(err.error, path, "failed to replace container"))?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: Entry) -> Option<Entry> {
        self.entries.insert(key.into(), entry)
    }

    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
