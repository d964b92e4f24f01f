//! Purpose: Manifest registry binding train/test roles to `(path, key)` dataset references.
//! Exports: `Manifest`, `SourceRef`, `ManifestSummary`, `SplitSummary`.
//! Role: Owns one manifest file; validates sources through a `DatasetStore` before persisting.
//! Invariants: Every mutation is one load-mutate-commit transaction; nothing is held open between calls.
//! Invariants: A split's baseline shape is set once, by the first slot assignment, and never rewritten.
//! Invariants: Slot admission needs an equal leading dimension or an equal total element count.
//! Invariants: Feature appends never establish a baseline.
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayD};
use tracing::{debug, info, warn};

use super::aggregate::{assemble_feature_matrix, plan_feature_matrix};
use super::layout::{ManifestKey, Slot, Split};
use super::options::ManifestOptions;
use crate::core::container::{Container, Entry};
use crate::core::error::{Error, ErrorKind, io_error};
use crate::core::paths::PathResolver;
use crate::core::shape::Shape;
use crate::core::store::{DatasetStore, FileStore};

/// A dataset reference as seen by callers: working-directory path plus in-file key.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SourceRef {
    pub path: PathBuf,
    pub key: String,
}

impl SourceRef {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitSummary {
    pub split: Split,
    pub baseline: Option<Shape>,
    pub slots: Vec<(Slot, Option<SourceRef>)>,
    pub features: Vec<SourceRef>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestSummary {
    pub path: PathBuf,
    pub splits: Vec<SplitSummary>,
}

pub struct Manifest<S = FileStore> {
    path: PathBuf,
    resolver: PathResolver,
    options: ManifestOptions,
    store: S,
}

impl Manifest<FileStore> {
    /// Opens the manifest at `path`, creating it (and its directory) when absent.
    pub fn open(path: impl AsRef<Path>, options: ManifestOptions) -> Result<Self, Error> {
        Self::open_with_store(path, options, FileStore::new())
    }
}

impl<S: DatasetStore> Manifest<S> {
    pub fn open_with_store(
        path: impl AsRef<Path>,
        options: ManifestOptions,
        store: S,
    ) -> Result<Self, Error> {
        let path = path.as_ref();
        let cwd = || {
            env::current_dir().map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read working directory")
                    .with_source(err)
            })
        };
        let working_dir = match options.working_dir() {
            Some(dir) if dir.is_absolute() => dir.to_path_buf(),
            Some(dir) => cwd()?.join(dir),
            None => cwd()?,
        };
        let resolver = PathResolver::new(&working_dir, path, options.path_mode());
        let manifest_path = resolver.absolute(path);

        if let Some(parent) = manifest_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| io_error(err, parent, "failed to create manifest directory"))?;
        }
        match store.load_container(&manifest_path) {
            Ok(_) => debug!(manifest = %manifest_path.display(), "manifest opened"),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                store.commit_container(&manifest_path, &Container::new())?;
                info!(manifest = %manifest_path.display(), "manifest created");
            }
            Err(err) => return Err(err),
        }

        Ok(Self {
            path: manifest_path,
            resolver,
            options,
            store,
        })
    }

    /// Absolute location of the manifest file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &ManifestOptions {
        &self.options
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn set_slot(
        &self,
        split: Split,
        slot: Slot,
        path: impl AsRef<Path>,
        key: &str,
    ) -> Result<(), Error> {
        let path = path.as_ref();
        let shape = self.source_shape(path, key)?;
        let stored = self.stored_path(path)?;

        self.transact("set_slot", |doc| {
            match read_baseline(doc, split)? {
                Some(baseline) if !shape.matches_baseline(&baseline) => {
                    return Err(shape_mismatch(split, &baseline, &shape)
                        .with_path(path)
                        .with_key(key));
                }
                Some(_) => {}
                None => {
                    doc.insert(
                        ManifestKey::Baseline(split).name(),
                        Entry::Ints {
                            values: shape.to_u64s(),
                        },
                    );
                    info!(%split, baseline = %shape, "split baseline established");
                }
            }
            let path_key = ManifestKey::SlotPath(split, slot).name();
            let key_key = ManifestKey::SlotKey(split, slot).name();
            doc.remove(&path_key);
            doc.remove(&key_key);
            doc.insert(path_key, Entry::text(stored.clone()));
            doc.insert(key_key, Entry::text(key));
            debug!(%split, %slot, path = %stored, key, %shape, "slot assigned");
            Ok(())
        })
    }

    pub fn slot(&self, split: Split, slot: Slot) -> Result<SourceRef, Error> {
        let doc = self.load()?;
        let path = read_text(&doc, ManifestKey::SlotPath(split, slot), &self.path)?;
        let key = read_text(&doc, ManifestKey::SlotKey(split, slot), &self.path)?;
        match (path, key) {
            (Some(path), Some(key)) => Ok(SourceRef::new(
                self.resolver.to_working_path(Path::new(&path)),
                key,
            )),
            _ => Err(Error::new(ErrorKind::NotFound)
                .with_message(format!("{split} {slot} is not set"))
                .with_path(&self.path)),
        }
    }

    pub fn slot_data(&self, split: Split, slot: Slot) -> Result<ArrayD<f64>, Error> {
        let source = self.slot(split, slot)?;
        self.read_source(&source)
    }

    /// The baseline shape recorded for `split`, if a slot has established one.
    pub fn baseline(&self, split: Split) -> Result<Option<Shape>, Error> {
        let doc = self.load()?;
        read_baseline(&doc, split)
    }

    /// Appends a feature source; returns `false` when it was already listed.
    pub fn add_feature(
        &self,
        split: Split,
        path: impl AsRef<Path>,
        key: &str,
    ) -> Result<bool, Error> {
        let path = path.as_ref();
        let shape = self.source_shape(path, key)?;
        let stored = self.stored_path(path)?;

        self.transact("add_feature", |doc| {
            if let Some(baseline) = read_baseline(doc, split)? {
                if shape.feature_columns(baseline.instance_count()).is_none() {
                    return Err(shape_mismatch(split, &baseline, &shape)
                        .with_path(path)
                        .with_key(key));
                }
            }
            let mut rows = read_feature_rows(doc, split, &self.path)?.unwrap_or_default();
            let row = [stored.clone(), key.to_string()];
            if rows.contains(&row) {
                debug!(%split, path = %stored, key, "feature already listed");
                return Ok(false);
            }
            rows.push(row);
            let name = ManifestKey::Features(split).name();
            doc.remove(&name);
            doc.insert(name, Entry::Table { rows });
            debug!(%split, path = %stored, key, %shape, "feature added");
            Ok(true)
        })
    }

    pub fn clear_features(&self, split: Split) -> Result<(), Error> {
        self.transact("clear_features", |doc| {
            doc.remove(&ManifestKey::Features(split).name());
            Ok(())
        })
    }

    pub fn feature_source(&self, split: Split, index: usize) -> Result<SourceRef, Error> {
        let doc = self.load()?;
        let rows = self.required_feature_rows(&doc, split)?;
        let len = rows.len();
        let [path, key] = rows.into_iter().nth(index).ok_or_else(|| {
            Error::new(ErrorKind::OutOfRange)
                .with_message(format!(
                    "feature index {index} is out of range for {split} ({len} sources)"
                ))
                .with_path(&self.path)
        })?;
        Ok(SourceRef::new(
            self.resolver.to_working_path(Path::new(&path)),
            key,
        ))
    }

    /// All feature sources of `split` in insertion order; empty when none were added.
    pub fn features(&self, split: Split) -> Result<Vec<SourceRef>, Error> {
        let doc = self.load()?;
        let rows = read_feature_rows(&doc, split, &self.path)?.unwrap_or_default();
        Ok(rows
            .into_iter()
            .map(|[path, key]| SourceRef::new(self.resolver.to_working_path(Path::new(&path)), key))
            .collect())
    }

    pub fn feature_count(&self, split: Split) -> Result<usize, Error> {
        let doc = self.load()?;
        Ok(read_feature_rows(&doc, split, &self.path)?.map_or(0, |rows| rows.len()))
    }

    /// Concatenates every feature source of `split` into an `(instances, columns)` matrix.
    ///
    /// The row count is the split baseline's instance count. Without a baseline
    /// it falls back to the leading dimension of the first source; that count is
    /// not recorded, so a later slot assignment may still pick a different one.
    pub fn feature_matrix(&self, split: Split) -> Result<Array2<f64>, Error> {
        let doc = self.load()?;
        let rows = self.required_feature_rows(&doc, split)?;
        let sources = rows
            .into_iter()
            .map(|[path, key]| SourceRef::new(self.resolver.to_working_path(Path::new(&path)), key))
            .collect::<Vec<_>>();
        let shapes = sources
            .iter()
            .map(|source| self.source_shape(&source.path, &source.key))
            .collect::<Result<Vec<_>, _>>()?;

        let instances = match read_baseline(&doc, split)? {
            Some(baseline) => baseline.instance_count(),
            None => {
                let instances = shapes[0].instance_count();
                warn!(
                    %split,
                    instances,
                    "no baseline recorded; using the first feature source's instance count"
                );
                instances
            }
        };

        let plan = plan_feature_matrix(instances, &shapes).map_err(|err| err.with_path(&self.path))?;
        let matrix = assemble_feature_matrix(&plan, |idx| self.read_source(&sources[idx]))?;
        debug!(
            %split,
            rows = plan.instances,
            columns = plan.columns,
            sources = plan.blocks.len(),
            "feature matrix assembled"
        );
        Ok(matrix)
    }

    /// Aggregates `split` and stores the matrix as an array entry at `(path, key)`.
    pub fn write_feature_matrix(
        &self,
        split: Split,
        path: impl AsRef<Path>,
        key: &str,
    ) -> Result<Shape, Error> {
        let matrix = self.feature_matrix(split)?;
        let shape = Shape::new(matrix.shape());
        let target = self.resolver.absolute(path.as_ref());
        self.store
            .write_entry(&target, key, Entry::from_array(&matrix.into_dyn()))?;
        Ok(shape)
    }

    pub fn summary(&self) -> Result<ManifestSummary, Error> {
        let mut splits = Vec::with_capacity(Split::ALL.len());
        for split in Split::ALL {
            let mut slots = Vec::with_capacity(Slot::ALL.len());
            for slot in Slot::ALL {
                let source = match self.slot(split, slot) {
                    Ok(source) => Some(source),
                    Err(err) if err.kind() == ErrorKind::NotFound => None,
                    Err(err) => return Err(err),
                };
                slots.push((slot, source));
            }
            splits.push(SplitSummary {
                split,
                baseline: self.baseline(split)?,
                slots,
                features: self.features(split)?,
            });
        }
        Ok(ManifestSummary {
            path: self.path.clone(),
            splits,
        })
    }

    fn load(&self) -> Result<Container, Error> {
        self.store.load_container(&self.path)
    }

    fn transact<T>(
        &self,
        op: &'static str,
        apply: impl FnOnce(&mut Container) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let before = self.load()?;
        let mut doc = before.clone();
        let out = apply(&mut doc)?;
        if doc != before {
            self.store.commit_container(&self.path, &doc)?;
            debug!(manifest = %self.path.display(), op, "manifest transaction committed");
        }
        Ok(out)
    }

    fn source_shape(&self, path: &Path, key: &str) -> Result<Shape, Error> {
        let absolute = self.resolver.absolute(path);
        if !self.store.exists(&absolute) {
            return Err(Error::new(ErrorKind::NotFound)
                .with_message("dataset file does not exist")
                .with_path(path));
        }
        self.store.read_shape(&absolute, key)
    }

    fn read_source(&self, source: &SourceRef) -> Result<ArrayD<f64>, Error> {
        let absolute = self.resolver.absolute(&source.path);
        if !self.store.exists(&absolute) {
            return Err(Error::new(ErrorKind::NotFound)
                .with_message("dataset file does not exist")
                .with_path(&source.path));
        }
        self.store.read_array(&absolute, &source.key)
    }

    fn stored_path(&self, path: &Path) -> Result<String, Error> {
        let stored = self.resolver.to_manifest_path(path);
        stored.to_str().map(str::to_string).ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message("dataset path is not valid UTF-8")
                .with_path(path)
        })
    }

    fn required_feature_rows(&self, doc: &Container, split: Split) -> Result<Vec<[String; 2]>, Error> {
        match read_feature_rows(doc, split, &self.path)? {
            Some(rows) if !rows.is_empty() => Ok(rows),
            _ => Err(Error::new(ErrorKind::NotFound)
                .with_message(format!("{split} has no feature sources"))
                .with_path(&self.path)),
        }
    }
}

fn shape_mismatch(split: Split, baseline: &Shape, shape: &Shape) -> Error {
    Error::new(ErrorKind::ShapeMismatch)
        .with_message(format!(
            "dataset shape {shape} does not match {split} baseline {baseline} ({} instances)",
            baseline.instance_count()
        ))
        .with_hint("Every dataset of a split must describe the same number of instances.")
}

fn unexpected_entry(key: ManifestKey, entry: &Entry, manifest: &Path) -> Error {
    Error::new(ErrorKind::Corrupt)
        .with_message(format!("manifest entry holds {} data", entry.kind_name()))
        .with_path(manifest)
        .with_key(key.name())
}

fn read_text(doc: &Container, key: ManifestKey, manifest: &Path) -> Result<Option<String>, Error> {
    match doc.get(&key.name()) {
        None => Ok(None),
        Some(Entry::Text { value }) => Ok(Some(value.clone())),
        Some(other) => Err(unexpected_entry(key, other, manifest)),
    }
}

fn read_baseline(doc: &Container, split: Split) -> Result<Option<Shape>, Error> {
    let key = ManifestKey::Baseline(split);
    match doc.get(&key.name()) {
        None => Ok(None),
        Some(Entry::Ints { values }) => Shape::from_u64s(values).map(Some).ok_or_else(|| {
            Error::new(ErrorKind::Corrupt)
                .with_message("baseline dimension exceeds platform range")
                .with_key(key.name())
        }),
        Some(other) => Err(Error::new(ErrorKind::Corrupt)
            .with_message(format!("manifest entry holds {} data", other.kind_name()))
            .with_key(key.name())),
    }
}

fn read_feature_rows(
    doc: &Container,
    split: Split,
    manifest: &Path,
) -> Result<Option<Vec<[String; 2]>>, Error> {
    let key = ManifestKey::Features(split);
    match doc.get(&key.name()) {
        None => Ok(None),
        Some(Entry::Table { rows }) => Ok(Some(rows.clone())),
        Some(other) => Err(unexpected_entry(key, other, manifest)),
    }
}
