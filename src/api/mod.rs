//! Purpose: Define the public Rust API boundary for dataset manifests.
//! Exports: Manifest registry, key space, options, and the core types callers touch.
//! Role: Public, additive-only surface used by the CLI and embedding programs.
//! Invariants: Callers never need to name container internals to drive a manifest.

mod aggregate;
mod layout;
mod manifest;
mod options;

pub use crate::core::container::{Container, Entry};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::paths::{PathMode, PathResolver};
pub use crate::core::shape::Shape;
pub use crate::core::store::{DatasetStore, FileStore};
pub use aggregate::{ColumnBlock, MatrixPlan, assemble_feature_matrix, plan_feature_matrix};
pub use layout::{ManifestKey, Slot, Split};
pub use manifest::{Manifest, ManifestSummary, SourceRef, SplitSummary};
pub use options::ManifestOptions;
