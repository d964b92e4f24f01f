//! Purpose: Library crate behind the `tpd` CLI: train/predict dataset manifests.
//! Exports: `api` (manifest registry and its types), `core` (containers, store, paths, errors).
//! Role: Embeddable registry; the binary is a thin JSON front end over `api`.
//! Invariants: Core modules are pure or single-call scoped; no state outlives an operation.
pub mod api;
pub mod core;
