// Core modules implementing container storage, path resolution, shapes, and errors.
pub mod container;
pub mod error;
pub mod format;
pub mod paths;
pub mod shape;
pub mod store;
