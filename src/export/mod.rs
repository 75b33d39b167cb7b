//! Export workflow
//!
//! [`Exporter`] runs a backend's unload statement, learns which objects it
//! wrote (from the statement's result rows or by listing the output prefix)
//! and optionally stores a manifest describing them.

mod exporter;

pub use exporter::{Exporter, LIST_FILES, UNLOAD, WRITE_MANIFEST};
