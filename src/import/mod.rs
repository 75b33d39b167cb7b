//! Import workflow
//!
//! [`Importer`] loads a [`Source`](crate::models::Source) into an existing
//! warehouse table through a staging table, then merges (incremental) or
//! swaps (full load) the staged rows into the destination.

mod id;
mod importer;

pub use id::{IdGenerator, SequentialIdGenerator, TimestampIdGenerator};
pub use importer::{
    CLEANUP, COPY_TO_STAGING, COUNT_ROWS, CREATE_STAGING_TABLE, DEDUPLICATE,
    INSERT_INTO_DESTINATION, Importer, MERGE, RESOLVE_FILES, SWAP, VALIDATE_COLUMNS,
};
