//! Sources, destinations, options and results of import/export calls

mod cloud;
mod destination;
mod options;
mod result;
mod source;
mod state;
mod table;

pub use cloud::{CloudCredentials, CloudLocation, CsvOptions};
pub use destination::{CloudFileDestination, Destination, DestinationKind};
pub use options::{
    BigQueryUsingTypes, ExportOptions, ImportOptions, ImportOptionsBuilder,
    ImportOptionsExtension, SynapseDistribution, TIMESTAMP_COLUMN,
};
pub use result::{ExportResult, ExportedFile, ImportResult};
pub use source::{CloudFileSource, QuerySource, Source, SourceKind, TableSource};
pub use state::ImportState;
pub use table::{ColumnDefinition, TableDefinition};
