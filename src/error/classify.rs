//! Translation of backend-native driver errors into [`ErrorKind`]s
//!
//! Each backend has an ordered table of diagnostic patterns; the first
//! matching pattern wins, then a small set of driver-agnostic patterns is
//! consulted. Anything left over is [`ErrorKind::Unknown`].

use once_cell::sync::Lazy;
use regex::Regex;

use super::{ErrorKind, ImportExportError, ObjectType, ResourceKind, sanitize};
use crate::backend::Backend;
use crate::database::ExecutorError;

struct Rule {
    pattern: Regex,
    kind: ErrorKind,
}

fn rule(pattern: &str, kind: ErrorKind) -> Rule {
    Rule {
        pattern: Regex::new(pattern).expect("Invalid regex"),
        kind,
    }
}

static SNOWFLAKE_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(r"(?i)Remote file '.*' was not found", ErrorKind::MandatoryFileNotFound),
        rule(
            r"(?i)Number of columns in file \(\d+\) does not match",
            ErrorKind::ColumnsCountMismatch,
        ),
        rule(r"(?i)String '.*' is too long", ErrorKind::RowTooLarge),
        rule(
            r"(?i)(?:Numeric value|Timestamp|Date|Boolean value) '.*' is not recognized",
            ErrorKind::ValueConversion,
        ),
        rule(
            r"(?i)Expression type does not match column data type",
            ErrorKind::DataTypeMismatch,
        ),
        rule(r"(?i)invalid identifier '", ErrorKind::InvalidColumnName),
        rule(r"(?i)duplicate column name", ErrorKind::DuplicateColumnNames),
        rule(
            r"(?i)Schema '.*' does not exist",
            ErrorKind::ObjectNotFound(ObjectType::Schema),
        ),
        rule(
            r"(?i)Database '.*' does not exist",
            ErrorKind::ObjectNotFound(ObjectType::Database),
        ),
        rule(
            r"(?i)(?:Table|Object) '.*' does not exist",
            ErrorKind::ObjectNotFound(ObjectType::Table),
        ),
        rule(
            r"(?i)(?:Found character '.*' instead of field delimiter|End of record reached while expected to parse column|Field delimiter '.*' found while expecting record delimiter)",
            ErrorKind::InvalidSourceData,
        ),
        rule(
            r"(?i)(?:Invalid value \[.*\] for parameter|Invalid file format)",
            ErrorKind::InvalidFileParams,
        ),
        rule(
            r"(?i)Statement reached its statement or warehouse timeout",
            ErrorKind::QueryTimeout,
        ),
        rule(
            r"(?i)(?:Incorrect username or password|JWT token is invalid)",
            ErrorKind::Auth,
        ),
        rule(
            r"(?i)too many requests",
            ErrorKind::ResourceFull(ResourceKind::TooManyRequests),
        ),
        rule(r"(?i)Unsupported feature", ErrorKind::CommandNotSupported),
        rule(r"(?i)SQL compilation error", ErrorKind::InvalidSql),
    ]
});

static SYNAPSE_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(r"\(404\) Not Found", ErrorKind::MandatoryFileNotFound),
        rule(
            r"(?i)(?:Cannot bulk load because the file .* could not be opened|The specified blob does not exist)",
            ErrorKind::MandatoryFileNotFound,
        ),
        rule(r"\(403\) Forbidden", ErrorKind::Auth),
        rule(
            r"(?i)String or binary data would be truncated",
            ErrorKind::RowTooLarge,
        ),
        rule(
            r"(?i)(?:Bulk load data conversion error|Conversion failed when converting|Error converting data type)",
            ErrorKind::ValueConversion,
        ),
        rule(
            r"(?i)(?:Operand type clash|Implicit conversion from data type .* is not allowed)",
            ErrorKind::DataTypeMismatch,
        ),
        rule(r"(?i)Invalid column name '", ErrorKind::InvalidColumnName),
        rule(
            r"(?i)(?:Column names in each table must be unique|specified more than once)",
            ErrorKind::DuplicateColumnNames,
        ),
        rule(
            r"(?i)specified schema name .* either does not exist",
            ErrorKind::ObjectNotFound(ObjectType::Schema),
        ),
        rule(
            r"(?i)Cannot open database",
            ErrorKind::ObjectNotFound(ObjectType::Database),
        ),
        rule(
            r"(?i)Invalid object name '",
            ErrorKind::ObjectNotFound(ObjectType::Table),
        ),
        rule(r"(?i)Login failed", ErrorKind::Auth),
        rule(r"(?i)Execution Timeout Expired", ErrorKind::QueryTimeout),
        rule(
            r"(?i)(?:insufficient system resources|exceeded the .*concurrency)",
            ErrorKind::ResourceFull(ResourceKind::NoRoomInWarehouse),
        ),
        rule(
            r"(?i)(?:Parse error at line|Incorrect syntax near)",
            ErrorKind::InvalidSql,
        ),
        rule(r"(?i)is not supported", ErrorKind::CommandNotSupported),
    ]
});

static EXASOL_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(r"(?i)(?:error:? |code=)404", ErrorKind::MandatoryFileNotFound),
        rule(
            r"(?i)(?:(?:error:? |code=)403|authentication failed)",
            ErrorKind::Auth,
        ),
        rule(r"(?i)string data, right truncation", ErrorKind::RowTooLarge),
        rule(
            r"(?i)(?:invalid character value for cast|numeric value out of range)",
            ErrorKind::ValueConversion,
        ),
        rule(r"(?i)too (?:few|many) columns", ErrorKind::ColumnsCountMismatch),
        rule(r"(?i)duplicate column name", ErrorKind::DuplicateColumnNames),
        rule(
            r"(?i)schema .* not found",
            ErrorKind::ObjectNotFound(ObjectType::Schema),
        ),
        rule(
            r"(?i)object .* not found",
            ErrorKind::ObjectNotFound(ObjectType::Table),
        ),
        rule(
            r"(?i)invalid column (?:separator|delimiter)",
            ErrorKind::InvalidFileParams,
        ),
        rule(
            r"(?i)(?:not enough space|temp db ram limit)",
            ErrorKind::ResourceFull(ResourceKind::NoRoomInWarehouse),
        ),
        rule(
            r"(?i)Statement has been aborted due to timeout",
            ErrorKind::QueryTimeout,
        ),
        rule(r"(?i)syntax error", ErrorKind::InvalidSql),
        rule(r"(?i)not supported", ErrorKind::CommandNotSupported),
    ]
});

static TERADATA_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(
            r"\[Error 3802\]",
            ErrorKind::ObjectNotFound(ObjectType::Database),
        ),
        rule(r"\[Error 3807\]", ErrorKind::ObjectNotFound(ObjectType::Table)),
        rule(r"\[Error 3810\]", ErrorKind::InvalidColumnName),
        rule(r"\[Error 3515\]", ErrorKind::DuplicateColumnNames),
        rule(
            r"(?:\[Error 2646\]|\[Error 2644\]|No more spool space|No more room in database)",
            ErrorKind::ResourceFull(ResourceKind::NoRoomInWarehouse),
        ),
        rule(
            r"(?i)(?:\[Error 3996\]|Right truncation of string data)",
            ErrorKind::RowTooLarge,
        ),
        rule(
            r"\[Error (?:2620|2621|2665|2666)\]",
            ErrorKind::ValueConversion,
        ),
        rule(r"\[Error (?:8017|3004|3523)\]", ErrorKind::Auth),
        rule(r"\[Error (?:3706|3707)\]", ErrorKind::InvalidSql),
        rule(r"\[Error 9881\]", ErrorKind::CommandNotSupported),
    ]
});

static BIGQUERY_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(r"(?i)Not found: (?:Uris?|Files?)", ErrorKind::MandatoryFileNotFound),
        rule(
            r"(?i)Not found: Dataset",
            ErrorKind::ObjectNotFound(ObjectType::Schema),
        ),
        rule(
            r"(?i)Not found: Table",
            ErrorKind::ObjectNotFound(ObjectType::Table),
        ),
        rule(r"(?i)Unrecognized name:", ErrorKind::InvalidColumnName),
        rule(r"(?i)Duplicate column names", ErrorKind::DuplicateColumnNames),
        rule(
            r"(?i)Too many values in row|Too few columns",
            ErrorKind::ColumnsCountMismatch,
        ),
        rule(
            r"(?i)(?:Could not parse '.*' as|Bad (?:int64|double|bool) value|Invalid (?:timestamp|date))",
            ErrorKind::ValueConversion,
        ),
        rule(
            r"(?i)Row larger than the maximum allowed size",
            ErrorKind::RowTooLarge,
        ),
        rule(
            r"(?i)which cannot be inserted into column",
            ErrorKind::DataTypeMismatch,
        ),
        rule(
            r"(?i)(?:Exceeded rate limits|rateLimitExceeded|quotaExceeded)",
            ErrorKind::ResourceFull(ResourceKind::TooManyRequests),
        ),
        rule(
            r"(?i)Resources exceeded during query execution",
            ErrorKind::ResourceFull(ResourceKind::NoRoomInWarehouse),
        ),
        rule(r"(?i)Error while reading data", ErrorKind::InvalidSourceData),
        rule(r"(?i)(?:Access Denied|Permission .* denied)", ErrorKind::Auth),
        rule(r"(?i)Syntax error", ErrorKind::InvalidSql),
    ]
});

static COMMON_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(
            r"(?i)connection (?:timed out|timeout)",
            ErrorKind::ConnectionTimeout,
        ),
        rule(
            r"(?i)(?:query|statement|execution) (?:timed out|timeout)",
            ErrorKind::QueryTimeout,
        ),
        rule(
            r"(?i)(?:connection (?:refused|reset|closed|lost)|broken pipe|network is unreachable|could not connect)",
            ErrorKind::ConnectionFailed,
        ),
    ]
});

fn rules_for(backend: Backend) -> &'static [Rule] {
    match backend {
        Backend::Snowflake => SNOWFLAKE_RULES.as_slice(),
        Backend::Synapse => SYNAPSE_RULES.as_slice(),
        Backend::Exasol => EXASOL_RULES.as_slice(),
        Backend::Teradata => TERADATA_RULES.as_slice(),
        Backend::BigQuery => BIGQUERY_RULES.as_slice(),
    }
}

/// Determine the error kind of a raw diagnostic message
pub(crate) fn classify_message(backend: Backend, message: &str) -> ErrorKind {
    rules_for(backend)
        .iter()
        .chain(COMMON_RULES.iter())
        .find(|rule| rule.pattern.is_match(message))
        .map(|rule| rule.kind)
        .unwrap_or(ErrorKind::Unknown)
}

/// Translate a driver error into an [`ImportExportError`]
///
/// The diagnostic text is scrubbed of credentials before it is attached.
/// The raw driver error is deliberately not kept as the error source since
/// its display text may contain the credentials being scrubbed.
pub fn classify(backend: Backend, error: &ExecutorError, secrets: &[&str]) -> ImportExportError {
    let (kind, raw) = match error {
        ExecutorError::ConnectionTimeout(msg) => (ErrorKind::ConnectionTimeout, msg),
        ExecutorError::ConnectionFailed(msg) => match classify_message(backend, msg) {
            ErrorKind::Auth => (ErrorKind::Auth, msg),
            _ => (ErrorKind::ConnectionFailed, msg),
        },
        ExecutorError::AuthFailed(msg) => (ErrorKind::Auth, msg),
        ExecutorError::QueryTimeout(msg) => (ErrorKind::QueryTimeout, msg),
        ExecutorError::QueryFailed(msg) => (classify_message(backend, msg), msg),
    };

    ImportExportError::new(kind, sanitize(raw, secrets)).with_context("backend", backend.to_string())
}
