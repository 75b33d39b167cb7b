//! CSV format options of load statements
//!
//! Every backend renders the same decision with its own keywords:
//!
//! 1. the field delimiter, always
//! 2. the header skip, only when lines are ignored
//! 3. the enclosure when set (turning off unenclosed escaping where the
//!    dialect has such an option), else the unenclosed escape when set,
//!    else nothing
//!
//! Enclosure wins when both enclosure and escape are set.

use crate::error::{ErrorKind, ImportExportError, ImportExportResult};
use crate::models::CsvOptions;
use crate::sql::Dialect;

/// Keywords a backend uses for CSV format options
#[derive(Debug, Clone, Copy)]
pub struct CopyOptionsSyntax {
    pub dialect: Dialect,
    pub delimiter: &'static str,
    pub skip_header: &'static str,
    /// Skip is expressed as the first row to read (1-based) instead of a count
    pub skip_is_first_row: bool,
    pub enclosure: &'static str,
    /// Rendered verbatim next to the enclosure
    pub disable_unenclosed_escape: Option<&'static str>,
    /// Keyword of the unenclosed escape option; `None` when unsupported
    pub unenclosed_escape: Option<&'static str>,
    /// Separator between keyword and value, `" = "` or `"="`
    pub assign: &'static str,
}

impl CopyOptionsSyntax {
    fn render(&self, keyword: &str, value: &str) -> String {
        format!("{}{}{}", keyword, self.assign, value)
    }
}

/// String literal inside a format option
///
/// Backslash-escaping dialects escape only `\` and `'`, so an enclosure of
/// `"` is written as `'"'`.
pub(crate) fn option_literal(dialect: Dialect, value: &str) -> String {
    match dialect {
        Dialect::Snowflake | Dialect::BigQuery => {
            format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
        }
        _ => format!("'{}'", value.replace('\'', "''")),
    }
}

/// Render the CSV format options of a load statement
pub fn build_copy_options(
    syntax: &CopyOptionsSyntax,
    csv: &CsvOptions,
    ignored_lines: u32,
) -> ImportExportResult<Vec<String>> {
    let mut options = vec![syntax.render(
        syntax.delimiter,
        &option_literal(syntax.dialect, csv.delimiter()),
    )];

    if ignored_lines > 0 {
        let value = if syntax.skip_is_first_row {
            ignored_lines + 1
        } else {
            ignored_lines
        };
        options.push(syntax.render(syntax.skip_header, &value.to_string()));
    }

    if let Some(enclosure) = csv.enclosure() {
        options.push(syntax.render(
            syntax.enclosure,
            &option_literal(syntax.dialect, enclosure),
        ));
        if let Some(disable) = syntax.disable_unenclosed_escape {
            options.push(disable.to_string());
        }
    } else if let Some(escape) = csv.escape() {
        let keyword = syntax.unenclosed_escape.ok_or_else(|| {
            ImportExportError::new(
                ErrorKind::InvalidFileParams,
                format!(
                    "Escape character {:?} without enclosure is not supported by {}",
                    escape, syntax.dialect
                ),
            )
            .with_context("escape", escape)
        })?;
        options.push(syntax.render(keyword, &option_literal(syntax.dialect, escape)));
    }

    Ok(options)
}
