//! Per-dialect string literal and identifier quoting
//!
//! | Dialect | String | Identifier | Escaping |
//! |---|---|---|---|
//! | Snowflake, BigQuery | `'...'` | `"..."` / `` `...` `` | backslash (`addslashes`) in literals |
//! | Exasol, Teradata, Redshift | `'...'` | `"..."` | doubled quotes |
//! | Synapse | `'...'` | `[...]` | doubled `''`, doubled `]]` |
//!
//! Identifiers always double embedded closing-quote characters.

use serde::{Deserialize, Serialize};

/// SQL dialect used to render literals and identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Snowflake,
    BigQuery,
    Exasol,
    Teradata,
    Redshift,
    Synapse,
}

impl Dialect {
    /// Quote a string literal
    pub fn quote(&self, value: &str) -> String {
        match self {
            Dialect::Snowflake | Dialect::BigQuery => format!("'{}'", addslashes(value)),
            Dialect::Exasol | Dialect::Teradata | Dialect::Redshift | Dialect::Synapse => {
                format!("'{}'", value.replace('\'', "''"))
            }
        }
    }

    /// Opening and closing identifier delimiters
    pub fn identifier_delimiters(&self) -> (char, char) {
        match self {
            Dialect::BigQuery => ('`', '`'),
            Dialect::Synapse => ('[', ']'),
            _ => ('"', '"'),
        }
    }

    /// Quote a single identifier
    pub fn quote_identifier(&self, name: &str) -> String {
        let (open, close) = self.identifier_delimiters();
        let doubled: String = [close, close].iter().collect();
        format!("{}{}{}", open, name.replace(close, &doubled), close)
    }

    /// Reverse [`Dialect::quote_identifier`]
    ///
    /// Input without surrounding delimiters is returned unchanged.
    pub fn unquote_identifier(&self, quoted: &str) -> String {
        let (open, close) = self.identifier_delimiters();
        let inner = quoted
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close));
        match inner {
            Some(inner) => {
                let doubled: String = [close, close].iter().collect();
                inner.replace(&doubled, &close.to_string())
            }
            None => quoted.to_string(),
        }
    }

    /// Quote each name and join them with `, `
    pub fn quote_column_list<S: AsRef<str>>(&self, names: &[S]) -> String {
        names
            .iter()
            .map(|name| self.quote_identifier(name.as_ref()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Quote each name prefixed by a quoted table alias
    pub fn quote_prefixed_column_list<S: AsRef<str>>(&self, alias: &str, names: &[S]) -> String {
        let alias = self.quote_identifier(alias);
        names
            .iter()
            .map(|name| format!("{}.{}", alias, self.quote_identifier(name.as_ref())))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Snowflake => write!(f, "snowflake"),
            Dialect::BigQuery => write!(f, "bigquery"),
            Dialect::Exasol => write!(f, "exasol"),
            Dialect::Teradata => write!(f, "teradata"),
            Dialect::Redshift => write!(f, "redshift"),
            Dialect::Synapse => write!(f, "synapse"),
        }
    }
}

/// Backslash-escape quotes, backslashes and NUL bytes
fn addslashes(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\'' | '"' | '\\' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            '\0' => escaped.push_str("\\0"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Dialect; 6] = [
        Dialect::Snowflake,
        Dialect::BigQuery,
        Dialect::Exasol,
        Dialect::Teradata,
        Dialect::Redshift,
        Dialect::Synapse,
    ];

    #[test]
    fn test_quote_literals() {
        assert_eq!(Dialect::Snowflake.quote("it's"), r"'it\'s'");
        assert_eq!(Dialect::Snowflake.quote(r"a\b"), r"'a\\b'");
        assert_eq!(Dialect::BigQuery.quote("\"x\""), r#"'\"x\"'"#);
        assert_eq!(Dialect::Exasol.quote("it's"), "'it''s'");
        assert_eq!(Dialect::Teradata.quote("a\\b"), "'a\\b'");
        assert_eq!(Dialect::Synapse.quote("it's"), "'it''s'");
    }

    #[test]
    fn test_quote_identifiers() {
        assert_eq!(Dialect::Snowflake.quote_identifier("col"), "\"col\"");
        assert_eq!(Dialect::Exasol.quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(Dialect::BigQuery.quote_identifier("col"), "`col`");
        assert_eq!(Dialect::Synapse.quote_identifier("a]b"), "[a]]b]");
        assert_eq!(Dialect::Synapse.quote_identifier("#tmp"), "[#tmp]");
    }

    #[test]
    fn test_unquote_is_left_inverse() {
        let samples = ["plain", "with space", "a\"b", "x]y", "`tick`", "", "ünïcode"];
        for dialect in ALL {
            for sample in samples {
                let quoted = dialect.quote_identifier(sample);
                assert_eq!(
                    dialect.unquote_identifier(&quoted),
                    sample,
                    "{} failed for {:?}",
                    dialect,
                    sample
                );
            }
        }
    }

    #[test]
    fn test_unquote_passthrough() {
        assert_eq!(Dialect::Snowflake.unquote_identifier("bare"), "bare");
    }

    #[test]
    fn test_column_lists() {
        let cols = vec!["col1".to_string(), "col2".to_string()];
        assert_eq!(
            Dialect::Snowflake.quote_column_list(&cols),
            "\"col1\", \"col2\""
        );
        assert_eq!(
            Dialect::Synapse.quote_prefixed_column_list("src", &cols),
            "[src].[col1], [src].[col2]"
        );
    }
}
