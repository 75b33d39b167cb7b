//! Statement shapes shared across dialects
//!
//! Every function here renders SQL that is identical between backends apart
//! from quoting. Dialect-specific statements live in the backend adapters.

use super::{Dialect, TableRef};

/// Alias of the target table in MERGE statements
pub const TARGET_ALIAS: &str = "dest";
/// Alias of the source table in MERGE and UPDATE .. FROM statements
pub const SOURCE_ALIAS: &str = "src";
/// Alias of derived tables wrapping a user query
pub const QUERY_ALIAS: &str = "_source";
/// Window column used while deduplicating
pub const ROW_NUMBER_COLUMN: &str = "_row_number_";
/// Auto-numbered staging column recording the order rows were loaded in
pub const LOAD_SEQUENCE_COLUMN: &str = "_load_seq_";

/// `CREATE TABLE t (c1 T1, c2 T2)` with a dialect-specific prefix and suffix
pub fn create_table(
    dialect: Dialect,
    prefix: &str,
    table: &TableRef,
    columns: &[(String, String)],
    suffix: &str,
) -> String {
    let definitions = columns
        .iter()
        .map(|(name, data_type)| format!("{} {}", dialect.quote_identifier(name), data_type))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} {} ({}){}", prefix, table.quoted(dialect), definitions, suffix)
}

/// `INSERT INTO target (cols) SELECT exprs FROM from`
pub fn insert_select<S: AsRef<str>>(
    dialect: Dialect,
    target: &TableRef,
    columns: &[S],
    expressions: &[String],
    from: &str,
) -> String {
    format!(
        "INSERT INTO {} ({}) SELECT {} FROM {}",
        target.quoted(dialect),
        dialect.quote_column_list(columns),
        expressions.join(", "),
        from
    )
}

/// `SELECT COUNT(*) AS "count" FROM table`
pub fn count_rows(dialect: Dialect, table: &TableRef) -> String {
    format!(
        "SELECT COUNT(*) AS {} FROM {}",
        dialect.quote_identifier("count"),
        table.quoted(dialect)
    )
}

/// Turn any of `null_values` into SQL NULL
///
/// A single marker renders as `NULLIF`, several as a `CASE` expression.
pub fn null_conversion(dialect: Dialect, expression: &str, null_values: &[String]) -> String {
    match null_values {
        [] => expression.to_string(),
        [single] => format!("NULLIF({}, {})", expression, dialect.quote(single)),
        many => {
            let literals = many
                .iter()
                .map(|value| dialect.quote(value))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "CASE WHEN {} IN ({}) THEN NULL ELSE {} END",
                expression, literals, expression
            )
        }
    }
}

/// Copy one row per primary key from `source` into `target`
///
/// `order_by` ranks the rows of a key group, first row wins; items are
/// rendered expressions such as `"_load_seq_" DESC`. Without a ranking the
/// winner of a group is whichever row the backend numbers first.
pub fn deduplicate<S: AsRef<str>>(
    dialect: Dialect,
    source: &TableRef,
    target: &TableRef,
    columns: &[S],
    primary_keys: &[String],
    order_by: &[String],
) -> String {
    let column_list = dialect.quote_column_list(columns);
    let partition = dialect.quote_column_list(primary_keys);
    let order = if order_by.is_empty() {
        partition.clone()
    } else {
        order_by.join(", ")
    };
    let row_number = dialect.quote_identifier(ROW_NUMBER_COLUMN);

    format!(
        "INSERT INTO {target} ({cols}) SELECT {cols} FROM (SELECT {cols}, ROW_NUMBER() OVER (PARTITION BY {partition} ORDER BY {order}) AS {rn} FROM {source}) AS {alias} WHERE {rn} = 1",
        target = target.quoted(dialect),
        cols = column_list,
        partition = partition,
        order = order,
        rn = row_number,
        source = source.quoted(dialect),
        alias = dialect.quote_identifier(QUERY_ALIAS),
    )
}

/// Inputs of a key-based upsert
pub struct MergeSpec<'a> {
    pub dialect: Dialect,
    pub target: &'a TableRef,
    pub source: &'a TableRef,
    pub primary_keys: &'a [String],
    /// Destination column and the value expression written into it;
    /// expressions reference the [`SOURCE_ALIAS`] table
    pub assignments: &'a [(String, String)],
    /// Whether table aliases are introduced with `AS`
    pub alias_keyword: bool,
}

/// `MERGE INTO .. USING .. ON pk WHEN MATCHED .. WHEN NOT MATCHED ..`
///
/// The `WHEN MATCHED` branch is omitted when every column is a key column.
pub fn merge(spec: &MergeSpec<'_>) -> String {
    let dialect = spec.dialect;
    let alias = |name: &str| {
        if spec.alias_keyword {
            format!("AS {}", dialect.quote_identifier(name))
        } else {
            dialect.quote_identifier(name)
        }
    };
    let target_alias = dialect.quote_identifier(TARGET_ALIAS);
    let source_alias = dialect.quote_identifier(SOURCE_ALIAS);

    let on = spec
        .primary_keys
        .iter()
        .map(|pk| {
            let pk = dialect.quote_identifier(pk);
            format!("{}.{} = {}.{}", target_alias, pk, source_alias, pk)
        })
        .collect::<Vec<_>>()
        .join(" AND ");

    let updates: Vec<String> = spec
        .assignments
        .iter()
        .filter(|(column, _)| !spec.primary_keys.contains(column))
        .map(|(column, value)| format!("{} = {}", dialect.quote_identifier(column), value))
        .collect();

    let insert_columns: Vec<&str> = spec.assignments.iter().map(|(c, _)| c.as_str()).collect();
    let insert_values: Vec<&str> = spec.assignments.iter().map(|(_, v)| v.as_str()).collect();

    let mut sql = format!(
        "MERGE INTO {} {} USING {} {} ON {}",
        spec.target.quoted(dialect),
        alias(TARGET_ALIAS),
        spec.source.quoted(dialect),
        alias(SOURCE_ALIAS),
        on
    );
    if !updates.is_empty() {
        sql.push_str(" WHEN MATCHED THEN UPDATE SET ");
        sql.push_str(&updates.join(", "));
    }
    sql.push_str(&format!(
        " WHEN NOT MATCHED THEN INSERT ({}) VALUES ({})",
        dialect.quote_column_list(&insert_columns),
        insert_values.join(", ")
    ));
    sql
}
