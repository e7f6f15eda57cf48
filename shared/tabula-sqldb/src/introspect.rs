//! Catalog introspection queries

/// Base tables of one schema, by name
pub(crate) const LIST_TABLES_SQL: &str = "
    SELECT c.relname::text
    FROM pg_catalog.pg_class c
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1
      AND c.relkind IN ('r', 'p')
    ORDER BY c.relname
";

/// Columns of one table in ordinal order, with a `PRI` / `MUL` / '' key flag.
///
/// `PRI` marks primary-key columns. `MUL` marks columns that sit in any other
/// index or in a foreign-key constraint.
pub(crate) const DESCRIBE_TABLE_SQL: &str = "
    SELECT
        a.attname::text AS column_name,
        pg_catalog.format_type(a.atttypid, a.atttypmod) AS column_type,
        CASE
            WHEN EXISTS (
                SELECT 1 FROM pg_catalog.pg_index i
                WHERE i.indrelid = a.attrelid
                  AND i.indisprimary
                  AND a.attnum = ANY (i.indkey)
            ) THEN 'PRI'
            WHEN EXISTS (
                SELECT 1 FROM pg_catalog.pg_index i
                WHERE i.indrelid = a.attrelid
                  AND a.attnum = ANY (i.indkey)
            ) OR EXISTS (
                SELECT 1 FROM pg_catalog.pg_constraint k
                WHERE k.conrelid = a.attrelid
                  AND k.contype = 'f'
                  AND a.attnum = ANY (k.conkey)
            ) THEN 'MUL'
            ELSE ''
        END AS column_key
    FROM pg_catalog.pg_attribute a
    JOIN pg_catalog.pg_class t ON t.oid = a.attrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    WHERE n.nspname = $1
      AND t.relname = $2
      AND a.attnum > 0
      AND NOT a.attisdropped
    ORDER BY a.attnum
";

pub(crate) const PING_SQL: &str = "SELECT 1";

/// Double-quote an identifier for interpolation into generated statements
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
