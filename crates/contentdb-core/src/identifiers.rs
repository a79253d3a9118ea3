//! SQL identifier quoting.

/// Quote a SQL identifier using ANSI double-quoting.
///
/// Embedded double-quotes are escaped by doubling them (`"` → `""`), so any
/// table or column name can be spliced into generated SQL.
///
/// # Examples
///
/// ```
/// use contentdb_core::quote_ident;
///
/// assert_eq!(quote_ident("users"), "\"users\"");
/// assert_eq!(quote_ident("user\"name"), "\"user\"\"name\"");
/// ```
#[inline]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Build `INSERT INTO "table" ("c1","c2") VALUES (?,?)` for `columns`.
///
/// Returns `None` when `columns` is empty; an INSERT needs at least one
/// column.
pub fn insert_sql<S: AsRef<str>>(table: &str, columns: &[S]) -> Option<String> {
    if columns.is_empty() {
        return None;
    }
    let names: Vec<String> = columns.iter().map(|c| quote_ident(c.as_ref())).collect();
    let placeholders = vec!["?"; columns.len()].join(",");
    Some(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(","),
        placeholders
    ))
}
