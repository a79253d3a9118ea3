//! The database handle.
//!
//! A [`Database`] wraps one engine connection behind a mutex. Every operation
//! that touches the engine takes the lock for its whole duration, so a handle
//! can be shared between threads (usually through the [`Registry`]).
//!
//! Failures never panic and never surface as `Err` from the main API. They
//! are logged, reported through the return value (`0`, `false`, an
//! after-last cursor) and described by [`Database::get_error`].
//!
//! [`Registry`]: crate::Registry

#![allow(clippy::result_large_err)] // Error type is defined in contentdb-core

use std::ffi::{CStr, CString, c_int};
use std::ptr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use contentdb_core::{
    ConnectionError, ConnectionErrorKind, ContentValues, Error, QueryError, QueryErrorKind,
    Result, insert_sql,
};

use crate::cursor::Cursor;
use crate::ffi;
use crate::registry::RegistryLink;
use crate::statement::{RawStatement, StepResult, error_code_to_kind};

const MEMORY_PATH: &str = ":memory:";

/// Statements `exec` refuses to run; transactions go through the dedicated
/// methods so the handle's transaction flag stays accurate.
const TRANSACTION_KEYWORDS: [&str; 3] = ["BEGIN", "COMMIT", "ROLLBACK"];

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the database file, or ":memory:" for an in-memory database.
    pub path: String,
    /// Open flags (read-only, read-write, create, etc.)
    pub flags: OpenFlags,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

/// Flags controlling how the database is opened.
///
/// Serialized threading mode is always requested on top of these, so cursors
/// can be stepped on any thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    /// Open for reading only.
    pub read_only: bool,
    /// Open for reading and writing.
    pub read_write: bool,
    /// Create the database if it doesn't exist.
    pub create: bool,
    /// Enable URI filename interpretation.
    pub uri: bool,
    /// Enable shared cache mode.
    pub shared_cache: bool,
    /// Disable shared cache mode.
    pub private_cache: bool,
}

impl OpenFlags {
    /// Create flags for read-only access.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Default::default()
        }
    }

    /// Create flags for read-write access (database must exist).
    pub fn read_write() -> Self {
        Self {
            read_write: true,
            ..Default::default()
        }
    }

    /// Create flags for read-write access with creation if needed.
    pub fn create_read_write() -> Self {
        Self {
            read_write: true,
            create: true,
            ..Default::default()
        }
    }

    fn to_sqlite_flags(self) -> c_int {
        let mut flags = ffi::SQLITE_OPEN_FULLMUTEX;

        if self.read_only {
            flags |= ffi::SQLITE_OPEN_READONLY;
        }
        if self.read_write {
            flags |= ffi::SQLITE_OPEN_READWRITE;
        }
        if self.create {
            flags |= ffi::SQLITE_OPEN_CREATE;
        }
        if self.uri {
            flags |= ffi::SQLITE_OPEN_URI;
        }
        if self.shared_cache {
            flags |= ffi::SQLITE_OPEN_SHAREDCACHE;
        }
        if self.private_cache {
            flags |= ffi::SQLITE_OPEN_PRIVATECACHE;
        }

        // Default to read-write if no mode specified
        if flags & (ffi::SQLITE_OPEN_READONLY | ffi::SQLITE_OPEN_READWRITE) == 0 {
            flags |= ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;
        }

        flags
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: MEMORY_PATH.to_string(),
            flags: OpenFlags::create_read_write(),
            busy_timeout_ms: 5000,
        }
    }
}

impl DatabaseConfig {
    /// Create a new config for a file-based database.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Create a new config for an in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Set open flags.
    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set busy timeout.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    /// True when the path names a private in-memory database rather than a
    /// file.
    pub fn is_in_memory(&self) -> bool {
        is_memory_path(&self.path)
    }
}

pub(crate) fn is_memory_path(path: &str) -> bool {
    path.is_empty() || path == MEMORY_PATH
}

/// Inner state of the handle, protected by a mutex.
struct DatabaseInner {
    /// Null when the open failed.
    db: *mut ffi::sqlite3,
    in_transaction: bool,
}

impl DatabaseInner {
    /// Refresh `in_transaction` from the engine, which can end a transaction
    /// on its own (an `ON CONFLICT ROLLBACK` constraint, or a `ROLLBACK
    /// TRANSACTION` run through `exec`).
    fn sync_transaction_state(&mut self) -> bool {
        if !self.db.is_null() {
            // SAFETY: db is live
            self.in_transaction = unsafe { ffi::sqlite3_get_autocommit(self.db) } == 0;
        }
        self.in_transaction
    }
}

// SAFETY: the connection is opened in serialized mode and every use of the
// pointer happens under the Mutex that owns this value.
unsafe impl Send for DatabaseInner {}

/// A handle to one database.
pub struct Database {
    inner: Mutex<DatabaseInner>,
    path: String,
    /// Message captured when the engine refused to open the database.
    open_error: Option<String>,
    /// Registry this handle is listed in, swept when the handle goes away.
    registry: Option<RegistryLink>,
}

impl Database {
    /// Open a database with the given configuration.
    ///
    /// This never fails. If the engine cannot open the database the handle is
    /// still returned; every operation on it then fails and
    /// [`get_error`](Self::get_error) reports why.
    #[tracing::instrument(level = "debug", skip(config), fields(path = %config.path))]
    pub fn open(config: &DatabaseConfig) -> Self {
        let (db, open_error) = match open_raw(config) {
            Ok(db) => {
                tracing::debug!("Opened database");
                (db, None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to open database");
                let message = match e {
                    Error::Connection(c) => c.message,
                    other => other.to_string(),
                };
                (ptr::null_mut(), Some(message))
            }
        };

        Self {
            inner: Mutex::new(DatabaseInner {
                db,
                in_transaction: false,
            }),
            path: config.path.clone(),
            open_error,
            registry: None,
        }
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Self {
        Self::open(&DatabaseConfig::memory())
    }

    /// Open a file-based database without going through a registry.
    pub fn open_file(path: impl Into<String>) -> Self {
        Self::open(&DatabaseConfig::file(path))
    }

    pub(crate) fn attach_registry(&mut self, link: RegistryLink) {
        self.registry = Some(link);
    }

    /// Get the database path, as given when it was opened.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_in_memory(&self) -> bool {
        is_memory_path(&self.path)
    }

    /// The message recorded when opening failed, if it did.
    pub fn open_error(&self) -> Option<&str> {
        self.open_error.as_deref()
    }

    /// Run one or more SQL statements without parameters.
    ///
    /// Returns the number of rows changed by the last statement, or `0` on
    /// failure. `BEGIN`, `COMMIT` and `ROLLBACK` on their own are ignored;
    /// use the transaction methods instead.
    pub fn exec(&self, sql: &str) -> usize {
        match self.try_exec(sql) {
            Ok(changes) => changes,
            Err(e) => {
                tracing::warn!(sql = %sql, error = %e, "exec failed");
                0
            }
        }
    }

    /// Like [`exec`](Self::exec), but hands the failure back to the caller.
    pub fn try_exec(&self, sql: &str) -> Result<usize> {
        if is_transaction_keyword(sql) {
            tracing::debug!(sql = %sql, "Ignoring transaction statement passed to exec");
            return Ok(0);
        }

        let mut inner = self.lock();
        let db = self.live(&inner)?;
        let result = exec_raw(db, sql);
        inner.sync_transaction_state();
        result?;
        // SAFETY: db is live
        Ok(usize::try_from(unsafe { ffi::sqlite3_changes(db) }).unwrap_or(0))
    }

    /// Insert one row into `table` from `values`.
    ///
    /// Columns are the container's keys; each value is bound with its own
    /// type. Returns `false` without touching the database when `values` is
    /// empty, and `false` when the statement fails to prepare, bind or run.
    pub fn insert(&self, table: &str, values: &ContentValues) -> bool {
        if values.is_empty() {
            tracing::debug!(table = %table, "Refusing insert of empty values");
            return false;
        }

        let mut inner = self.lock();
        let result = self
            .live(&inner)
            .and_then(|db| insert_raw(db, table, values));
        inner.sync_transaction_state();
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "insert failed");
                false
            }
        }
    }

    /// Prepare `sql` and return a cursor over its rows.
    ///
    /// The statement is not run until the cursor is moved. A statement that
    /// fails to prepare yields a cursor that is already after-last.
    pub fn query(&self, sql: &str) -> Cursor {
        self.query_with_args::<&str>(sql, &[])
    }

    /// Prepare `sql`, bind each of `args` as text to positions `1..=N`, and
    /// return a cursor over its rows.
    pub fn query_with_args<S: AsRef<str>>(&self, sql: &str, args: &[S]) -> Cursor {
        let inner = self.lock();
        let result = self.live(&inner).and_then(|db| {
            let stmt = RawStatement::prepare(db, sql)?;
            stmt.bind_text_args(args)?;
            Ok(stmt)
        });
        match result {
            Ok(stmt) => Cursor::new(stmt),
            Err(e) => {
                tracing::warn!(sql = %sql, error = %e, "query failed");
                Cursor::failed()
            }
        }
    }

    /// The engine's most recent error message, or `""` when the last
    /// operation succeeded.
    ///
    /// A handle that failed to open keeps reporting the open failure.
    pub fn get_error(&self) -> String {
        if let Some(message) = &self.open_error {
            return message.clone();
        }
        let inner = self.lock();
        if inner.db.is_null() {
            return String::new();
        }
        // SAFETY: db is live
        let (code, message) = unsafe { (ffi::sqlite3_errcode(inner.db), ffi::errmsg(inner.db)) };
        // A successful step leaves ROW or DONE as the connection's code.
        let succeeded = matches!(code, ffi::SQLITE_OK | ffi::SQLITE_ROW | ffi::SQLITE_DONE);
        if succeeded || message == "not an error" || message == "unknown error" {
            String::new()
        } else {
            message
        }
    }

    /// Start a transaction. Does nothing if one is already open.
    pub fn begin_transaction(&self) {
        self.transition("BEGIN", false);
    }

    /// Commit the open transaction. Does nothing if none is open.
    pub fn commit_transaction(&self) {
        self.transition("COMMIT", true);
    }

    /// Roll back the open transaction. Does nothing if none is open.
    pub fn rollback_transaction(&self) {
        self.transition("ROLLBACK", true);
    }

    pub fn is_in_transaction(&self) -> bool {
        self.lock().sync_transaction_state()
    }

    /// Get the last insert rowid.
    pub fn last_insert_rowid(&self) -> i64 {
        let inner = self.lock();
        if inner.db.is_null() {
            return 0;
        }
        // SAFETY: db is live
        unsafe { ffi::sqlite3_last_insert_rowid(inner.db) }
    }

    /// Get the number of rows changed by the last statement.
    pub fn changes(&self) -> usize {
        let inner = self.lock();
        if inner.db.is_null() {
            return 0;
        }
        // SAFETY: db is live
        usize::try_from(unsafe { ffi::sqlite3_changes(inner.db) }).unwrap_or(0)
    }

    /// Run `sql` only when the engine's transaction state equals `from`.
    fn transition(&self, sql: &str, from: bool) {
        let mut inner = self.lock();
        if inner.sync_transaction_state() != from {
            return;
        }
        let result = self.live(&inner).and_then(|db| exec_raw(db, sql));
        let in_transaction = inner.sync_transaction_state();
        match result {
            Ok(()) => {
                tracing::info!(path = %self.path, statement = sql, in_transaction, "Transaction");
            }
            Err(e) => {
                tracing::warn!(path = %self.path, statement = sql, in_transaction, error = %e, "Transaction statement failed");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, DatabaseInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn live(&self, inner: &DatabaseInner) -> Result<*mut ffi::sqlite3> {
        if inner.db.is_null() {
            Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::NotOpen,
                path: Some(self.path.clone()),
                message: self
                    .open_error
                    .clone()
                    .unwrap_or_else(|| "Database is not open".to_string()),
            }))
        } else {
            Ok(inner.db)
        }
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if !inner.db.is_null() {
            // SAFETY: db is valid and owned. close_v2 defers the close until
            // outstanding cursors have finalized their statements.
            unsafe {
                ffi::sqlite3_close_v2(inner.db);
            }
            inner.db = ptr::null_mut();
            tracing::debug!(path = %self.path, "Closed database");
        }
        if let Some(link) = &self.registry {
            link.sweep();
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("open_error", &self.open_error)
            .finish_non_exhaustive()
    }
}

fn is_transaction_keyword(sql: &str) -> bool {
    let trimmed = sql.trim();
    TRANSACTION_KEYWORDS
        .iter()
        .any(|keyword| trimmed.eq_ignore_ascii_case(keyword))
}

fn open_raw(config: &DatabaseConfig) -> Result<*mut ffi::sqlite3> {
    let c_path = CString::new(config.path.as_str()).map_err(|_| {
        Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::InvalidPath,
            path: Some(config.path.clone()),
            message: "Invalid path: contains null byte".to_string(),
        })
    })?;

    let mut db: *mut ffi::sqlite3 = ptr::null_mut();
    let flags = config.flags.to_sqlite_flags();

    // SAFETY: We pass valid pointers and check the return value
    let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &raw mut db, flags, ptr::null()) };

    if rc != ffi::SQLITE_OK {
        let message = if db.is_null() {
            ffi::error_string(rc).to_string()
        } else {
            // SAFETY: db is a handle in an error state; it must still be closed
            unsafe {
                let msg = ffi::errmsg(db);
                ffi::sqlite3_close_v2(db);
                msg
            }
        };

        return Err(Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::Open,
            path: Some(config.path.clone()),
            message,
        }));
    }

    if config.busy_timeout_ms > 0 {
        let ms = c_int::try_from(config.busy_timeout_ms).unwrap_or(c_int::MAX);
        // SAFETY: db is valid
        unsafe {
            ffi::sqlite3_busy_timeout(db, ms);
        }
    }

    Ok(db)
}

/// Run `sql` through `sqlite3_exec`. The caller holds the handle lock.
fn exec_raw(db: *mut ffi::sqlite3, sql: &str) -> Result<()> {
    let c_sql = CString::new(sql).map_err(|_| {
        Error::Query(QueryError {
            kind: QueryErrorKind::Prepare,
            sql: Some(sql.to_string()),
            code: None,
            message: "SQL contains null byte".to_string(),
        })
    })?;

    tracing::trace!(sql = %sql, "exec");
    let mut errmsg: *mut std::ffi::c_char = ptr::null_mut();

    // SAFETY: All pointers are valid
    let rc = unsafe {
        ffi::sqlite3_exec(db, c_sql.as_ptr(), None, ptr::null_mut(), &raw mut errmsg)
    };

    if rc != ffi::SQLITE_OK {
        let message = if errmsg.is_null() {
            ffi::error_string(rc).to_string()
        } else {
            // SAFETY: errmsg is a valid string allocated by SQLite
            unsafe {
                let msg = CStr::from_ptr(errmsg).to_string_lossy().into_owned();
                ffi::sqlite3_free(errmsg.cast());
                msg
            }
        };

        return Err(Error::Query(QueryError {
            kind: error_code_to_kind(rc),
            sql: Some(sql.to_string()),
            code: Some(rc),
            message,
        }));
    }

    Ok(())
}

/// Insert `values` as one row. The caller holds the handle lock and has
/// checked that `values` is not empty.
fn insert_raw(db: *mut ffi::sqlite3, table: &str, values: &ContentValues) -> Result<()> {
    let keys = values.keys();
    let sql = insert_sql(table, &keys)
        .ok_or_else(|| Error::Custom("INSERT needs at least one column".to_string()))?;

    let stmt = RawStatement::prepare(db, &sql)?;
    for (i, (_, value)) in values.iter().enumerate() {
        // Unbound placeholders are NULL.
        if value.is_null() {
            continue;
        }
        stmt.bind_value(i + 1, value)?;
    }
    step_to_done(&stmt)
}

/// Run a statement that must finish in one step without yielding a row.
fn step_to_done(stmt: &RawStatement) -> Result<()> {
    match stmt.step()? {
        StepResult::Done => Ok(()),
        StepResult::Row => Err(Error::Query(QueryError {
            kind: QueryErrorKind::Database,
            sql: Some(stmt.sql().to_string()),
            code: Some(ffi::SQLITE_ROW),
            message: "statement produced a result row".to_string(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Database {
        let db = Database::open_in_memory();
        db.try_exec("CREATE TABLE t (x INTEGER, y TEXT, z BLOB)")
            .unwrap();
        db
    }

    fn count(db: &Database) -> i64 {
        let mut cursor = db.query("SELECT COUNT(*) FROM t");
        assert!(cursor.move_to_first());
        cursor.get_int(0)
    }

    #[test]
    fn test_open_memory() {
        let db = Database::open_in_memory();
        assert_eq!(db.path(), ":memory:");
        assert!(db.is_in_memory());
        assert!(db.open_error().is_none());
        assert_eq!(db.get_error(), "");
    }

    #[test]
    fn test_exec_returns_changes() {
        let db = table();
        assert_eq!(db.exec("INSERT INTO t (x) VALUES (1), (2), (3)"), 3);
        assert_eq!(db.changes(), 3);
        assert_eq!(db.exec("UPDATE t SET y = 'a' WHERE x > 1"), 2);
        assert_eq!(db.last_insert_rowid(), 3);
    }

    #[test]
    fn test_exec_failure_reports_error() {
        let db = table();
        assert_eq!(db.exec("INSERT INTO nope VALUES (1)"), 0);
        assert!(db.get_error().contains("no such table"));

        let err = db.try_exec("SELEC 1").unwrap_err();
        assert!(err.sql().is_some());
    }

    #[test]
    fn test_exec_ignores_transaction_keywords() {
        let db = table();
        assert_eq!(db.exec("BEGIN"), 0);
        assert_eq!(db.exec("  begin  "), 0);
        assert_eq!(db.exec("Commit"), 0);
        assert_eq!(db.exec("ROLLBACK\n"), 0);
        assert!(!db.is_in_transaction());

        // Not a bare keyword, so it runs.
        db.exec("BEGIN TRANSACTION");
        assert!(db.get_error().is_empty());
        db.exec("COMMIT TRANSACTION");
        assert!(db.get_error().is_empty());
    }

    #[test]
    fn test_insert_binds_by_type() {
        let db = table();
        let mut values = ContentValues::new();
        values.put_integer("x", 1970);
        values.put_string("y", "seven");
        values.put_blob("z", b"blob".to_vec());
        assert!(db.insert("t", &values));
        assert_eq!(db.get_error(), "");

        let mut cursor = db.query("SELECT typeof(x), typeof(y), typeof(z) FROM t");
        assert!(cursor.move_to_first());
        assert_eq!(cursor.get_string(0), "integer");
        assert_eq!(cursor.get_string(1), "text");
        assert_eq!(cursor.get_string(2), "blob");
    }

    #[test]
    fn test_insert_empty_values() {
        let db = table();
        assert!(!db.insert("t", &ContentValues::new()));
        assert_eq!(count(&db), 0);
    }

    #[test]
    fn test_insert_null_leaves_column_null() {
        let db = table();
        let mut values = ContentValues::new();
        values.put_null("x");
        values.put_string("y", "only y");
        assert!(db.insert("t", &values));

        let mut cursor = db.query("SELECT x, y FROM t");
        assert!(cursor.move_to_first());
        assert!(cursor.is_null(0));
        assert_eq!(cursor.get_string(1), "only y");
    }

    #[test]
    fn test_insert_unknown_column_fails() {
        let db = table();
        let mut values = ContentValues::new();
        values.put_integer("missing", 1);
        assert!(!db.insert("t", &values));
        assert!(db.get_error().contains("missing"));
        assert_eq!(count(&db), 0);
    }

    #[test]
    fn test_insert_quotes_identifiers() {
        let db = Database::open_in_memory();
        db.try_exec("CREATE TABLE \"order\" (\"select\" INTEGER, \"two words\" TEXT)")
            .unwrap();
        let mut values = ContentValues::new();
        values.put_integer("select", 7);
        values.put_string("two words", "ok");
        assert!(db.insert("order", &values));
    }

    #[test]
    fn test_insert_constraint_violation() {
        let db = Database::open_in_memory();
        db.try_exec("CREATE TABLE u (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
            .unwrap();
        let mut values = ContentValues::new();
        values.put_integer("id", 1);
        assert!(!db.insert("u", &values));
        assert!(db.get_error().contains("NOT NULL"));
    }

    #[test]
    fn test_query_with_args() {
        let db = table();
        db.exec("INSERT INTO t (x, y) VALUES (1, 'one'), (2, 'two')");

        let mut cursor = db.query_with_args("SELECT y FROM t WHERE x = ?", &["2"]);
        assert!(cursor.move_to_first());
        assert_eq!(cursor.get_string(0), "two");
        assert!(!cursor.move_to_next());
        assert!(cursor.is_after_last());
    }

    #[test]
    fn test_query_with_too_many_args() {
        let db = table();
        let mut cursor = db.query_with_args("SELECT 1", &["unused"]);
        assert!(cursor.is_after_last());
        assert!(!cursor.move_to_first());
    }

    #[test]
    fn test_transaction() {
        let db = table();

        db.begin_transaction();
        assert!(db.is_in_transaction());
        db.exec("INSERT INTO t (x) VALUES (1)");
        db.rollback_transaction();
        assert!(!db.is_in_transaction());
        assert_eq!(count(&db), 0);

        db.begin_transaction();
        db.begin_transaction();
        db.exec("INSERT INTO t (x) VALUES (2)");
        db.commit_transaction();
        db.commit_transaction();
        assert!(!db.is_in_transaction());
        assert_eq!(count(&db), 1);
        assert_eq!(db.get_error(), "");
    }

    #[test]
    fn test_transaction_state_follows_engine() {
        let db = table();
        db.begin_transaction();
        db.exec("INSERT INTO t (x) VALUES (1)");

        // Not a bare keyword, so it reaches the engine.
        db.exec("ROLLBACK TRANSACTION");
        assert!(!db.is_in_transaction());
        assert_eq!(count(&db), 0);

        db.begin_transaction();
        assert!(db.is_in_transaction());
        db.exec("INSERT INTO t (x) VALUES (2)");
        db.rollback_transaction();
        assert!(!db.is_in_transaction());
        assert_eq!(count(&db), 0);
        assert_eq!(db.get_error(), "");
    }

    #[test]
    fn test_step_to_done_rejects_row() {
        let db = table();
        let inner = db.lock();
        let stmt = RawStatement::prepare(inner.db, "SELECT 1").unwrap();
        let err = step_to_done(&stmt).unwrap_err();
        assert_eq!(err.sql(), Some("SELECT 1"));

        let stmt = RawStatement::prepare(inner.db, "INSERT INTO t (x) VALUES (1)").unwrap();
        assert!(step_to_done(&stmt).is_ok());
    }

    #[test]
    fn test_commit_without_transaction_is_noop() {
        let db = table();
        db.commit_transaction();
        db.rollback_transaction();
        assert!(!db.is_in_transaction());
        assert_eq!(db.get_error(), "");
    }

    #[test]
    fn test_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("db.sqlite");
        let db = Database::open_file(path.to_string_lossy().to_string());

        let message = db.open_error().unwrap().to_string();
        assert!(!message.is_empty());
        assert_eq!(db.get_error(), message);

        assert_eq!(db.exec("CREATE TABLE t (x)"), 0);
        assert!(!db.insert("t", &std::iter::once(("x", 1)).collect()));
        assert!(db.query("SELECT 1").is_after_last());
        db.begin_transaction();
        assert!(!db.is_in_transaction());
        assert_eq!(db.get_error(), message);
    }

    #[test]
    fn test_open_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.db").to_string_lossy().to_string();

        let db = Database::open(&DatabaseConfig::file(&path).flags(OpenFlags::create_read_write()));
        db.try_exec("CREATE TABLE test (id INTEGER)").unwrap();
        drop(db);

        let db = Database::open(&DatabaseConfig::file(&path).flags(OpenFlags::read_only()));
        assert!(db.open_error().is_none());

        // Reading should work
        let mut cursor = db.query("SELECT * FROM test");
        assert!(!cursor.move_to_first());
        assert_eq!(db.get_error(), "");

        // Writing should fail
        let err = db.try_exec("INSERT INTO test VALUES (1)").unwrap_err();
        assert!(matches!(
            err,
            Error::Query(QueryError {
                kind: QueryErrorKind::Permission,
                ..
            })
        ));
    }

    #[test]
    fn test_read_write_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db").to_string_lossy().to_string();
        let db = Database::open(&DatabaseConfig::file(path).flags(OpenFlags::read_write()));
        assert!(db.open_error().is_some());
    }

    #[test]
    fn test_shared_between_threads() {
        let db = table();
        std::thread::scope(|s| {
            for i in 0..8 {
                let db = &db;
                s.spawn(move || {
                    let mut values = ContentValues::new();
                    values.put_integer("x", i);
                    assert!(db.insert("t", &values));
                });
            }
        });
        assert_eq!(count(&db), 8);
    }

    #[test]
    fn test_transaction_keyword_detection() {
        assert!(is_transaction_keyword("begin"));
        assert!(is_transaction_keyword(" ROLLBACK "));
        assert!(!is_transaction_keyword("BEGIN;"));
        assert!(!is_transaction_keyword("SELECT 'BEGIN'"));
    }
}
