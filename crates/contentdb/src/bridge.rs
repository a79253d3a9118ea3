//! Id-based surface for a foreign host runtime.
//!
//! A host that cannot hold Rust values directly (a VM behind an FFI layer,
//! for example) talks to [`Bridge`] with integer ids. The bridge keeps the
//! actual `Database` and `Cursor` objects in [`HandleTable`]s and never hands
//! out addresses. Ids are non-zero and never reused, so a stale id from the
//! host is simply unknown rather than aliasing a newer object.
//!
//! Unknown ids are logged and answered with the failure value of the call
//! (`0`, `false`, empty).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contentdb_core::ContentValues;
use contentdb_sqlite::{Cursor, Database, Registry};

/// Owned objects addressed by opaque integer ids.
#[derive(Debug)]
pub struct HandleTable<T> {
    next_id: u64,
    entries: HashMap<u64, T>,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            entries: HashMap::new(),
        }
    }
}

impl<T> HandleTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` and return its id. Ids start at 1.
    pub fn insert(&mut self, value: T) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, value);
        id
    }

    pub fn get(&self, id: u64) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    pub fn remove(&mut self, id: u64) -> Option<T> {
        self.entries.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A dynamically typed value as the host runtime hands it over.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    ByteArray(Vec<u8>),
    /// Any host type with no column mapping; skipped on insert.
    Unknown,
}

impl HostValue {
    /// Store this value under `key` with the matching column type.
    pub fn put_into(&self, key: &str, values: &mut ContentValues) {
        match self {
            HostValue::Int(v) => values.put_integer(key, i64::from(*v)),
            HostValue::Long(v) => values.put_integer(key, *v),
            HostValue::Float(v) => values.put_real(key, f64::from(*v)),
            HostValue::Double(v) => values.put_real(key, *v),
            HostValue::String(v) => values.put_string(key, v.as_str()),
            HostValue::ByteArray(v) => values.put_blob(key, v.as_slice()),
            HostValue::Unknown => {
                tracing::debug!(key = %key, "Skipping host value of unknown type");
            }
        }
    }
}

/// Database and cursor operations addressed by id.
///
/// Each open of a database gets its own id, even when the registry returns
/// a handle that is already open; closing the id releases only that
/// reference.
#[derive(Debug)]
pub struct Bridge {
    registry: Registry,
    databases: Mutex<HandleTable<Arc<Database>>>,
    cursors: Mutex<HandleTable<Cursor>>,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new(Registry::global().clone())
    }
}

impl Bridge {
    /// A bridge that opens file databases through `registry`.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            databases: Mutex::new(HandleTable::new()),
            cursors: Mutex::new(HandleTable::new()),
        }
    }

    /// Open the database at `path`, or a private in-memory database when
    /// `path` is `None`. Always returns a valid id; a failed open shows up
    /// through [`get_error`](Self::get_error).
    pub fn open_database(&self, path: Option<&str>) -> u64 {
        let db = match path {
            Some(path) => self.registry.open_database(path),
            None => Arc::new(self.registry.open_in_memory_database()),
        };
        let id = lock(&self.databases).insert(db);
        tracing::debug!(id, path = ?path, "Bridge opened database");
        id
    }

    pub fn close_database(&self, id: u64) {
        let removed = lock(&self.databases).remove(id);
        // Dropped outside the table lock; the last reference closes the handle.
        match removed {
            Some(db) => drop(db),
            None => tracing::warn!(id, "close_database: unknown database id"),
        }
    }

    pub fn exec(&self, id: u64, sql: &str) -> usize {
        self.database(id, "exec").map_or(0, |db| db.exec(sql))
    }

    /// Insert one row built from parallel `keys` and `values`. Returns
    /// `false` when their lengths differ.
    pub fn insert(&self, id: u64, table: &str, keys: &[String], values: &[HostValue]) -> bool {
        if keys.len() != values.len() {
            tracing::warn!(
                keys = keys.len(),
                values = values.len(),
                "insert: key and value counts differ"
            );
            return false;
        }
        let Some(db) = self.database(id, "insert") else {
            return false;
        };

        let mut content = ContentValues::new();
        for (key, value) in keys.iter().zip(values) {
            value.put_into(key, &mut content);
        }
        db.insert(table, &content)
    }

    /// Prepare `sql` and return a cursor id, or `0` for an unknown database.
    pub fn query(&self, id: u64, sql: &str, args: Option<&[String]>) -> u64 {
        let Some(db) = self.database(id, "query") else {
            return 0;
        };
        let cursor = match args {
            Some(args) => db.query_with_args(sql, args),
            None => db.query(sql),
        };
        lock(&self.cursors).insert(cursor)
    }

    pub fn close_query(&self, cursor: u64) {
        let removed = lock(&self.cursors).remove(cursor);
        if removed.is_none() {
            tracing::warn!(cursor, "close_query: unknown cursor id");
        }
    }

    pub fn move_to_first(&self, cursor: u64) -> bool {
        self.with_cursor(cursor, "move_to_first", false, Cursor::move_to_first)
    }

    pub fn move_to_next(&self, cursor: u64) -> bool {
        self.with_cursor(cursor, "move_to_next", false, Cursor::move_to_next)
    }

    /// Unknown cursors report after-last.
    pub fn is_after_last(&self, cursor: u64) -> bool {
        self.with_cursor(cursor, "is_after_last", true, |c| c.is_after_last())
    }

    pub fn get_string(&self, cursor: u64, column: i32) -> String {
        self.read(cursor, column, "get_string", Cursor::get_string)
    }

    pub fn get_blob(&self, cursor: u64, column: i32) -> Vec<u8> {
        self.read(cursor, column, "get_blob", Cursor::get_blob)
    }

    pub fn get_long(&self, cursor: u64, column: i32) -> i64 {
        self.read(cursor, column, "get_long", Cursor::get_int)
    }

    pub fn get_real(&self, cursor: u64, column: i32) -> f64 {
        self.read(cursor, column, "get_real", Cursor::get_real)
    }

    pub fn get_error(&self, id: u64) -> String {
        self.database(id, "get_error")
            .map(|db| db.get_error())
            .unwrap_or_default()
    }

    pub fn begin_transaction(&self, id: u64) {
        if let Some(db) = self.database(id, "begin_transaction") {
            db.begin_transaction();
        }
    }

    pub fn commit_transaction(&self, id: u64) {
        if let Some(db) = self.database(id, "commit_transaction") {
            db.commit_transaction();
        }
    }

    pub fn rollback_transaction(&self, id: u64) {
        if let Some(db) = self.database(id, "rollback_transaction") {
            db.rollback_transaction();
        }
    }

    pub fn open_databases(&self) -> usize {
        lock(&self.databases).len()
    }

    pub fn open_cursors(&self) -> usize {
        lock(&self.cursors).len()
    }

    /// Clone the handle out so engine work runs without the table lock.
    fn database(&self, id: u64, op: &str) -> Option<Arc<Database>> {
        let db = lock(&self.databases).get(id).cloned();
        if db.is_none() {
            tracing::warn!(id, op, "Unknown database id");
        }
        db
    }

    fn with_cursor<R>(
        &self,
        cursor: u64,
        op: &str,
        missing: R,
        f: impl FnOnce(&mut Cursor) -> R,
    ) -> R {
        let mut cursors = lock(&self.cursors);
        if let Some(c) = cursors.get_mut(cursor) {
            f(c)
        } else {
            tracing::warn!(cursor, op, "Unknown cursor id");
            missing
        }
    }

    fn read<R: Default>(
        &self,
        cursor: u64,
        column: i32,
        op: &str,
        f: impl FnOnce(&Cursor, usize) -> R,
    ) -> R {
        let Ok(column) = usize::try_from(column) else {
            return R::default();
        };
        self.with_cursor(cursor, op, R::default(), |c| f(c, column))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
