//! Owned prepared statement.
//!
//! [`RawStatement`] is the single owner of a `sqlite3_stmt`. It is finalized
//! exactly once, when dropped. Moving it moves ownership; it cannot be
//! cloned.

// Allow casts in FFI code where we need to match C types exactly
#![allow(clippy::cast_possible_truncation)]

use std::ffi::{CString, c_int};
use std::ptr::{self, NonNull};

use contentdb_core::{Error, QueryError, QueryErrorKind, Result, Value};

use crate::ffi;

/// Outcome of a successful `sqlite3_step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepResult {
    /// A result row is available.
    Row,
    /// The statement ran to completion.
    Done,
}

pub(crate) struct RawStatement {
    stmt: NonNull<ffi::sqlite3_stmt>,
    db: *mut ffi::sqlite3,
    sql: String,
}

// SAFETY: connections are opened with SQLITE_OPEN_FULLMUTEX, so the engine
// serializes every call on the statement and its connection. The statement is
// still only ever used by its single owner.
unsafe impl Send for RawStatement {}

impl RawStatement {
    /// Compile `sql` against `db`.
    ///
    /// The connection must have been opened with close_v2 semantics in
    /// mind: it stays alive until this statement is finalized.
    pub(crate) fn prepare(db: *mut ffi::sqlite3, sql: &str) -> Result<Self> {
        let c_sql = CString::new(sql).map_err(|_| {
            Error::Query(QueryError {
                kind: QueryErrorKind::Prepare,
                sql: Some(sql.to_string()),
                code: None,
                message: "SQL contains null byte".to_string(),
            })
        })?;
        let len = c_int::try_from(c_sql.as_bytes().len()).map_err(|_| {
            Error::Query(QueryError {
                kind: QueryErrorKind::TooBig,
                sql: None,
                code: Some(ffi::SQLITE_TOOBIG),
                message: "SQL text too long".to_string(),
            })
        })?;

        let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();

        // SAFETY: db is a live handle, c_sql outlives the call
        let rc = unsafe { ffi::sqlite3_prepare_v2(db, c_sql.as_ptr(), len, &raw mut stmt, ptr::null_mut()) };

        if rc != ffi::SQLITE_OK {
            // SAFETY: db is live
            return Err(unsafe { engine_error(db, QueryErrorKind::Prepare, sql) });
        }

        // Whitespace or comment-only SQL compiles to no statement at all.
        let stmt = NonNull::new(stmt).ok_or_else(|| {
            Error::Query(QueryError {
                kind: QueryErrorKind::Prepare,
                sql: Some(sql.to_string()),
                code: None,
                message: "SQL contains no statement".to_string(),
            })
        })?;

        tracing::trace!(sql = %sql, "Prepared statement");
        Ok(Self {
            stmt,
            db,
            sql: sql.to_string(),
        })
    }

    pub(crate) fn sql(&self) -> &str {
        &self.sql
    }

    fn as_ptr(&self) -> *mut ffi::sqlite3_stmt {
        self.stmt.as_ptr()
    }

    /// Bind `value` to the 1-based parameter `index`.
    pub(crate) fn bind_value(&self, index: usize, value: &Value) -> Result<()> {
        let idx = c_int::try_from(index).map_err(|_| self.bind_error(index, ffi::SQLITE_RANGE))?;
        let stmt = self.as_ptr();

        // SAFETY: stmt is valid; TRANSIENT makes SQLite copy text and blob
        // buffers before returning.
        let rc = unsafe {
            match value {
                Value::Null => ffi::sqlite3_bind_null(stmt, idx),
                Value::Integer(v) => ffi::sqlite3_bind_int64(stmt, idx, *v),
                Value::Real(v) => ffi::sqlite3_bind_double(stmt, idx, *v),
                Value::Text(s) => {
                    let len = c_int::try_from(s.len())
                        .map_err(|_| self.bind_error(index, ffi::SQLITE_TOOBIG))?;
                    ffi::sqlite3_bind_text(stmt, idx, s.as_ptr().cast(), len, ffi::sqlite_transient())
                }
                Value::Blob(b) => {
                    let len = c_int::try_from(b.len())
                        .map_err(|_| self.bind_error(index, ffi::SQLITE_TOOBIG))?;
                    ffi::sqlite3_bind_blob(stmt, idx, b.as_ptr().cast(), len, ffi::sqlite_transient())
                }
            }
        };

        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(self.bind_error(index, rc))
        }
    }

    /// Bind every element of `args` as text, positions 1..=N.
    pub(crate) fn bind_text_args<S: AsRef<str>>(&self, args: &[S]) -> Result<()> {
        for (i, arg) in args.iter().enumerate() {
            self.bind_value(i + 1, &Value::Text(arg.as_ref().to_string()))?;
        }
        Ok(())
    }

    /// Advance the statement one step.
    pub(crate) fn step(&self) -> Result<StepResult> {
        // SAFETY: stmt is valid
        let rc = unsafe { ffi::sqlite3_step(self.as_ptr()) };
        match rc {
            ffi::SQLITE_ROW => Ok(StepResult::Row),
            ffi::SQLITE_DONE => Ok(StepResult::Done),
            // SAFETY: db outlives stmt (close_v2)
            _ => Err(unsafe { engine_error(self.db, error_code_to_kind(rc), &self.sql) }),
        }
    }

    /// Rewind the statement to before its first row. Bindings are kept.
    pub(crate) fn reset(&self) -> Result<()> {
        // SAFETY: stmt is valid
        let rc = unsafe { ffi::sqlite3_reset(self.as_ptr()) };
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            // SAFETY: db outlives stmt (close_v2)
            Err(unsafe { engine_error(self.db, error_code_to_kind(rc), &self.sql) })
        }
    }

    pub(crate) fn column_count(&self) -> usize {
        // SAFETY: stmt is valid
        let n = unsafe { ffi::sqlite3_column_count(self.as_ptr()) };
        usize::try_from(n).unwrap_or(0)
    }

    pub(crate) fn column_name(&self, index: usize) -> Option<String> {
        let idx = c_int::try_from(index).ok()?;
        // SAFETY: stmt is valid; out-of-range indexes return null
        unsafe {
            let ptr = ffi::sqlite3_column_name(self.as_ptr(), idx);
            if ptr.is_null() {
                None
            } else {
                Some(std::ffi::CStr::from_ptr(ptr).to_string_lossy().into_owned())
            }
        }
    }

    pub(crate) fn column_type(&self, index: c_int) -> c_int {
        // SAFETY: stmt is valid
        unsafe { ffi::sqlite3_column_type(self.as_ptr(), index) }
    }

    pub(crate) fn column_i64(&self, index: c_int) -> i64 {
        // SAFETY: stmt is valid
        unsafe { ffi::sqlite3_column_int64(self.as_ptr(), index) }
    }

    pub(crate) fn column_f64(&self, index: c_int) -> f64 {
        // SAFETY: stmt is valid
        unsafe { ffi::sqlite3_column_double(self.as_ptr(), index) }
    }

    /// Column bytes as SQLite's text conversion yields them.
    pub(crate) fn column_text_bytes(&self, index: c_int) -> Vec<u8> {
        // SAFETY: stmt is valid. The text pointer must be fetched before
        // column_bytes so the length refers to the converted text.
        unsafe {
            let ptr = ffi::sqlite3_column_text(self.as_ptr(), index);
            let len = ffi::sqlite3_column_bytes(self.as_ptr(), index);
            copy_column(ptr.cast(), len)
        }
    }

    pub(crate) fn column_blob(&self, index: c_int) -> Vec<u8> {
        // SAFETY: stmt is valid. Blob pointer first, then its length.
        unsafe {
            let ptr = ffi::sqlite3_column_blob(self.as_ptr(), index);
            let len = ffi::sqlite3_column_bytes(self.as_ptr(), index);
            copy_column(ptr.cast(), len)
        }
    }

    fn bind_error(&self, index: usize, code: c_int) -> Error {
        // SAFETY: db outlives stmt (close_v2)
        let msg = unsafe { ffi::errmsg(self.db) };
        Error::Query(QueryError {
            kind: QueryErrorKind::Bind,
            sql: Some(self.sql.clone()),
            code: Some(code),
            message: format!("Failed to bind parameter {}: {}", index, msg),
        })
    }
}

impl Drop for RawStatement {
    fn drop(&mut self) {
        // SAFETY: stmt is valid and owned; this is the only finalize call
        unsafe {
            ffi::sqlite3_finalize(self.as_ptr());
        }
        tracing::trace!(sql = %self.sql, "Finalized statement");
    }
}

impl std::fmt::Debug for RawStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawStatement")
            .field("sql", &self.sql)
            .finish_non_exhaustive()
    }
}

/// Copy `len` bytes from a column pointer; null or non-positive lengths
/// yield an empty vector.
///
/// # Safety
/// `ptr` must be null or valid for `len` bytes.
unsafe fn copy_column(ptr: *const u8, len: c_int) -> Vec<u8> {
    match usize::try_from(len) {
        Ok(len) if len > 0 && !ptr.is_null() => {
            // SAFETY: caller guarantees ptr is valid for len bytes
            unsafe { std::slice::from_raw_parts(ptr, len) }.to_vec()
        }
        _ => Vec::new(),
    }
}

/// Build a query error from the connection's current error state.
///
/// # Safety
/// `db` must be a live connection handle.
pub(crate) unsafe fn engine_error(db: *mut ffi::sqlite3, kind: QueryErrorKind, sql: &str) -> Error {
    // SAFETY: caller guarantees db is live
    let (msg, code) = unsafe { (ffi::errmsg(db), ffi::sqlite3_errcode(db)) };
    let kind = match error_code_to_kind(code) {
        QueryErrorKind::Database => kind,
        specific => specific,
    };
    Error::Query(QueryError {
        kind,
        sql: Some(sql.to_string()),
        code: Some(code),
        message: msg,
    })
}

pub(crate) fn error_code_to_kind(code: c_int) -> QueryErrorKind {
    // Extended codes carry the primary code in the low byte.
    match code & 0xff {
        ffi::SQLITE_CONSTRAINT => QueryErrorKind::Constraint,
        ffi::SQLITE_BUSY | ffi::SQLITE_LOCKED => QueryErrorKind::Busy,
        ffi::SQLITE_PERM | ffi::SQLITE_AUTH | ffi::SQLITE_READONLY => QueryErrorKind::Permission,
        ffi::SQLITE_NOTFOUND => QueryErrorKind::NotFound,
        ffi::SQLITE_TOOBIG => QueryErrorKind::TooBig,
        ffi::SQLITE_INTERRUPT => QueryErrorKind::Interrupted,
        ffi::SQLITE_MISUSE => QueryErrorKind::Misuse,
        _ => QueryErrorKind::Database,
    }
}
