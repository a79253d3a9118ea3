//! Forward-only cursor over one query's result rows.
//!
//! A cursor starts `Unstarted`. `move_to_first` rewinds and takes the first
//! step; `move_to_next` takes each following step. Once the statement is
//! exhausted, or a step fails, the cursor is after-last and stays there until
//! the next `move_to_first`.

use std::ffi::c_int;

use contentdb_core::DataType;

use crate::ffi;
use crate::statement::{RawStatement, StepResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    /// Prepared, never stepped.
    Unstarted,
    /// Positioned on a result row.
    Row,
    /// The statement ran out of rows.
    Done,
    /// A reset or step failed; terminal until the next `move_to_first`.
    Failed,
}

/// Iterator over the rows produced by [`Database::query`].
///
/// The cursor owns its prepared statement and finalizes it when dropped. It
/// holds no borrow of the database; the connection stays open until every
/// cursor over it is gone.
///
/// Column getters read the current row by zero-based index. When the cursor
/// is not on a row, or the index is out of range, they return the zero value
/// of their type.
///
/// [`Database::query`]: crate::Database::query
#[derive(Debug)]
pub struct Cursor {
    stmt: Option<RawStatement>,
    state: CursorState,
    position: usize,
}

impl Cursor {
    pub(crate) fn new(stmt: RawStatement) -> Self {
        Self {
            stmt: Some(stmt),
            state: CursorState::Unstarted,
            position: 0,
        }
    }

    /// A cursor with no statement behind it, returned when a query could not
    /// be prepared. It is after-last from the start.
    pub(crate) fn failed() -> Self {
        Self {
            stmt: None,
            state: CursorState::Failed,
            position: 0,
        }
    }

    /// Rewind to the start of the result set and step onto the first row.
    ///
    /// Returns `true` iff a row is available. An empty result set, a failed
    /// rewind and a failed step all return `false` and leave the cursor
    /// after-last.
    pub fn move_to_first(&mut self) -> bool {
        let Some(stmt) = &self.stmt else {
            return false;
        };

        if let Err(e) = stmt.reset() {
            tracing::warn!(sql = %stmt.sql(), error = %e, "Failed to reset cursor");
            self.state = CursorState::Failed;
            return false;
        }

        self.position = 0;
        self.state = step_state(stmt);
        self.state == CursorState::Row
    }

    /// Step to the next row.
    ///
    /// Returns `true` iff the step produced a row. Once after-last, further
    /// calls return `false` without touching the statement. Calling this on
    /// a cursor that was never started takes the first step.
    pub fn move_to_next(&mut self) -> bool {
        let Some(stmt) = &self.stmt else {
            return false;
        };

        match self.state {
            CursorState::Done | CursorState::Failed => false,
            CursorState::Unstarted => {
                self.state = step_state(stmt);
                self.state == CursorState::Row
            }
            CursorState::Row => {
                self.position += 1;
                self.state = step_state(stmt);
                self.state == CursorState::Row
            }
        }
    }

    /// True once the last step did not land on a row.
    pub fn is_after_last(&self) -> bool {
        matches!(self.state, CursorState::Done | CursorState::Failed)
    }

    /// Zero-based index of the step the cursor is on.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn column_count(&self) -> usize {
        self.stmt.as_ref().map_or(0, RawStatement::column_count)
    }

    pub fn column_name(&self, column: usize) -> Option<String> {
        self.stmt.as_ref()?.column_name(column)
    }

    /// Storage class of `column` in the current row.
    pub fn column_type(&self, column: usize) -> DataType {
        let Some((stmt, idx)) = self.current(column) else {
            return DataType::Null;
        };
        match stmt.column_type(idx) {
            ffi::SQLITE_INTEGER => DataType::Integer,
            ffi::SQLITE_FLOAT => DataType::Real,
            ffi::SQLITE_TEXT => DataType::Text,
            ffi::SQLITE_BLOB => DataType::Blob,
            _ => DataType::Null,
        }
    }

    pub fn is_null(&self, column: usize) -> bool {
        self.column_type(column) == DataType::Null
    }

    /// Column as text. Blob bytes that are not valid UTF-8 are replaced
    /// lossily; use [`get_blob`](Self::get_blob) for the exact bytes.
    pub fn get_string(&self, column: usize) -> String {
        self.current(column)
            .map(|(stmt, idx)| String::from_utf8_lossy(&stmt.column_text_bytes(idx)).into_owned())
            .unwrap_or_default()
    }

    pub fn get_blob(&self, column: usize) -> Vec<u8> {
        self.current(column)
            .map(|(stmt, idx)| stmt.column_blob(idx))
            .unwrap_or_default()
    }

    pub fn get_int(&self, column: usize) -> i64 {
        self.current(column)
            .map_or(0, |(stmt, idx)| stmt.column_i64(idx))
    }

    pub fn get_real(&self, column: usize) -> f64 {
        self.current(column)
            .map_or(0.0, |(stmt, idx)| stmt.column_f64(idx))
    }

    fn current(&self, column: usize) -> Option<(&RawStatement, c_int)> {
        if self.state != CursorState::Row {
            return None;
        }
        let stmt = self.stmt.as_ref()?;
        if column >= stmt.column_count() {
            return None;
        }
        Some((stmt, c_int::try_from(column).ok()?))
    }
}

fn step_state(stmt: &RawStatement) -> CursorState {
    match stmt.step() {
        Ok(StepResult::Row) => CursorState::Row,
        Ok(StepResult::Done) => CursorState::Done,
        Err(e) => {
            tracing::warn!(sql = %stmt.sql(), error = %e, "Cursor step failed");
            CursorState::Failed
        }
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        if let Some(stmt) = self.stmt.take() {
            tracing::debug!(sql = %stmt.sql(), position = self.position, "Closing cursor");
        }
    }
}
