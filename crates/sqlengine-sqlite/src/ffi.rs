//! Thin layer over the `libsqlite3-sys` bindings.
//!
//! Re-exports the subset of the C API the backend uses and wraps the few
//! calls that return static or connection-owned strings.

#![allow(non_camel_case_types)]

use std::ffi::{CStr, c_int};

pub use libsqlite3_sys::{
    SQLITE_BLOB, SQLITE_DONE, SQLITE_FLOAT, SQLITE_INTEGER, SQLITE_NULL, SQLITE_OK,
    SQLITE_OPEN_CREATE, SQLITE_OPEN_FULLMUTEX, SQLITE_OPEN_MEMORY, SQLITE_OPEN_READONLY,
    SQLITE_OPEN_READWRITE, SQLITE_OPEN_URI, SQLITE_ROW, SQLITE_TEXT, sqlite3, sqlite3_bind_double,
    sqlite3_bind_int, sqlite3_bind_int64, sqlite3_bind_null, sqlite3_bind_parameter_count,
    sqlite3_bind_text, sqlite3_busy_timeout, sqlite3_changes, sqlite3_clear_bindings,
    sqlite3_column_blob, sqlite3_column_bytes, sqlite3_column_count,
    sqlite3_column_decltype, sqlite3_column_double, sqlite3_column_int64, sqlite3_column_name,
    sqlite3_column_text, sqlite3_column_type, sqlite3_destructor_type, sqlite3_errmsg,
    sqlite3_errstr, sqlite3_finalize, sqlite3_libversion, sqlite3_libversion_number,
    sqlite3_open_v2, sqlite3_prepare_v2, sqlite3_reset, sqlite3_step, sqlite3_stmt,
};

// libsqlite3-sys 0.37 omits `sqlite3_close_v2` from its generated bindings;
// the symbol is still present in the bundled library.
unsafe extern "C" {
    pub fn sqlite3_close_v2(db: *mut sqlite3) -> c_int;
}

#[cfg(test)]
pub use libsqlite3_sys::{SQLITE_BUSY, SQLITE_CONSTRAINT, SQLITE_ERROR};

/// Destructor telling SQLite to copy bound text before the call returns.
pub fn transient() -> sqlite3_destructor_type {
    libsqlite3_sys::SQLITE_TRANSIENT()
}

/// Get the SQLite library version as a string.
pub fn version() -> &'static str {
    // SAFETY: sqlite3_libversion returns a static string
    unsafe {
        let ptr = sqlite3_libversion();
        CStr::from_ptr(ptr).to_str().unwrap_or("unknown")
    }
}

/// Get the SQLite library version as a number.
pub fn version_number() -> i32 {
    // SAFETY: sqlite3_libversion_number is always safe to call
    unsafe { sqlite3_libversion_number() }
}

/// Convert an SQLite result code to a human-readable string.
pub fn error_string(code: c_int) -> &'static str {
    // SAFETY: sqlite3_errstr returns a static string
    unsafe {
        let ptr = sqlite3_errstr(code);
        CStr::from_ptr(ptr).to_str().unwrap_or("unknown error")
    }
}

/// Most recent error message of a connection.
///
/// # Safety
/// `db` must be a valid, open connection handle.
pub unsafe fn errmsg(db: *mut sqlite3) -> String {
    // SAFETY: caller guarantees db is valid; the message is copied before
    // any further call on the connection can overwrite it.
    unsafe {
        let ptr = sqlite3_errmsg(db);
        if ptr.is_null() {
            return "unknown error".to_string();
        }
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}
