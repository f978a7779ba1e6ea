//! ABI boundary helpers: panic capture, error records, pointer checks.

use std::ffi::{c_int, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};

use super::error::EngineError;
use crate::abi::RawError;

/// Run `f`, turning its error or panic into an owned [`RawError`].
pub(crate) fn abi_boundary<F>(f: F) -> RawError
where
    F: FnOnce() -> Result<(), EngineError>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => RawError::OK,
        Ok(Err(err)) => {
            tracing::debug!(error = %err, "engine call failed");
            error_record(&err.to_string())
        }
        Err(_) => {
            tracing::warn!("engine call panicked");
            error_record(&EngineError::Panic.to_string())
        }
    }
}

/// Allocate the message buffer handed to the caller.
///
/// The buffer is a NUL-terminated `CString`; `pgp_free` reclaims it.
fn error_record(message: &str) -> RawError {
    let sanitized: Vec<u8> = message.bytes().filter(|b| *b != 0).collect();
    let len = c_int::try_from(sanitized.len()).unwrap_or(c_int::MAX);
    match CString::new(sanitized) {
        Ok(owned) => RawError {
            message: owned.into_raw().cast::<u8>(),
            message_len: len,
        },
        // Unreachable: NUL bytes were filtered above.
        Err(_) => RawError {
            message: CString::from(c"engine error").into_raw().cast::<u8>(),
            message_len: 12,
        },
    }
}

/// Release a buffer produced by [`error_record`].
///
/// # Safety
///
/// `ptr` must be null or a pointer previously returned in a [`RawError`]
/// and not yet freed.
pub(crate) unsafe fn free_message(ptr: *mut u8) {
    if !ptr.is_null() {
        // SAFETY: the caller guarantees `ptr` came from `CString::into_raw`.
        drop(unsafe { CString::from_raw(ptr.cast()) });
    }
}

/// Borrow `len` bytes at `ptr`, treating `len == 0` as empty.
///
/// # Safety
///
/// When non-null, `ptr` must be valid for reads of `len` bytes for `'a`.
pub(crate) unsafe fn bytes<'a>(ptr: *const u8, len: usize) -> Result<&'a [u8], EngineError> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(EngineError::invalid("null data pointer with non-zero length"));
    }
    // SAFETY: non-null and valid for `len` bytes per the caller.
    Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
}

/// Mutable counterpart of [`bytes`].
///
/// # Safety
///
/// When non-null, `ptr` must be valid for writes of `len` bytes for `'a`.
pub(crate) unsafe fn bytes_mut<'a>(ptr: *mut u8, len: usize) -> Result<&'a mut [u8], EngineError> {
    if len == 0 {
        return Ok(&mut []);
    }
    if ptr.is_null() {
        return Err(EngineError::invalid("null buffer pointer with non-zero length"));
    }
    // SAFETY: non-null and valid for `len` bytes per the caller.
    Ok(unsafe { std::slice::from_raw_parts_mut(ptr, len) })
}

/// Borrow a parameter record.
///
/// # Safety
///
/// When non-null, `ptr` must point to an initialized `T` valid for `'a`.
pub(crate) unsafe fn record<'a, T>(ptr: *const T) -> Result<&'a T, EngineError> {
    if ptr.is_null() {
        return Err(EngineError::invalid("null parameter record"));
    }
    // SAFETY: non-null per the check above, initialized per the caller.
    Ok(unsafe { &*ptr })
}

/// Store `value` into an out-parameter.
///
/// # Safety
///
/// When non-null, `ptr` must be valid for a write of `T`.
pub(crate) unsafe fn assign<T>(ptr: *mut T, value: T) -> Result<(), EngineError> {
    if ptr.is_null() {
        return Err(EngineError::invalid("null output pointer"));
    }
    // SAFETY: non-null per the check above, writable per the caller.
    unsafe { ptr.write(value) };
    Ok(())
}

/// Borrow a UTF-8 string argument.
///
/// # Safety
///
/// Same contract as [`bytes`].
pub(crate) unsafe fn text<'a>(ptr: *const u8, len: usize) -> Result<&'a str, EngineError> {
    // SAFETY: forwarded to the caller.
    let raw = unsafe { bytes(ptr, len) }?;
    std::str::from_utf8(raw).map_err(|_| EngineError::invalid("string argument is not UTF-8"))
}
