//! Process-wide handle table for simulated engine objects.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use parking_lot::{Mutex, RwLock};

use super::context::{SigningContext, VerificationContext};
use super::error::EngineError;
use super::keys::KeyMaterial;
use super::message::MessageInfo;
use super::session::SessionKey;
use super::srp::{SrpAuth, SrpClientHandshake, SrpServer};
use super::streams::{PullReader, WriteCloser};
use super::verify::Verification;
use crate::abi::{Handle, INVALID_HANDLE};

/// Every object kind a handle may refer to.
#[derive(Clone)]
pub(crate) enum Object {
    Key(Arc<KeyMaterial>),
    SessionKey(Arc<SessionKey>),
    Message(Arc<MessageInfo>),
    VerificationContext(Arc<VerificationContext>),
    SigningContext(Arc<SigningContext>),
    VerificationResult(Arc<Verification>),
    WriteCloser(Arc<Mutex<WriteCloser>>),
    Reader(Arc<Mutex<PullReader>>),
    SrpAuth(Arc<SrpAuth>),
    SrpClient(Arc<SrpClientHandshake>),
    SrpServer(Arc<SrpServer>),
}

/// Handle table
pub(crate) struct HandleTable {
    next: AtomicUsize,
    entries: RwLock<HashMap<Handle, Object>>,
}

impl HandleTable {
    fn new() -> Self {
        Self {
            next: AtomicUsize::new(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register `object` and return its fresh handle.
    pub(crate) fn insert(&self, object: Object) -> Handle {
        let mut handle = self.next.fetch_add(1, Ordering::Relaxed);
        if handle == INVALID_HANDLE {
            handle = self.next.fetch_add(1, Ordering::Relaxed);
        }
        self.entries.write().insert(handle, object);
        handle
    }

    pub(crate) fn get(&self, handle: Handle) -> Result<Object, EngineError> {
        self.entries
            .read()
            .get(&handle)
            .cloned()
            .ok_or(EngineError::InvalidHandle(handle))
    }

    /// Drop the table's reference. Unknown handles are ignored.
    pub(crate) fn remove(&self, handle: Handle) {
        if self.entries.write().remove(&handle).is_none() {
            tracing::debug!(handle, "destroy of unknown handle ignored");
        }
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, handle: Handle) -> bool {
        self.entries.read().contains_key(&handle)
    }
}

static TABLE: LazyLock<HandleTable> = LazyLock::new(HandleTable::new);

pub(crate) fn table() -> &'static HandleTable {
    &TABLE
}

macro_rules! typed_lookup {
    ($fn_name:ident, $variant:ident, $ty:ty, $label:literal) => {
        pub(crate) fn $fn_name(handle: Handle) -> Result<$ty, EngineError> {
            match table().get(handle)? {
                Object::$variant(value) => Ok(value),
                _ => Err(EngineError::WrongHandleType {
                    handle,
                    expected: $label,
                }),
            }
        }
    };
}

typed_lookup!(key, Key, Arc<KeyMaterial>, "key");
typed_lookup!(session_key, SessionKey, Arc<SessionKey>, "session key");
typed_lookup!(message, Message, Arc<MessageInfo>, "message");
typed_lookup!(
    verification_context,
    VerificationContext,
    Arc<VerificationContext>,
    "verification context"
);
typed_lookup!(signing_context, SigningContext, Arc<SigningContext>, "signing context");
typed_lookup!(verification_result, VerificationResult, Arc<Verification>, "verification result");
typed_lookup!(write_closer, WriteCloser, Arc<Mutex<WriteCloser>>, "message write closer");
typed_lookup!(reader, Reader, Arc<Mutex<PullReader>>, "message reader");
typed_lookup!(srp_auth, SrpAuth, Arc<SrpAuth>, "SRP auth");
typed_lookup!(srp_client, SrpClient, Arc<SrpClientHandshake>, "SRP client handshake");
typed_lookup!(srp_server, SrpServer, Arc<SrpServer>, "SRP server");

/// Collect the key objects behind a raw handle array.
///
/// # Safety
///
/// When `len > 0`, `ptr` must be valid for reads of `len` handles.
pub(crate) unsafe fn keys(ptr: *const Handle, len: usize) -> Result<Vec<Arc<KeyMaterial>>, EngineError> {
    if len == 0 {
        return Ok(Vec::new());
    }
    if ptr.is_null() {
        return Err(EngineError::invalid("null key array with non-zero length"));
    }
    // SAFETY: non-null and valid for `len` handles per the caller.
    let raw = unsafe { std::slice::from_raw_parts(ptr, len) };
    raw.iter().map(|h| key(*h)).collect()
}
