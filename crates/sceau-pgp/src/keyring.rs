//! Ordered, immutable key collections.
//!
//! A ring borrows its keys. The raw handle array the engine wants is only
//! built right before a call, by [`PgpKeyRing::raw_handles`], and cannot
//! outlive the borrow of the ring it came from.

use std::fmt;
use std::marker::PhantomData;

use sceau_engine::Handle;

use crate::error::PgpError;
use crate::key::{PgpKey, PgpPrivateKey};

#[derive(Clone)]
enum Keys<'a> {
    Empty,
    One(&'a PgpKey),
    Many(Vec<&'a PgpKey>),
}

/// Zero, one or many keys used together in one operation.
#[derive(Clone)]
pub struct PgpKeyRing<'a> {
    keys: Keys<'a>,
}

impl<'a> PgpKeyRing<'a> {
    #[must_use]
    pub const fn empty() -> Self {
        Self { keys: Keys::Empty }
    }

    #[must_use]
    pub const fn single(key: &'a PgpKey) -> Self {
        Self { keys: Keys::One(key) }
    }

    pub fn new(keys: impl IntoIterator<Item = &'a PgpKey>) -> Self {
        let mut keys: Vec<&'a PgpKey> = keys.into_iter().collect();
        match keys.len() {
            0 => Self::empty(),
            1 => keys.pop().map_or_else(Self::empty, Self::single),
            _ => Self { keys: Keys::Many(keys) },
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        match &self.keys {
            Keys::Empty => 0,
            Keys::One(_) => 1,
            Keys::Many(keys) => keys.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a PgpKey> + '_ {
        let (one, many): (Option<&'a PgpKey>, &[&'a PgpKey]) = match &self.keys {
            Keys::Empty => (None, &[]),
            Keys::One(key) => (Some(*key), &[]),
            Keys::Many(keys) => (None, keys.as_slice()),
        };
        one.into_iter().chain(many.iter().copied())
    }

    /// Raw handles for one engine call.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] if any key was released.
    pub(crate) fn raw_handles(&self) -> Result<RawHandles<'_>, PgpError> {
        let storage = match &self.keys {
            Keys::Empty => Storage::Empty,
            Keys::One(key) => Storage::One([key.handle().borrow()?.dangerous_raw()]),
            Keys::Many(keys) => Storage::Many(
                keys.iter()
                    .map(|key| key.handle().borrow().map(|h| h.dangerous_raw()))
                    .collect::<Result<_, _>>()?,
            ),
        };
        Ok(RawHandles {
            storage,
            _ring: PhantomData,
        })
    }
}

impl Default for PgpKeyRing<'_> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a> From<&'a PgpKey> for PgpKeyRing<'a> {
    fn from(key: &'a PgpKey) -> Self {
        Self::single(key)
    }
}

impl<'a> From<&'a PgpPrivateKey> for PgpKeyRing<'a> {
    fn from(key: &'a PgpPrivateKey) -> Self {
        Self::single(key.as_key())
    }
}

impl<'a> From<&'a [PgpKey]> for PgpKeyRing<'a> {
    fn from(keys: &'a [PgpKey]) -> Self {
        Self::new(keys)
    }
}

impl<'a> FromIterator<&'a PgpKey> for PgpKeyRing<'a> {
    fn from_iter<I: IntoIterator<Item = &'a PgpKey>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Debug for PgpKeyRing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgpKeyRing").field("count", &self.count()).finish()
    }
}

/// A ring that only holds private keys, for signing and decryption.
#[derive(Clone, Default)]
pub struct PgpPrivateKeyRing<'a>(PgpKeyRing<'a>);

impl<'a> PgpPrivateKeyRing<'a> {
    #[must_use]
    pub const fn empty() -> Self {
        Self(PgpKeyRing::empty())
    }

    pub fn new(keys: impl IntoIterator<Item = &'a PgpPrivateKey>) -> Self {
        Self(PgpKeyRing::new(keys.into_iter().map(PgpPrivateKey::as_key)))
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.0.count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The same keys as a plain ring.
    #[must_use]
    pub const fn as_key_ring(&self) -> &PgpKeyRing<'a> {
        &self.0
    }
}

impl<'a> From<&'a PgpPrivateKey> for PgpPrivateKeyRing<'a> {
    fn from(key: &'a PgpPrivateKey) -> Self {
        Self(PgpKeyRing::single(key.as_key()))
    }
}

impl<'a> From<&'a [PgpPrivateKey]> for PgpPrivateKeyRing<'a> {
    fn from(keys: &'a [PgpPrivateKey]) -> Self {
        Self::new(keys)
    }
}

impl<'a> FromIterator<&'a PgpPrivateKey> for PgpPrivateKeyRing<'a> {
    fn from_iter<I: IntoIterator<Item = &'a PgpPrivateKey>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Debug for PgpPrivateKeyRing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgpPrivateKeyRing").field("count", &self.count()).finish()
    }
}

// ---------------------------------------------------------------------------
// Per-call handle array
// ---------------------------------------------------------------------------

enum Storage {
    Empty,
    One([Handle; 1]),
    Many(Vec<Handle>),
}

/// Contiguous raw handles, tied to the ring borrow they came from.
pub(crate) struct RawHandles<'r> {
    storage: Storage,
    _ring: PhantomData<&'r ()>,
}

impl RawHandles<'static> {
    /// No keys.
    pub(crate) const fn none() -> Self {
        Self {
            storage: Storage::Empty,
            _ring: PhantomData,
        }
    }
}

impl RawHandles<'_> {
    pub(crate) fn as_ptr(&self) -> *const Handle {
        match &self.storage {
            Storage::Empty => std::ptr::null(),
            Storage::One(one) => one.as_ptr(),
            Storage::Many(many) => many.as_ptr(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match &self.storage {
            Storage::Empty => 0,
            Storage::One(_) => 1,
            Storage::Many(many) => many.len(),
        }
    }
}
