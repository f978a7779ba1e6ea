//! Time overrides for reproducible signing and verification.
//!
//! An operation either carries an explicit [`TimeSource`] or falls back to
//! the process-wide default set here. The default is read once per call by
//! [`resolve_time`]; everything below that edge receives plain unix seconds
//! and never looks at the global.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;

/// Source of "now" for an operation.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedTime(pub SystemTime);

impl FixedTime {
    /// Frozen at `secs` seconds after the unix epoch.
    #[must_use]
    pub fn from_unix(secs: u64) -> Self {
        Self(UNIX_EPOCH.checked_add(Duration::from_secs(secs)).unwrap_or(UNIX_EPOCH))
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> SystemTime {
        self.0
    }
}

/// The wall clock shifted by a signed offset, for clock-skew tests.
#[derive(Debug, Clone, Copy)]
pub struct OffsetTime {
    offset: Duration,
    ahead: bool,
}

impl OffsetTime {
    #[must_use]
    pub const fn ahead(offset: Duration) -> Self {
        Self { offset, ahead: true }
    }

    #[must_use]
    pub const fn behind(offset: Duration) -> Self {
        Self { offset, ahead: false }
    }
}

impl TimeSource for OffsetTime {
    fn now(&self) -> SystemTime {
        let now = SystemTime::now();
        let shifted = if self.ahead {
            now.checked_add(self.offset)
        } else {
            now.checked_sub(self.offset)
        };
        shifted.unwrap_or(now)
    }
}

/// Whole seconds since the epoch; instants before it are negative.
#[must_use]
pub fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_secs()).map_or(i64::MIN, i64::saturating_neg),
    }
}

// ---------------------------------------------------------------------------
// Process-wide default
// ---------------------------------------------------------------------------

/// Process-wide operation defaults.
struct PgpEnvironment {
    time_override: RwLock<Option<Arc<dyn TimeSource>>>,
    chunk_size: AtomicUsize,
}

fn environment() -> &'static PgpEnvironment {
    static ENV: OnceLock<PgpEnvironment> = OnceLock::new();
    ENV.get_or_init(|| PgpEnvironment {
        time_override: RwLock::new(None),
        chunk_size: AtomicUsize::new(crate::bridge::DEFAULT_CHUNK_SIZE),
    })
}

/// Install a default time override for calls that carry none.
pub fn set_default_time_override(source: Arc<dyn TimeSource>) {
    *environment().time_override.write() = Some(source);
    tracing::debug!("default time override installed");
}

pub fn clear_default_time_override() {
    *environment().time_override.write() = None;
}

/// The installed default override, if any.
#[must_use]
pub fn default_time_override() -> Option<Arc<dyn TimeSource>> {
    environment().time_override.read().clone()
}

/// Bytes per read when copying a caller stream into the engine.
#[must_use]
pub fn stream_chunk_size() -> usize {
    environment().chunk_size.load(Ordering::Relaxed)
}

/// Set the copy chunk size; `0` restores the default.
pub fn set_stream_chunk_size(size: usize) {
    let size = if size == 0 { crate::bridge::DEFAULT_CHUNK_SIZE } else { size };
    environment().chunk_size.store(size, Ordering::Relaxed);
}

/// Time to send to the engine for one call.
///
/// `None` leaves the engine on its own clock.
#[must_use]
pub fn resolve_time(explicit: Option<&dyn TimeSource>) -> Option<i64> {
    match explicit {
        Some(source) => Some(unix_seconds(source.now())),
        None => default_time_override().map(|source| unix_seconds(source.now())),
    }
}

/// Split an optional time into the engine's `(has_time, time)` pair.
pub(crate) fn time_flag(time: Option<i64>) -> (bool, i64) {
    time.map_or((false, 0), |t| (true, t))
}
