//! The host clock (§2, §5) and the sliding-window request-id generator
//! that resolves the collision-resistance Open Question from §9.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Monotonic-enough source of seconds-since-epoch. Read once per decision;
/// the KV store's own clock is never consulted (§5).
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Wall-clock backed by `SystemTime`. One instance per process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the unix epoch")
            .as_secs_f64()
    }
}

/// Serialize a timestamp as a fixed-precision decimal string, per the
/// "timestamp representation" design note: this avoids rounding loss when
/// the value crosses into the KV store's own number type.
pub fn format_timestamp(seconds: f64) -> String {
    format!("{seconds:.6}")
}

/// Generates request ids for the sliding-window algorithm. A bare
/// nanosecond clock reading is not collision-free under concurrent load
/// (two callers can read the same tick); this pairs the clock reading with
/// a per-process atomic sequence number so ids are unique within a process
/// and, combined with the clock component, vanishingly unlikely to collide
/// across processes.
pub struct RequestIdGenerator {
    sequence: AtomicU64,
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        Self {
            sequence: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self, now: f64) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{now:.9}-{seq}")
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
