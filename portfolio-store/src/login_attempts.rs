//! Process-local login failure tracking with temporary lockout.
//!
//! Identities are the pair "normalized email | client address", so a
//! lockout triggered from one network origin does not block the same
//! account elsewhere. State lives only in memory; a restart clears it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_LOCK_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Outcome of consulting or feeding the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockStatus {
    pub locked: bool,
    /// Seconds until retry is meaningful, ceiling-rounded, minimum 1
    /// while locked. Zero when unlocked.
    pub retry_after_secs: u64,
    pub remaining_attempts: u32,
}

struct AttemptRecord {
    failures: u32,
    locked_until: Option<Instant>,
}

pub struct LoginAttemptTracker {
    max_attempts: u32,
    lock_window: Duration,
    records: Mutex<HashMap<String, AttemptRecord>>,
}

impl LoginAttemptTracker {
    pub fn new(max_attempts: u32, lock_window: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            lock_window,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Report whether `identity` is currently locked out. An expired
    /// lockout record is deleted on the way through.
    pub fn lock_status(&self, identity: &str) -> LockStatus {
        let Some(key) = normalize_identity(identity) else {
            return self.unlocked(0);
        };

        let now = Instant::now();
        let mut records = self.records.lock().unwrap();
        drop_expired(&mut records, &key, now);

        match records.get(&key) {
            Some(record) => match record.locked_until {
                Some(until) if until > now => LockStatus {
                    locked: true,
                    retry_after_secs: retry_secs(until, now),
                    remaining_attempts: 0,
                },
                _ => self.unlocked(record.failures),
            },
            None => self.unlocked(0),
        }
    }

    /// Record one authentication failure. Reaching the configured maximum
    /// resets the counter and opens a lockout window.
    pub fn register_failure(&self, identity: &str) -> LockStatus {
        let Some(key) = normalize_identity(identity) else {
            return self.unlocked(0);
        };

        let now = Instant::now();
        let mut records = self.records.lock().unwrap();
        drop_expired(&mut records, &key, now);

        let record = records.entry(key).or_insert(AttemptRecord {
            failures: 0,
            locked_until: None,
        });

        record.failures += 1;
        if record.failures >= self.max_attempts {
            record.failures = 0;
            record.locked_until = Some(now + self.lock_window);
        }

        match record.locked_until {
            Some(until) if until > now => LockStatus {
                locked: true,
                retry_after_secs: retry_secs(until, now),
                remaining_attempts: 0,
            },
            _ => self.unlocked(record.failures),
        }
    }

    /// Forget everything about `identity`; called on successful login.
    pub fn clear(&self, identity: &str) {
        if let Some(key) = normalize_identity(identity) {
            self.records.lock().unwrap().remove(&key);
        }
    }

    fn unlocked(&self, failures: u32) -> LockStatus {
        LockStatus {
            locked: false,
            retry_after_secs: 0,
            remaining_attempts: self.max_attempts.saturating_sub(failures),
        }
    }
}

fn normalize_identity(identity: &str) -> Option<String> {
    let normalized = identity.trim().to_lowercase();
    (!normalized.is_empty()).then_some(normalized)
}

/// A lockout that already elapsed makes the whole record disposable.
fn drop_expired(records: &mut HashMap<String, AttemptRecord>, key: &str, now: Instant) {
    if let Some(record) = records.get(key) {
        if matches!(record.locked_until, Some(until) if until <= now) {
            records.remove(key);
        }
    }
}

fn retry_secs(until: Instant, now: Instant) -> u64 {
    let remaining = until.saturating_duration_since(now);
    (remaining.as_secs_f64().ceil() as u64).max(1)
}
