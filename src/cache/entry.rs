//! A single cache entry and the options controlling its expiry/tags/scope.
//! Spec.md §4.E / §6 "Entry options".

use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    pub absolute_expiration: Option<SystemTime>,
    pub absolute_expiration_relative_to_now: Option<Duration>,
    pub sliding_expiration: Option<Duration>,
    pub tags: Vec<String>,
    pub scope: Option<String>,
}

/// Fixed per-entry accounting overhead (struct fields, tag/scope strings,
/// allocator bookkeeping) charged toward `total_size` alongside the raw
/// value length. Spec.md §4.E/§8 byte-budget model.
const ENTRY_OVERHEAD_BYTES: usize = 96;

#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Vec<u8>,
    pub size: usize,
    pub tags: Vec<String>,
    pub scope: Option<String>,
    pub absolute_expiration: Option<SystemTime>,
    pub sliding_expiration: Option<Duration>,
    pub last_accessed: SystemTime,
}

impl Entry {
    pub fn new(value: Vec<u8>, now: SystemTime, opts: &SetOptions) -> Self {
        let absolute_expiration = earlier_of(
            opts.absolute_expiration,
            opts.absolute_expiration_relative_to_now.map(|d| now + d),
        );
        Entry {
            size: value.len() + ENTRY_OVERHEAD_BYTES,
            value,
            tags: opts.tags.clone(),
            scope: opts.scope.clone(),
            absolute_expiration,
            sliding_expiration: opts.sliding_expiration,
            last_accessed: now,
        }
    }

    /// `now ≥ absolute` or (for sliding) `now − last_accessed ≥ sliding`.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        if let Some(abs) = self.absolute_expiration {
            if now >= abs {
                return true;
            }
        }
        if let Some(sliding) = self.sliding_expiration {
            if now.duration_since(self.last_accessed).unwrap_or(Duration::ZERO) >= sliding {
                return true;
            }
        }
        false
    }

    pub fn touch(&mut self, now: SystemTime) {
        self.last_accessed = now;
    }
}

fn earlier_of(a: Option<SystemTime>, b: Option<SystemTime>) -> Option<SystemTime> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}
