//! Concurrent registry of per-client token buckets.
//!
//! One registry backs each admission gate. Entries are created lazily on a
//! client's first request and removed by the eviction sweep once idle for
//! longer than the configured threshold. The map is sharded (`DashMap`), so
//! request-path touches and the sweep contend per shard rather than on one
//! global lock, and the entry guard held across the touch-then-consume
//! sequence keeps both steps atomic with respect to a concurrent sweep of
//! the same identifier.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::one::RefMut;

use crate::bucket::TokenBucket;
use crate::config::RateProfile;

/// Rate-limiting state tracked for one client identifier.
#[derive(Debug)]
pub struct ClientEntry {
    /// The client's private token bucket.
    pub bucket: TokenBucket,
    /// When the client last made a request, admitted or not.
    pub last_seen: Instant,
}

/// Maps client identifiers to their buckets for a single endpoint class.
///
/// The registry owns the rate profile and stamps it onto every bucket it
/// creates; clients never carry configuration of their own.
#[derive(Debug)]
pub struct ClientRegistry {
    clients: DashMap<String, ClientEntry>,
    profile: RateProfile,
}

impl ClientRegistry {
    /// Creates an empty registry whose buckets use `profile`.
    pub fn new(profile: RateProfile) -> Self {
        Self {
            clients: DashMap::new(),
            profile,
        }
    }

    /// Returns the entry for `identifier`, creating it on first sight, and
    /// refreshes its `last_seen` stamp.
    ///
    /// Concurrent calls with the same new identifier race on the shard's
    /// write lock: exactly one creates the entry and the rest observe it.
    /// The returned guard locks the entry's shard; drop it before any await
    /// point.
    pub fn get_or_create(&self, identifier: &str) -> RefMut<'_, String, ClientEntry> {
        let mut entry = self
            .clients
            .entry(identifier.to_owned())
            .or_insert_with(|| ClientEntry {
                bucket: TokenBucket::new(self.profile),
                last_seen: Instant::now(),
            });
        entry.last_seen = Instant::now();
        entry
    }

    /// Runs one admission check for `identifier`: touch, then consume.
    ///
    /// The entry guard is held for the whole sequence, so the sweep cannot
    /// remove the entry between the timestamp update and the consume.
    pub fn admit(&self, identifier: &str) -> bool {
        self.get_or_create(identifier).bucket.try_consume()
    }

    /// Removes every entry idle for longer than `idle_threshold`.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self, idle_threshold: Duration) -> usize {
        self.sweep_at(Instant::now(), idle_threshold)
    }

    pub(crate) fn sweep_at(&self, now: Instant, idle_threshold: Duration) -> usize {
        let before = self.clients.len();
        self.clients
            .retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= idle_threshold);
        before.saturating_sub(self.clients.len())
    }

    /// Number of clients currently tracked.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` when no clients are tracked.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
