//! Process-wide sync state: the last RRDP status and the timestamp cache.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use std::sync::{PoisonError, RwLock};
use time::OffsetDateTime;

/// Outcome of the most recent fetch attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RrdpState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<u64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub in_sync: bool,
}

impl RrdpState {
    pub fn synced(session_id: impl Into<String>, serial: u64) -> Self {
        Self {
            session_id: Some(session_id.into()),
            serial: Some(serial),
            created_at: OffsetDateTime::now_utc(),
            failure: None,
            in_sync: false,
        }
    }

    pub fn failed(failure: impl Into<String>) -> Self {
        Self {
            session_id: None,
            serial: None,
            created_at: OffsetDateTime::now_utc(),
            failure: Some(failure.into()),
            in_sync: false,
        }
    }

    /// Whether this state already describes `session_id` at `serial`.
    pub fn is_at(&self, session_id: &str, serial: u64) -> bool {
        self.session_id.as_deref() == Some(session_id) && self.serial == Some(serial)
    }
}

/// Timestamp cache entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Times {
    pub created_at: OffsetDateTime,
    pub last_mentioned: OffsetDateTime,
}

/// State shared between sync cycles.
#[derive(Debug, Default)]
pub struct State {
    rrdp_state: RwLock<Option<RrdpState>>,
    times: DashMap<String, Times>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rrdp_state(&self) -> Option<RrdpState> {
        self.rrdp_state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_rrdp_state(&self, state: RrdpState) {
        *self
            .rrdp_state
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(state);
    }

    /// Flag the current state as fully published.
    pub fn mark_in_sync(&self) {
        if let Some(state) = self
            .rrdp_state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            state.in_sync = true;
        }
    }

    /// Return the creation time cached for `hash`, computing it on first sight.
    ///
    /// `compute_created_at` runs at most once per hash while the entry exists,
    /// under the map's shard lock, so it must not call back into this cache.
    /// Every call bumps `last_mentioned` to `now` unless it is already later.
    pub fn cache_timestamp(
        &self,
        hash: &str,
        now: OffsetDateTime,
        compute_created_at: impl FnOnce() -> OffsetDateTime,
    ) -> OffsetDateTime {
        match self.times.entry(hash.to_string()) {
            Entry::Occupied(mut entry) => {
                let times = entry.get_mut();
                if now > times.last_mentioned {
                    times.last_mentioned = now;
                }
                times.created_at
            }
            Entry::Vacant(entry) => {
                let created_at = compute_created_at();
                entry.insert(Times {
                    created_at,
                    last_mentioned: now,
                });
                created_at
            }
        }
    }

    /// Evict entries last mentioned before `cutoff`. Returns the number removed.
    pub fn remove_stale(&self, cutoff: OffsetDateTime) -> usize {
        let before = self.times.len();
        self.times.retain(|_, times| times.last_mentioned >= cutoff);
        before.saturating_sub(self.times.len())
    }

    pub fn times(&self, hash: &str) -> Option<Times> {
        self.times.get(hash).map(|t| *t)
    }

    pub fn cached_entries(&self) -> usize {
        self.times.len()
    }
}
