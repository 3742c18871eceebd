//! Scenario population counters
//!
//! The only state shared across user tasks. Plain atomics, injected through
//! an `Arc` rather than held globally.

use crate::user::UserKind;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct ScenarioCounters {
    normal_users: AtomicI64,
    maniac_users: AtomicI64,
    company_users: AtomicI64,
    normal_deletes: AtomicI64,
    maniac_deletes: AtomicI64,
    company_deletes: AtomicI64,
    devices_created: AtomicI64,
    devices_rolled_back: AtomicI64,
}

/// Point-in-time copy handed to the diagnostics reporter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountersSnapshot {
    pub normal_users: i64,
    pub maniac_users: i64,
    pub company_users: i64,
    pub normal_deletes: i64,
    pub maniac_deletes: i64,
    pub company_deletes: i64,
    pub devices_created: i64,
    pub devices_rolled_back: i64,
}

impl CountersSnapshot {
    pub fn total_active(&self) -> i64 {
        self.normal_users + self.maniac_users + self.company_users
    }
}

impl ScenarioCounters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn active_counter(&self, kind: UserKind) -> &AtomicI64 {
        match kind {
            UserKind::Normal => &self.normal_users,
            UserKind::Maniac => &self.maniac_users,
            UserKind::Company => &self.company_users,
        }
    }

    pub fn increment(&self, kind: UserKind) {
        self.active_counter(kind).fetch_add(1, Ordering::SeqCst);
    }

    /// Decrements the active count and records a deletion for the kind
    pub fn decrement(&self, kind: UserKind) {
        self.active_counter(kind).fetch_sub(1, Ordering::SeqCst);
        let deletes = match kind {
            UserKind::Normal => &self.normal_deletes,
            UserKind::Maniac => &self.maniac_deletes,
            UserKind::Company => &self.company_deletes,
        };
        deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active(&self, kind: UserKind) -> i64 {
        self.active_counter(kind).load(Ordering::SeqCst)
    }

    pub fn total_active(&self) -> i64 {
        self.active(UserKind::Normal) + self.active(UserKind::Maniac) + self.active(UserKind::Company)
    }

    pub fn record_device_created(&self) {
        self.devices_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_device_rolled_back(&self) {
        self.devices_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            normal_users: self.normal_users.load(Ordering::SeqCst),
            maniac_users: self.maniac_users.load(Ordering::SeqCst),
            company_users: self.company_users.load(Ordering::SeqCst),
            normal_deletes: self.normal_deletes.load(Ordering::Relaxed),
            maniac_deletes: self.maniac_deletes.load(Ordering::Relaxed),
            company_deletes: self.company_deletes.load(Ordering::Relaxed),
            devices_created: self.devices_created.load(Ordering::Relaxed),
            devices_rolled_back: self.devices_rolled_back.load(Ordering::Relaxed),
        }
    }
}

/// Holds one unit of population for `kind`; releases it on drop, including
/// when the owning task unwinds.
#[derive(Debug)]
pub struct PopulationGuard {
    counters: Arc<ScenarioCounters>,
    kind: UserKind,
}

impl PopulationGuard {
    /// Takes a unit that was already counted by the caller
    pub fn adopt(counters: Arc<ScenarioCounters>, kind: UserKind) -> Self {
        Self { counters, kind }
    }

    pub fn acquire(counters: Arc<ScenarioCounters>, kind: UserKind) -> Self {
        counters.increment(kind);
        Self::adopt(counters, kind)
    }

    pub fn kind(&self) -> UserKind {
        self.kind
    }
}

impl Drop for PopulationGuard {
    fn drop(&mut self) {
        self.counters.decrement(self.kind);
    }
}
