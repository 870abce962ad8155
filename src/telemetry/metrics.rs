//! Engine counters
//!
//! Thread-safe counters for decision statistics, global and per
//! switch.

use crate::controlplane::SwitchId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Atomic counter for thread-safe increment operations.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Decision statistics, one instance globally and one per switch.
#[derive(Debug, Default)]
pub struct EngineStats {
    pub packets_in: Counter,
    pub link_discovery_ignored: Counter,
    pub arp_replies: Counter,
    pub floods: Counter,
    pub forwards: Counter,
    pub routes: Counter,
    pub drops: Counter,
    pub rules_installed: Counter,
}

/// Registry of engine statistics.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    global: EngineStats,
    per_switch: RwLock<HashMap<SwitchId, Arc<EngineStats>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(&self) -> &EngineStats {
        &self.global
    }

    /// Stats bucket for one switch, created on first use
    pub fn switch(&self, switch: SwitchId) -> Arc<EngineStats> {
        if let Some(stats) = self.per_switch.read().unwrap().get(&switch) {
            return Arc::clone(stats);
        }
        let mut map = self.per_switch.write().unwrap();
        Arc::clone(map.entry(switch).or_default())
    }

    /// Switches with recorded statistics
    pub fn switches(&self) -> Vec<SwitchId> {
        let mut ids: Vec<_> = self.per_switch.read().unwrap().keys().copied().collect();
        ids.sort();
        ids
    }
}
