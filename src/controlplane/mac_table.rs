//! MAC learning table
//!
//! Per-switch address-to-port memory. Sharded by switch: the outer
//! lock is taken only to find or create a shard, entry updates contend
//! only on the owning switch's lock. Entries are last-write-wins and
//! never expire; a stale port is corrected by the next frame seen from
//! that address.

use crate::controlplane::topology::{PortId, SwitchId};
use crate::protocol::MacAddr;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

type Shard = Arc<Mutex<HashMap<MacAddr, PortId>>>;

#[derive(Debug, Default)]
pub struct MacTable {
    shards: RwLock<HashMap<SwitchId, Shard>>,
}

impl MacTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn shard(&self, switch: SwitchId) -> Shard {
        if let Some(shard) = self.shards.read().unwrap().get(&switch) {
            return Arc::clone(shard);
        }
        let mut shards = self.shards.write().unwrap();
        Arc::clone(shards.entry(switch).or_default())
    }

    /// Record that `mac` was seen entering `switch` on `port`
    ///
    /// Idempotent upsert; repeating the same observation changes
    /// nothing, a different port overwrites.
    pub fn learn(&self, switch: SwitchId, mac: MacAddr, port: PortId) {
        self.shard(switch).lock().unwrap().insert(mac, port);
    }

    /// Last observed ingress port for (switch, mac)
    pub fn lookup(&self, switch: SwitchId, mac: MacAddr) -> Option<PortId> {
        let shard = {
            let shards = self.shards.read().unwrap();
            shards.get(&switch).map(Arc::clone)
        };
        shard.and_then(|s| s.lock().unwrap().get(&mac).copied())
    }

    /// Number of learned entries on one switch
    pub fn len(&self, switch: SwitchId) -> usize {
        let shards = self.shards.read().unwrap();
        shards.get(&switch).map_or(0, |s| s.lock().unwrap().len())
    }

    pub fn is_empty(&self, switch: SwitchId) -> bool {
        self.len(switch) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SW: SwitchId = SwitchId(7);
    const MAC: MacAddr = MacAddr([0, 0, 0, 0, 0, 0xb]);

    #[test]
    fn test_learn_is_idempotent() {
        let table = MacTable::new();
        table.learn(SW, MAC, 3);
        table.learn(SW, MAC, 3);
        assert_eq!(table.lookup(SW, MAC), Some(3));
        assert_eq!(table.len(SW), 1);
    }

    #[test]
    fn test_relearn_overrides_port() {
        let table = MacTable::new();
        table.learn(SW, MAC, 3);
        table.learn(SW, MAC, 5);
        assert_eq!(table.lookup(SW, MAC), Some(5));
        assert_eq!(table.len(SW), 1);
    }

    #[test]
    fn test_unlearned_is_none() {
        let table = MacTable::new();
        assert_eq!(table.lookup(SW, MAC), None);
        assert!(table.is_empty(SW));
    }

    #[test]
    fn test_switches_are_independent() {
        let table = MacTable::new();
        table.learn(SwitchId(1), MAC, 2);
        table.learn(SwitchId(2), MAC, 9);
        assert_eq!(table.lookup(SwitchId(1), MAC), Some(2));
        assert_eq!(table.lookup(SwitchId(2), MAC), Some(9));
    }

    #[test]
    fn test_concurrent_learning_does_not_corrupt() {
        let table = Arc::new(MacTable::new());
        let mut handles = Vec::new();
        for t in 0..4u64 {
            let table = Arc::clone(&table);
            handles.push(std::thread::spawn(move || {
                for i in 0..100u32 {
                    let mac = MacAddr([0, 0, 0, 0, t as u8, i as u8]);
                    table.learn(SwitchId(t), mac, i);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        for t in 0..4u64 {
            assert_eq!(table.len(SwitchId(t)), 100);
        }
    }
}
