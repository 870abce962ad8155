//! Switch/topology registry
//!
//! Static mapping of switch identity to fabric role plus the identity
//! of the designated router switch. Built once from configuration and
//! never mutated afterwards.

use std::collections::HashMap;
use std::fmt;

/// Datapath identity of a switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SwitchId(pub u64);

impl fmt::Display for SwitchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dpid:{}", self.0)
    }
}

/// Per-switch port identity
pub type PortId = u32;

/// Fabric role of a switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Outside the data center proper
    External,
    /// Designated inter-subnet router
    EdgeRouter,
    /// Aggregation layer
    Spine,
    /// Access layer
    Leaf,
}

/// Static switch-role table plus the designated router
#[derive(Debug, Clone)]
pub struct Topology {
    roles: HashMap<SwitchId, Role>,
    router: SwitchId,
}

impl Topology {
    pub fn new(router: SwitchId, roles: HashMap<SwitchId, Role>) -> Self {
        Self { roles, router }
    }

    /// Role of a switch, if configured
    pub fn role(&self, switch: SwitchId) -> Option<Role> {
        self.roles.get(&switch).copied()
    }

    /// The switch designated to perform inter-subnet routing
    pub fn router(&self) -> SwitchId {
        self.router
    }

    pub fn is_router(&self, switch: SwitchId) -> bool {
        switch == self.router
    }
}
