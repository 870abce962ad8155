//! Flow rule cache policy
//!
//! Rule construction lives here so priorities and timeouts cannot
//! drift between call sites. The engine only ever adds rules; expiry
//! is solely by idle-timeout.
//!
//! Priority ladder: table-miss below everything, L2 unicast cache
//! above it, routing cache above L2 so inter-subnet traffic on the
//! router switch is routed before it can be bridged.

use crate::controlplane::topology::PortId;
use crate::protocol::MacAddr;
use std::net::IpAddr;

/// Table-miss: permanent, matches everything, punts to the controller
pub const PRIORITY_TABLE_MISS: u16 = 0;
/// Cached L2 unicast forwarding decision
pub const PRIORITY_L2: u16 = 1;
/// Cached inter-subnet routing decision; must stay above L2
pub const PRIORITY_ROUTE: u16 = 2;

/// Idle-timeout for cached L2 decisions (seconds)
pub const L2_IDLE_TIMEOUT_SECS: u16 = 60;
/// Idle-timeout for cached routing decisions (seconds)
pub const ROUTE_IDLE_TIMEOUT_SECS: u16 = 120;

/// Output target of a rule action or packet-out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortRef {
    Physical(PortId),
    /// All ports except ingress
    Flood,
    /// Punt to the controller
    Controller,
    /// Reflect out the ingress port
    InPort,
}

/// A single dataplane action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleAction {
    Output(PortRef),
    SetEthSrc(MacAddr),
    SetEthDst(MacAddr),
}

/// Match fields; `None` is a wildcard
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowMatch {
    pub in_port: Option<PortId>,
    pub eth_src: Option<MacAddr>,
    pub eth_dst: Option<MacAddr>,
    pub eth_type: Option<u16>,
    pub ip_src: Option<IpAddr>,
    pub ip_dst: Option<IpAddr>,
}

impl FlowMatch {
    /// Match every packet
    pub fn any() -> Self {
        Self::default()
    }
}

/// A rule to be installed into a switch's flow table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRule {
    pub priority: u16,
    pub matches: FlowMatch,
    pub actions: Vec<RuleAction>,
    /// Seconds of inactivity before the dataplane expires the rule;
    /// 0 means permanent
    pub idle_timeout: u16,
}

/// The permanent rule ensuring unmatched packets reach the controller
pub fn table_miss() -> FlowRule {
    FlowRule {
        priority: PRIORITY_TABLE_MISS,
        matches: FlowMatch::any(),
        actions: vec![RuleAction::Output(PortRef::Controller)],
        idle_timeout: 0,
    }
}

/// Cache a plain switching decision: destination MAC out of a port
///
/// Matches on destination MAC only. A MAC that moves to another port
/// keeps hitting this rule until the idle-timeout lapses, since rules
/// are never removed.
pub fn l2_unicast(dst_mac: MacAddr, port: PortId) -> FlowRule {
    FlowRule {
        priority: PRIORITY_L2,
        matches: FlowMatch {
            eth_dst: Some(dst_mac),
            ..FlowMatch::any()
        },
        actions: vec![RuleAction::Output(PortRef::Physical(port))],
        idle_timeout: L2_IDLE_TIMEOUT_SECS,
    }
}

/// Cache one direction of an inter-subnet routing decision
///
/// Matches (ether-type, source address, destination address) and
/// rewrites both MACs before output.
pub fn route_unicast(
    eth_type: u16,
    ip_src: IpAddr,
    ip_dst: IpAddr,
    new_eth_src: MacAddr,
    new_eth_dst: MacAddr,
    port: PortId,
) -> FlowRule {
    FlowRule {
        priority: PRIORITY_ROUTE,
        matches: FlowMatch {
            eth_type: Some(eth_type),
            ip_src: Some(ip_src),
            ip_dst: Some(ip_dst),
            ..FlowMatch::any()
        },
        actions: vec![
            RuleAction::SetEthSrc(new_eth_src),
            RuleAction::SetEthDst(new_eth_dst),
            RuleAction::Output(PortRef::Physical(port)),
        ],
        idle_timeout: ROUTE_IDLE_TIMEOUT_SECS,
    }
}
