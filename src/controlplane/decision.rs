//! Forwarding decision engine
//!
//! `decide` is a pure function from packet metadata and read-only
//! state to a single `Decision`; it never touches the dataplane. The
//! apply step in `controller` turns a decision into packet-outs and
//! rule installs, so the logic here is testable without a simulated
//! dataplane.

use crate::controlplane::arp_engine::ArpEngine;
use crate::controlplane::mac_table::MacTable;
use crate::controlplane::topology::{PortId, SwitchId, Topology};
use crate::protocol::{EtherType, MacAddr};
use std::fmt;
use std::net::IpAddr;

/// Everything `decide` needs to know about one packet
#[derive(Debug, Clone)]
pub struct PacketMeta {
    pub switch: SwitchId,
    pub in_port: PortId,
    pub src_mac: MacAddr,
    pub dst_mac: MacAddr,
    pub ether_type: u16,
    /// Present when an IPv4/IPv6 header was recognized
    pub ip: Option<(IpAddr, IpAddr)>,
}

/// Why a packet was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Cross-subnet destination with no cached MAC binding
    UnresolvedDestination(IpAddr),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::UnresolvedDestination(ip) => {
                write!(f, "unresolved cross-subnet destination {ip}")
            }
        }
    }
}

/// The one decision made per packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Handled entirely by the controller; nothing to forward
    Consumed,
    /// Send out all ports except ingress; never cached
    Flood,
    /// Send out a learned port; cacheable as an L2 rule
    Forward { port: PortId },
    /// Inter-subnet: rewrite MACs and send out a learned port;
    /// cacheable as a routing rule pair
    Route {
        rewrite_src: MacAddr,
        rewrite_dst: MacAddr,
        port: PortId,
    },
    /// No forwarding possible; the packet is discarded
    Drop { reason: DropReason },
}

fn is_ip(ether_type: u16) -> bool {
    ether_type == EtherType::Ipv4 as u16 || ether_type == EtherType::Ipv6 as u16
}

/// Decide what to do with one packet
///
/// ARP and link-discovery frames never reach this function; the
/// controller consumes them first.
pub fn decide(
    meta: &PacketMeta,
    topology: &Topology,
    mac_table: &MacTable,
    arp: &ArpEngine,
) -> Decision {
    if topology.is_router(meta.switch) && is_ip(meta.ether_type) {
        if let Some((src_ip, dst_ip)) = meta.ip {
            let subnets = arp.subnets();
            let cross_subnet = match (subnets.resolve(src_ip), subnets.resolve(dst_ip)) {
                (Some(a), Some(b)) => a != b,
                _ => false,
            };
            if cross_subnet {
                return route_decision(meta, dst_ip, mac_table, arp);
            }
        }
    }

    switch_decision(meta, mac_table)
}

/// Inter-subnet branch, router switch only
fn route_decision(
    meta: &PacketMeta,
    dst_ip: IpAddr,
    mac_table: &MacTable,
    arp: &ArpEngine,
) -> Decision {
    let Some(dst_mac) = arp.cached_mac(dst_ip) else {
        // Never cache a rule for a destination we cannot place; the
        // apply step may still probe for it.
        return Decision::Drop {
            reason: DropReason::UnresolvedDestination(dst_ip),
        };
    };

    match mac_table.lookup(meta.switch, dst_mac) {
        Some(port) => {
            // Egress source MAC becomes the destination subnet's
            // gateway, as a physical router would stamp it.
            let gateway_mac = arp
                .subnets()
                .resolve(dst_ip)
                .map(|s| s.gateway_mac)
                .unwrap_or(meta.dst_mac);
            Decision::Route {
                rewrite_src: gateway_mac,
                rewrite_dst: dst_mac,
                port,
            }
        }
        // Binding known but port not learned yet: flood, uncached, so
        // a half-resolved destination cannot poison the rule cache.
        None => Decision::Flood,
    }
}

/// Plain L2 switching branch
fn switch_decision(meta: &PacketMeta, mac_table: &MacTable) -> Decision {
    if meta.dst_mac.is_multicast() {
        return Decision::Flood;
    }
    match mac_table.lookup(meta.switch, meta.dst_mac) {
        Some(port) => Decision::Forward { port },
        None => Decision::Flood,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlplane::arp_engine::{Subnet, SubnetTable};
    use crate::controlplane::topology::Role;
    use std::collections::HashMap;

    const ROUTER: SwitchId = SwitchId(2);
    const LEAF: SwitchId = SwitchId(6);
    const GW_A_MAC: MacAddr = MacAddr([0x0a, 0, 0, 0, 0, 1]);
    const GW_B_MAC: MacAddr = MacAddr([0x0a, 0, 0, 0, 0, 2]);
    const SRC_MAC: MacAddr = MacAddr([0, 0, 0, 0, 0, 0x0a]);
    const DST_MAC: MacAddr = MacAddr([0, 0, 0, 0, 0, 0x0b]);

    fn topology() -> Topology {
        let mut roles = HashMap::new();
        roles.insert(ROUTER, Role::EdgeRouter);
        roles.insert(LEAF, Role::Leaf);
        Topology::new(ROUTER, roles)
    }

    fn engine() -> ArpEngine {
        ArpEngine::new(SubnetTable::new(vec![
            Subnet {
                network: "10.1.1.0".parse().unwrap(),
                prefix_len: 24,
                gateway_ip: "10.1.1.254".parse().unwrap(),
                gateway_mac: GW_A_MAC,
            },
            Subnet {
                network: "10.0.0.0".parse().unwrap(),
                prefix_len: 24,
                gateway_ip: "10.0.0.254".parse().unwrap(),
                gateway_mac: GW_B_MAC,
            },
        ]))
    }

    fn ipv4_meta(switch: SwitchId, src: &str, dst: &str) -> PacketMeta {
        PacketMeta {
            switch,
            in_port: 3,
            src_mac: SRC_MAC,
            dst_mac: GW_A_MAC,
            ether_type: EtherType::Ipv4 as u16,
            ip: Some((src.parse().unwrap(), dst.parse().unwrap())),
        }
    }

    #[test]
    fn test_flood_fallback_for_unlearned_destination() {
        let meta = PacketMeta {
            switch: LEAF,
            in_port: 1,
            src_mac: SRC_MAC,
            dst_mac: DST_MAC,
            ether_type: EtherType::Ipv4 as u16,
            ip: Some(("10.1.1.1".parse().unwrap(), "10.1.1.2".parse().unwrap())),
        };
        let d = decide(&meta, &topology(), &MacTable::new(), &engine());
        assert_eq!(d, Decision::Flood);
    }

    #[test]
    fn test_broadcast_always_floods() {
        let table = MacTable::new();
        // Even a "learned" broadcast address must not unicast
        table.learn(LEAF, MacAddr::BROADCAST, 9);
        let meta = PacketMeta {
            switch: LEAF,
            in_port: 1,
            src_mac: SRC_MAC,
            dst_mac: MacAddr::BROADCAST,
            ether_type: 0x1234,
            ip: None,
        };
        assert_eq!(decide(&meta, &topology(), &table, &engine()), Decision::Flood);
    }

    #[test]
    fn test_learned_unicast_forwards() {
        let table = MacTable::new();
        table.learn(LEAF, DST_MAC, 2);
        let meta = PacketMeta {
            switch: LEAF,
            in_port: 1,
            src_mac: SRC_MAC,
            dst_mac: DST_MAC,
            ether_type: EtherType::Ipv4 as u16,
            ip: None,
        };
        assert_eq!(
            decide(&meta, &topology(), &table, &engine()),
            Decision::Forward { port: 2 }
        );
    }

    #[test]
    fn test_cross_subnet_routes_when_fully_resolved() {
        let table = MacTable::new();
        let arp = engine();
        arp.learn_binding("10.0.0.5".parse().unwrap(), DST_MAC);
        table.learn(ROUTER, DST_MAC, 7);

        let meta = ipv4_meta(ROUTER, "10.1.1.1", "10.0.0.5");
        assert_eq!(
            decide(&meta, &topology(), &table, &arp),
            Decision::Route {
                rewrite_src: GW_B_MAC,
                rewrite_dst: DST_MAC,
                port: 7,
            }
        );
    }

    #[test]
    fn test_cross_subnet_known_mac_unlearned_port_floods() {
        let arp = engine();
        arp.learn_binding("10.0.0.5".parse().unwrap(), DST_MAC);
        let meta = ipv4_meta(ROUTER, "10.1.1.1", "10.0.0.5");
        assert_eq!(decide(&meta, &topology(), &MacTable::new(), &arp), Decision::Flood);
    }

    #[test]
    fn test_cross_subnet_unknown_mac_drops() {
        let meta = ipv4_meta(ROUTER, "10.1.1.1", "10.0.0.5");
        let d = decide(&meta, &topology(), &MacTable::new(), &engine());
        assert_eq!(
            d,
            Decision::Drop {
                reason: DropReason::UnresolvedDestination("10.0.0.5".parse().unwrap()),
            }
        );
    }

    #[test]
    fn test_cross_subnet_off_router_is_plain_switching() {
        let table = MacTable::new();
        let arp = engine();
        arp.learn_binding("10.0.0.5".parse().unwrap(), DST_MAC);
        table.learn(LEAF, DST_MAC, 4);

        let mut meta = ipv4_meta(LEAF, "10.1.1.1", "10.0.0.5");
        meta.dst_mac = DST_MAC;
        assert_eq!(
            decide(&meta, &topology(), &table, &arp),
            Decision::Forward { port: 4 }
        );
    }

    #[test]
    fn test_same_subnet_on_router_is_plain_switching() {
        let table = MacTable::new();
        table.learn(ROUTER, DST_MAC, 5);
        let mut meta = ipv4_meta(ROUTER, "10.1.1.1", "10.1.1.2");
        meta.dst_mac = DST_MAC;
        assert_eq!(
            decide(&meta, &topology(), &table, &engine()),
            Decision::Forward { port: 5 }
        );
    }
}
