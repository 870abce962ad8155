//! Address resolution engine
//!
//! Global IP-to-MAC cache, subnet membership tests, and gateway-aware
//! ARP reply synthesis. The cache is shared by every switch session
//! and guarded by a single lock; bindings are last-write-wins.

use crate::controlplane::topology::SwitchId;
use crate::protocol::arp::ArpPacket;
use crate::protocol::ethernet::FrameBuilder;
use crate::protocol::{EtherType, MacAddr};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Mutex;
use tracing::debug;

/// A statically configured subnet with its virtual gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subnet {
    pub network: IpAddr,
    pub prefix_len: u8,
    pub gateway_ip: IpAddr,
    /// MAC the controller answers with on behalf of the gateway
    pub gateway_mac: MacAddr,
}

impl Subnet {
    /// Whether `ip` falls inside this prefix
    ///
    /// Addresses of a different family never match.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(addr)) => {
                let mask = prefix_mask_v4(self.prefix_len);
                u32::from(net) & mask == u32::from(addr) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(addr)) => {
                let mask = prefix_mask_v6(self.prefix_len);
                u128::from(net) & mask == u128::from(addr) & mask
            }
            _ => false,
        }
    }
}

fn prefix_mask_v4(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - prefix_len.min(32))
    }
}

fn prefix_mask_v6(prefix_len: u8) -> u128 {
    if prefix_len == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix_len.min(128)))
    }
}

/// Ordered table of configured subnets
#[derive(Debug, Clone, Default)]
pub struct SubnetTable {
    subnets: Vec<Subnet>,
}

impl SubnetTable {
    pub fn new(subnets: Vec<Subnet>) -> Self {
        Self { subnets }
    }

    /// First configured subnet containing `ip`
    pub fn resolve(&self, ip: IpAddr) -> Option<&Subnet> {
        self.subnets.iter().find(|s| s.contains(ip))
    }

    /// True iff both addresses resolve to the same subnet
    pub fn same_subnet(&self, a: IpAddr, b: IpAddr) -> bool {
        match (self.resolve(a), self.resolve(b)) {
            (Some(sa), Some(sb)) => sa == sb,
            _ => false,
        }
    }

    /// Subnet whose gateway address is exactly `ip`
    pub fn gateway_subnet(&self, ip: IpAddr) -> Option<&Subnet> {
        self.subnets.iter().find(|s| s.gateway_ip == ip)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subnet> {
        self.subnets.iter()
    }
}

/// What to do with an ARP request after the engine evaluated it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArpOutcome {
    /// Send this synthesized reply frame out the ingress port
    Reply(Vec<u8>),
    /// Speculative gateway reply plus a resolution probe to flood
    ReplyWithProbe { reply: Vec<u8>, probe: Vec<u8> },
    /// Nothing known; let the request flood
    Flood,
}

/// Global ARP cache plus the static subnet table
#[derive(Debug, Default)]
pub struct ArpEngine {
    cache: Mutex<HashMap<IpAddr, MacAddr>>,
    subnets: SubnetTable,
}

impl ArpEngine {
    pub fn new(subnets: SubnetTable) -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            subnets,
        }
    }

    /// Record an ip-to-mac binding, overwriting any previous one
    pub fn learn_binding(&self, ip: IpAddr, mac: MacAddr) {
        self.cache.lock().unwrap().insert(ip, mac);
    }

    /// Cached MAC for an address, if any
    pub fn cached_mac(&self, ip: IpAddr) -> Option<MacAddr> {
        self.cache.lock().unwrap().get(&ip).copied()
    }

    /// Number of cached bindings
    pub fn cache_len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    pub fn subnets(&self) -> &SubnetTable {
        &self.subnets
    }

    /// Evaluate an ARP request seen on `switch`
    ///
    /// The sender binding is always learned first. `on_router` enables
    /// the speculative gateway reply for unresolved cross-subnet
    /// targets: the controller answers with the destination subnet's
    /// gateway MAC and simultaneously probes for the real host, so the
    /// requester can transmit immediately while resolution completes.
    /// That speculation is a deliberate policy of the router switch
    /// only; everywhere else an unresolved request floods.
    pub fn handle_request(&self, switch: SwitchId, on_router: bool, req: &ArpPacket) -> ArpOutcome {
        self.learn_binding(req.sender_ip.into(), req.sender_mac);

        let target: IpAddr = req.target_ip.into();

        // Requests for a gateway address are always answered by the
        // controller, whatever the cache holds.
        if let Some(subnet) = self.subnets.gateway_subnet(target) {
            debug!(%switch, target = %req.target_ip, "answering gateway ARP");
            return ArpOutcome::Reply(build_reply(subnet.gateway_mac, req));
        }

        let same = self.subnets.same_subnet(req.sender_ip.into(), target);
        if let Some(mac) = self.cached_mac(target) {
            // Known binding: answer directly, same subnet or not. A MAC
            // is only ever disclosed once it has actually been observed.
            debug!(%switch, target = %req.target_ip, %mac, same_subnet = same, "answering from cache");
            return ArpOutcome::Reply(build_reply(mac, req));
        }

        if on_router {
            if let Some(subnet) = self.subnets.resolve(target) {
                if let IpAddr::V4(gw_ip) = subnet.gateway_ip {
                    debug!(%switch, target = %req.target_ip, "speculative gateway reply + probe");
                    return ArpOutcome::ReplyWithProbe {
                        reply: build_reply(subnet.gateway_mac, req),
                        probe: build_probe(subnet.gateway_mac, gw_ip, req.target_ip),
                    };
                }
            }
        }

        ArpOutcome::Flood
    }

    /// Resolution probe for an unresolved destination, sourced from
    /// its subnet's gateway identity; `None` when no subnet matches or
    /// the gateway is not IPv4 (ARP cannot carry it).
    pub fn probe_for(&self, dst: IpAddr) -> Option<Vec<u8>> {
        let subnet = self.subnets.resolve(dst)?;
        match (subnet.gateway_ip, dst) {
            (IpAddr::V4(gw_ip), IpAddr::V4(target)) => {
                Some(build_probe(subnet.gateway_mac, gw_ip, target))
            }
            _ => None,
        }
    }
}

/// Synthesize a full reply frame answering `req` with `mac`
fn build_reply(mac: MacAddr, req: &ArpPacket) -> Vec<u8> {
    let arp = ArpPacket::reply(mac, req.target_ip, req.sender_mac, req.sender_ip);
    FrameBuilder::new()
        .dst_mac(req.sender_mac)
        .src_mac(mac)
        .ether_type(EtherType::Arp as u16)
        .payload(&arp.to_bytes())
        .build()
}

/// Broadcast who-has probe sourced from a gateway identity
fn build_probe(gateway_mac: MacAddr, gateway_ip: Ipv4Addr, target: Ipv4Addr) -> Vec<u8> {
    let arp = ArpPacket::request(gateway_mac, gateway_ip, target);
    FrameBuilder::new()
        .dst_mac(MacAddr::BROADCAST)
        .src_mac(gateway_mac)
        .ether_type(EtherType::Arp as u16)
        .payload(&arp.to_bytes())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::classifier::{classify, PacketKind};

    const GW_A_MAC: MacAddr = MacAddr([0x0a, 0, 0, 0, 0, 0x01]);
    const GW_B_MAC: MacAddr = MacAddr([0x0a, 0, 0, 0, 0, 0x02]);
    const HOST_MAC: MacAddr = MacAddr([0, 0, 0, 0, 0, 0x11]);

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

    fn request(sender_ip: &str, target_ip: &str) -> ArpPacket {
        ArpPacket::request(HOST_MAC, sender_ip.parse().unwrap(), target_ip.parse().unwrap())
    }

    fn parse_reply(frame: &[u8]) -> ArpPacket {
        let chain = classify(frame).unwrap();
        match chain.kind {
            PacketKind::Arp(arp) => arp,
            other => panic!("expected ARP, got {other:?}"),
        }
    }

    #[test]
    fn test_learn_binding_last_write_wins() {
        let engine = engine();
        let ip: IpAddr = "10.1.1.1".parse().unwrap();
        engine.learn_binding(ip, HOST_MAC);
        engine.learn_binding(ip, HOST_MAC);
        assert_eq!(engine.cache_len(), 1);
        let other = MacAddr([0, 0, 0, 0, 0, 0x22]);
        engine.learn_binding(ip, other);
        assert_eq!(engine.cached_mac(ip), Some(other));
        assert_eq!(engine.cache_len(), 1);
    }

    #[test]
    fn test_subnet_resolution() {
        let engine = engine();
        let subnets = engine.subnets();
        assert!(subnets.resolve("10.1.1.9".parse().unwrap()).is_some());
        assert!(subnets.resolve("192.168.0.1".parse().unwrap()).is_none());
        assert!(subnets.same_subnet("10.1.1.1".parse().unwrap(), "10.1.1.2".parse().unwrap()));
        assert!(!subnets.same_subnet("10.1.1.1".parse().unwrap(), "10.0.0.5".parse().unwrap()));
        // Unresolvable addresses are never "same subnet"
        assert!(!subnets.same_subnet("192.168.0.1".parse().unwrap(), "192.168.0.2".parse().unwrap()));
    }

    #[test]
    fn test_gateway_request_answered_regardless_of_cache() {
        let engine = engine();
        let req = request("10.1.1.1", "10.1.1.254");
        match engine.handle_request(SwitchId(2), false, &req) {
            ArpOutcome::Reply(frame) => {
                let reply = parse_reply(&frame);
                assert_eq!(reply.sender_mac, GW_A_MAC);
                assert_eq!(reply.sender_ip, "10.1.1.254".parse::<Ipv4Addr>().unwrap());
                assert_eq!(reply.target_mac, HOST_MAC);
            }
            other => panic!("expected reply, got {other:?}"),
        }
        // Sender was learned as a side effect
        assert_eq!(engine.cached_mac("10.1.1.1".parse().unwrap()), Some(HOST_MAC));
    }

    #[test]
    fn test_cached_same_subnet_answered() {
        let engine = engine();
        let peer = MacAddr([0, 0, 0, 0, 0, 0x33]);
        engine.learn_binding("10.1.1.2".parse().unwrap(), peer);
        let req = request("10.1.1.1", "10.1.1.2");
        match engine.handle_request(SwitchId(6), false, &req) {
            ArpOutcome::Reply(frame) => {
                assert_eq!(parse_reply(&frame).sender_mac, peer);
            }
            other => panic!("expected reply, got {other:?}"),
        }
    }

    #[test]
    fn test_cached_cross_subnet_disclosed() {
        let engine = engine();
        let peer = MacAddr([0, 0, 0, 0, 0, 0x44]);
        engine.learn_binding("10.0.0.5".parse().unwrap(), peer);
        let req = request("10.1.1.1", "10.0.0.5");
        match engine.handle_request(SwitchId(6), false, &req) {
            ArpOutcome::Reply(frame) => {
                assert_eq!(parse_reply(&frame).sender_mac, peer);
            }
            other => panic!("expected reply, got {other:?}"),
        }
    }

    #[test]
    fn test_unresolved_floods_off_router() {
        let engine = engine();
        let req = request("10.1.1.1", "10.0.0.5");
        assert_eq!(engine.handle_request(SwitchId(6), false, &req), ArpOutcome::Flood);
    }

    #[test]
    fn test_unresolved_on_router_speculates_and_probes() {
        let engine = engine();
        let req = request("10.1.1.1", "10.0.0.5");
        match engine.handle_request(SwitchId(2), true, &req) {
            ArpOutcome::ReplyWithProbe { reply, probe } => {
                // Speculative reply discloses the gateway MAC, not a host MAC
                assert_eq!(parse_reply(&reply).sender_mac, GW_B_MAC);
                let probe = parse_reply(&probe);
                assert_eq!(probe.operation, crate::protocol::arp::ArpOp::Request);
                assert_eq!(probe.sender_mac, GW_B_MAC);
                assert_eq!(probe.target_ip, "10.0.0.5".parse::<Ipv4Addr>().unwrap());
            }
            other => panic!("expected speculative reply, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_target_outside_any_subnet_floods_even_on_router() {
        let engine = engine();
        let req = request("10.1.1.1", "172.16.0.1");
        assert_eq!(engine.handle_request(SwitchId(2), true, &req), ArpOutcome::Flood);
    }

    #[test]
    fn test_v6_subnet_membership() {
        let subnet = Subnet {
            network: "2001:db8:2:1::".parse().unwrap(),
            prefix_len: 64,
            gateway_ip: "2001:db8:2:1::fffe".parse().unwrap(),
            gateway_mac: GW_A_MAC,
        };
        assert!(subnet.contains("2001:db8:2:1::7".parse().unwrap()));
        assert!(!subnet.contains("2001:db8:2:2::7".parse().unwrap()));
        assert!(!subnet.contains("10.0.0.1".parse().unwrap()));
    }
}
