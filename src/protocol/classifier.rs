//! Packet classifier
//!
//! Turns raw frame bytes into a header chain the decision engine can
//! consult. Link-discovery traffic (LLDP) is tagged so the caller can
//! consume it without touching any state.

use super::arp::ArpPacket;
use super::ethernet::EthernetFrame;
use super::ipv4::Ipv4Header;
use super::ipv6::Ipv6Header;
use super::types::EtherType;
use crate::Result;
use std::net::IpAddr;

/// Protocol-specific tail of a classified frame
#[derive(Debug)]
pub enum PacketKind<'a> {
    /// Link-discovery control traffic; consume, never learn or forward
    LinkDiscovery,
    Arp(ArpPacket),
    Ipv4(Ipv4Header<'a>),
    Ipv6(Ipv6Header<'a>),
    /// Any other ether-type; handled by plain L2 switching
    Other,
}

/// A classified frame: ethernet header plus the recognized upper layer
#[derive(Debug)]
pub struct HeaderChain<'a> {
    pub eth: EthernetFrame<'a>,
    pub ether_type: u16,
    pub kind: PacketKind<'a>,
}

impl<'a> HeaderChain<'a> {
    pub fn is_link_discovery(&self) -> bool {
        matches!(self.kind, PacketKind::LinkDiscovery)
    }

    /// Source/destination addresses when an IP header was recognized
    pub fn ip_pair(&self) -> Option<(IpAddr, IpAddr)> {
        match &self.kind {
            PacketKind::Ipv4(hdr) => Some((hdr.src_addr().into(), hdr.dst_addr().into())),
            PacketKind::Ipv6(hdr) => Some((hdr.src_addr().into(), hdr.dst_addr().into())),
            _ => None,
        }
    }
}

/// Classify a raw frame
///
/// Fails only when the ethernet header itself is missing or truncated.
/// An unparseable upper-layer payload demotes the frame to
/// `PacketKind::Other` rather than failing: the ethernet header is
/// still sound, so plain switching can act on it.
pub fn classify(buffer: &[u8]) -> Result<HeaderChain<'_>> {
    let eth = EthernetFrame::parse(buffer)?;
    let ether_type = eth.ether_type();
    let payload = eth.payload();

    let kind = match EtherType::from_u16(ether_type) {
        Some(EtherType::Lldp) => PacketKind::LinkDiscovery,
        Some(EtherType::Arp) => match ArpPacket::parse(payload) {
            Ok(arp) => PacketKind::Arp(arp),
            Err(_) => PacketKind::Other,
        },
        Some(EtherType::Ipv4) => match Ipv4Header::parse(payload) {
            Ok(hdr) => PacketKind::Ipv4(hdr),
            Err(_) => PacketKind::Other,
        },
        Some(EtherType::Ipv6) => match Ipv6Header::parse(payload) {
            Ok(hdr) => PacketKind::Ipv6(hdr),
            Err(_) => PacketKind::Other,
        },
        _ => PacketKind::Other,
    };

    Ok(HeaderChain {
        eth,
        ether_type,
        kind,
    })
}
