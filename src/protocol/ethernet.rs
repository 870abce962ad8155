//! Ethernet frame parsing and construction

use super::{EtherType, MacAddr};
use crate::{Error, Result};

/// Minimum Ethernet header size (without FCS)
pub const MIN_FRAME_SIZE: usize = 14;

/// Parsed Ethernet frame (zero-copy reference)
#[derive(Debug)]
pub struct EthernetFrame<'a> {
    buffer: &'a [u8],
    /// Offset of the payload; 18 when an 802.1Q tag is present
    payload_offset: usize,
}

impl<'a> EthernetFrame<'a> {
    /// Parse an Ethernet frame from a buffer
    ///
    /// A single 802.1Q tag is skipped transparently; the reported
    /// ether-type is always the inner one.
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < MIN_FRAME_SIZE {
            return Err(Error::Parse("frame too short for ethernet header".into()));
        }

        let outer_type = u16::from_be_bytes([buffer[12], buffer[13]]);
        let payload_offset = if outer_type == EtherType::Vlan as u16 {
            if buffer.len() < 18 {
                return Err(Error::Parse("VLAN-tagged frame too short".into()));
            }
            18
        } else {
            14
        };

        Ok(Self {
            buffer,
            payload_offset,
        })
    }

    pub fn dst_mac(&self) -> MacAddr {
        let mut octets = [0u8; 6];
        octets.copy_from_slice(&self.buffer[0..6]);
        MacAddr(octets)
    }

    pub fn src_mac(&self) -> MacAddr {
        let mut octets = [0u8; 6];
        octets.copy_from_slice(&self.buffer[6..12]);
        MacAddr(octets)
    }

    /// The inner ether-type (past any 802.1Q tag)
    pub fn ether_type(&self) -> u16 {
        let offset = self.payload_offset - 2;
        u16::from_be_bytes([self.buffer[offset], self.buffer[offset + 1]])
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.buffer[self.payload_offset..]
    }
}

/// Builder for constructing Ethernet frames (ARP replies and probes)
pub struct FrameBuilder {
    buffer: Vec<u8>,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(64),
        }
    }

    pub fn dst_mac(mut self, mac: MacAddr) -> Self {
        self.buffer.extend_from_slice(&mac.0);
        self
    }

    pub fn src_mac(mut self, mac: MacAddr) -> Self {
        self.buffer.extend_from_slice(&mac.0);
        self
    }

    pub fn ether_type(mut self, ether_type: u16) -> Self {
        self.buffer.extend_from_slice(&ether_type.to_be_bytes());
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.buffer.extend_from_slice(payload);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buffer
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}
