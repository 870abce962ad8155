//! IPv6 header view - RFC 8200

use crate::{Error, Result};
use std::net::Ipv6Addr;

/// IPv6 header size (fixed)
pub const HEADER_SIZE: usize = 40;

/// Next-header value for ICMPv6
pub const NEXT_HEADER_ICMPV6: u8 = 58;

/// Parsed IPv6 header (zero-copy reference)
#[derive(Debug)]
pub struct Ipv6Header<'a> {
    buffer: &'a [u8],
}

impl<'a> Ipv6Header<'a> {
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < HEADER_SIZE {
            return Err(Error::Parse("IPv6 header too short".into()));
        }
        if buffer[0] >> 4 != 6 {
            return Err(Error::Parse("not an IPv6 packet".into()));
        }
        Ok(Self { buffer })
    }

    pub fn next_header(&self) -> u8 {
        self.buffer[6]
    }

    pub fn is_icmpv6(&self) -> bool {
        self.next_header() == NEXT_HEADER_ICMPV6
    }

    pub fn src_addr(&self) -> Ipv6Addr {
        let mut octets = [0u8; 16];
        octets.copy_from_slice(&self.buffer[8..24]);
        Ipv6Addr::from(octets)
    }

    pub fn dst_addr(&self) -> Ipv6Addr {
        let mut octets = [0u8; 16];
        octets.copy_from_slice(&self.buffer[24..40]);
        Ipv6Addr::from(octets)
    }
}
