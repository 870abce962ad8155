//! Frame parsing and classification
//!
//! Only the headers the decision engine actually consults are parsed:
//! ethernet, ARP, and the address fields of IPv4/IPv6.

pub mod arp;
pub mod classifier;
pub mod ethernet;
pub mod ipv4;
pub mod ipv6;
pub mod types;

pub use classifier::{classify, HeaderChain, PacketKind};
pub use types::{EtherType, MacAddr};
