//! Fabricd - Data-center fabric controller
//!
//! A control-plane decision engine for a software-defined data-center
//! fabric. For every frame reported by a switch it decides whether to
//! learn an address, answer an ARP query locally, forward along a
//! learned path, route across subnets, or flood - and which of those
//! decisions to cache as standing flow rules in the switch.

pub mod config;
pub mod controlplane;
pub mod error;
pub mod protocol;
pub mod telemetry;

pub use error::{Error, Result};
