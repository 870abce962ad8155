//! Control-plane components
//!
//! Per-switch learning state, the global address-resolution cache,
//! the static topology, the per-packet decision engine, and the flow
//! rule cache policy, tied together by the controller.

mod arp_engine;
mod channel;
mod controller;
mod decision;
pub mod flow_rule;
mod mac_table;
mod topology;

pub use arp_engine::{ArpEngine, ArpOutcome, Subnet, SubnetTable};
pub use channel::{DataplaneAction, DataplaneHandle, SwitchEvent};
pub use controller::Controller;
pub use decision::{decide, Decision, DropReason, PacketMeta};
pub use flow_rule::{FlowMatch, FlowRule, PortRef, RuleAction};
pub use mac_table::MacTable;
pub use topology::{PortId, Role, SwitchId, Topology};
