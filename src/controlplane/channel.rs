//! Dataplane channel
//!
//! The engine's only interface to the outside world: switch events
//! come in, rule installs and packet-outs go back. Sends are
//! fire-and-forget; a failed send is logged by the caller and the
//! already-computed decision is discarded. Wire encoding and the
//! connection lifecycle live with the transport, not here.

use crate::controlplane::flow_rule::{FlowRule, RuleAction};
use crate::controlplane::topology::{PortId, SwitchId};
use crate::{Error, Result};
use tokio::sync::mpsc;

/// An event delivered by a switch session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchEvent {
    SwitchConnected,
    PacketIn {
        in_port: PortId,
        /// Dataplane buffer holding the frame, when it kept one
        buffer_id: Option<u32>,
        data: Vec<u8>,
    },
}

/// An action the engine hands back to the dataplane
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataplaneAction {
    InstallRule(FlowRule),
    PacketOut {
        /// Reference the switch's buffered copy when present
        buffer_id: Option<u32>,
        in_port: PortId,
        actions: Vec<RuleAction>,
        /// Full payload; `None` when `buffer_id` is set
        data: Option<Vec<u8>>,
    },
}

/// Sending half of the channel toward the dataplane
#[derive(Debug, Clone)]
pub struct DataplaneHandle {
    tx: mpsc::UnboundedSender<(SwitchId, DataplaneAction)>,
}

impl DataplaneHandle {
    /// Create a handle and the receiver the transport drains
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(SwitchId, DataplaneAction)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Fire-and-forget send toward one switch
    pub fn send(&self, switch: SwitchId, action: DataplaneAction) -> Result<()> {
        self.tx
            .send((switch, action))
            .map_err(|_| Error::Channel(format!("dataplane receiver gone for {switch}")))
    }
}
