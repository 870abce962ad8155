//! Fabric controller
//!
//! Glues the classifier, learning table, address resolution engine,
//! and decision engine to the dataplane channel. Event handling is
//! synchronous per packet; sessions for different switches run as
//! independent tasks and share the controller through `Arc`.

use crate::controlplane::arp_engine::{ArpEngine, ArpOutcome, SubnetTable};
use crate::controlplane::channel::{DataplaneAction, DataplaneHandle, SwitchEvent};
use crate::controlplane::decision::{decide, Decision, DropReason, PacketMeta};
use crate::controlplane::flow_rule::{self, FlowRule, PortRef, RuleAction};
use crate::controlplane::mac_table::MacTable;
use crate::controlplane::topology::{PortId, SwitchId, Topology};
use crate::protocol::arp::{ArpOp, ArpPacket};
use crate::protocol::classifier::{classify, PacketKind};
use crate::protocol::MacAddr;
use crate::telemetry::MetricsRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

pub struct Controller {
    topology: Topology,
    mac_table: MacTable,
    arp: ArpEngine,
    dataplane: DataplaneHandle,
    metrics: Arc<MetricsRegistry>,
}

impl Controller {
    pub fn new(
        topology: Topology,
        subnets: SubnetTable,
        dataplane: DataplaneHandle,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            topology,
            mac_table: MacTable::new(),
            arp: ArpEngine::new(subnets),
            dataplane,
            metrics,
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Dispatch one event from a switch session
    pub fn handle_event(&self, switch: SwitchId, event: SwitchEvent) {
        match event {
            SwitchEvent::SwitchConnected => self.on_connect(switch),
            SwitchEvent::PacketIn {
                in_port,
                buffer_id,
                data,
            } => self.on_packet_in(switch, in_port, buffer_id, &data),
        }
    }

    /// A switch joined: give it the permanent table-miss rule so
    /// every unmatched packet reaches the controller.
    fn on_connect(&self, switch: SwitchId) {
        info!(%switch, role = ?self.topology.role(switch), "switch connected");
        self.install(switch, flow_rule::table_miss());
    }

    fn on_packet_in(&self, switch: SwitchId, in_port: PortId, buffer_id: Option<u32>, data: &[u8]) {
        let chain = match classify(data) {
            Ok(chain) => chain,
            Err(e) => {
                // Malformed frame: drop with no state mutation
                debug!(%switch, in_port, error = %e, "dropping unparseable frame");
                self.metrics.global().drops.inc();
                return;
            }
        };

        if chain.is_link_discovery() {
            trace!(%switch, in_port, "ignoring link-discovery frame");
            self.metrics.global().link_discovery_ignored.inc();
            return;
        }

        let src_mac = chain.eth.src_mac();
        let dst_mac = chain.eth.dst_mac();
        self.metrics.global().packets_in.inc();
        self.metrics.switch(switch).packets_in.inc();
        debug!(%switch, in_port, %src_mac, %dst_mac, ether_type = chain.ether_type, "packet in");

        self.mac_table.learn(switch, src_mac, in_port);

        match &chain.kind {
            PacketKind::Arp(arp) if arp.operation == ArpOp::Request => {
                self.on_arp_request(switch, in_port, buffer_id, data, arp);
                return;
            }
            PacketKind::Arp(arp) => {
                // Replies update the cache, then travel as ordinary
                // unicast so they still reach the original requester.
                self.arp.learn_binding(arp.sender_ip.into(), arp.sender_mac);
            }
            _ => {}
        }

        let meta = PacketMeta {
            switch,
            in_port,
            src_mac,
            dst_mac,
            ether_type: chain.ether_type,
            ip: chain.ip_pair(),
        };
        let decision = decide(&meta, &self.topology, &self.mac_table, &self.arp);
        trace!(%switch, ?decision, "decision");
        self.apply(&meta, buffer_id, data, decision);
    }

    fn on_arp_request(
        &self,
        switch: SwitchId,
        in_port: PortId,
        buffer_id: Option<u32>,
        data: &[u8],
        arp: &ArpPacket,
    ) {
        let on_router = self.topology.is_router(switch);
        match self.arp.handle_request(switch, on_router, arp) {
            ArpOutcome::Reply(frame) => {
                self.metrics.global().arp_replies.inc();
                self.packet_out(switch, None, in_port, vec![RuleAction::Output(PortRef::InPort)], Some(frame));
            }
            ArpOutcome::ReplyWithProbe { reply, probe } => {
                self.metrics.global().arp_replies.inc();
                self.packet_out(switch, None, in_port, vec![RuleAction::Output(PortRef::InPort)], Some(reply));
                self.packet_out(switch, None, in_port, vec![RuleAction::Output(PortRef::Flood)], Some(probe));
            }
            ArpOutcome::Flood => {
                self.metrics.global().floods.inc();
                self.packet_out(
                    switch,
                    buffer_id,
                    in_port,
                    vec![RuleAction::Output(PortRef::Flood)],
                    payload(buffer_id, data),
                );
            }
        }
    }

    /// Turn a decision into dataplane actions: exactly one send for
    /// every forwarding branch, plus zero, one, or two rule installs.
    fn apply(&self, meta: &PacketMeta, buffer_id: Option<u32>, data: &[u8], decision: Decision) {
        match decision {
            Decision::Consumed => {}
            Decision::Flood => {
                // Never cached: an unknown destination must keep
                // reaching the controller until it is learned.
                self.metrics.global().floods.inc();
                self.forward_frame(meta, buffer_id, data, PortRef::Flood);
            }
            Decision::Forward { port } => {
                self.metrics.global().forwards.inc();
                self.install(meta.switch, flow_rule::l2_unicast(meta.dst_mac, port));
                self.forward_frame(meta, buffer_id, data, PortRef::Physical(port));
            }
            Decision::Route {
                rewrite_src,
                rewrite_dst,
                port,
            } => {
                self.metrics.global().routes.inc();
                self.install_route_pair(meta, rewrite_src, rewrite_dst, port);
                let actions = vec![
                    RuleAction::SetEthSrc(rewrite_src),
                    RuleAction::SetEthDst(rewrite_dst),
                    RuleAction::Output(PortRef::Physical(port)),
                ];
                self.packet_out(meta.switch, buffer_id, meta.in_port, actions, payload(buffer_id, data));
            }
            Decision::Drop { reason } => {
                self.metrics.global().drops.inc();
                debug!(switch = %meta.switch, %reason, "dropping packet");
                if let DropReason::UnresolvedDestination(dst) = reason {
                    if let Some(probe) = self.arp.probe_for(dst) {
                        self.packet_out(
                            meta.switch,
                            None,
                            meta.in_port,
                            vec![RuleAction::Output(PortRef::Flood)],
                            Some(probe),
                        );
                    }
                }
            }
        }
    }

    /// Install the forward routing rule and its mirrored reverse so
    /// return traffic needs no further controller involvement.
    fn install_route_pair(
        &self,
        meta: &PacketMeta,
        rewrite_src: MacAddr,
        rewrite_dst: MacAddr,
        port: PortId,
    ) {
        let Some((src_ip, dst_ip)) = meta.ip else {
            return;
        };
        self.install(
            meta.switch,
            flow_rule::route_unicast(meta.ether_type, src_ip, dst_ip, rewrite_src, rewrite_dst, port),
        );
        // Return direction: source MAC becomes the requester's own
        // gateway, destination the requester itself, out the port the
        // packet came in on.
        let src_gateway = self
            .arp
            .subnets()
            .resolve(src_ip)
            .map(|s| s.gateway_mac)
            .unwrap_or(meta.src_mac);
        self.install(
            meta.switch,
            flow_rule::route_unicast(
                meta.ether_type,
                dst_ip,
                src_ip,
                src_gateway,
                meta.src_mac,
                meta.in_port,
            ),
        );
    }

    fn forward_frame(&self, meta: &PacketMeta, buffer_id: Option<u32>, data: &[u8], out: PortRef) {
        self.packet_out(
            meta.switch,
            buffer_id,
            meta.in_port,
            vec![RuleAction::Output(out)],
            payload(buffer_id, data),
        );
    }

    fn install(&self, switch: SwitchId, rule: FlowRule) {
        self.metrics.global().rules_installed.inc();
        self.emit(switch, DataplaneAction::InstallRule(rule));
    }

    fn packet_out(
        &self,
        switch: SwitchId,
        buffer_id: Option<u32>,
        in_port: PortId,
        actions: Vec<RuleAction>,
        data: Option<Vec<u8>>,
    ) {
        self.emit(
            switch,
            DataplaneAction::PacketOut {
                buffer_id,
                in_port,
                actions,
                data,
            },
        );
    }

    /// Fire-and-forget; a dead channel costs the decision, nothing else
    fn emit(&self, switch: SwitchId, action: DataplaneAction) {
        if let Err(e) = self.dataplane.send(switch, action) {
            warn!(%switch, error = %e, "discarding dataplane action");
        }
    }

    /// Run the event loop: one concurrently active session per switch,
    /// events within a session handled in arrival order.
    pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<(SwitchId, SwitchEvent)>) {
        let mut sessions: HashMap<SwitchId, mpsc::UnboundedSender<SwitchEvent>> = HashMap::new();
        while let Some((switch, event)) = events.recv().await {
            let session = sessions.entry(switch).or_insert_with(|| {
                let (tx, mut rx) = mpsc::unbounded_channel();
                let controller = Arc::clone(&self);
                tokio::spawn(async move {
                    while let Some(event) = rx.recv().await {
                        controller.handle_event(switch, event);
                    }
                });
                tx
            });
            if session.send(event).is_err() {
                sessions.remove(&switch);
            }
        }
    }
}

/// Payload for a packet-out: the buffered copy when the dataplane
/// holds one, else the full raw bytes.
fn payload(buffer_id: Option<u32>, data: &[u8]) -> Option<Vec<u8>> {
    if buffer_id.is_some() {
        None
    } else {
        Some(data.to_vec())
    }
}
