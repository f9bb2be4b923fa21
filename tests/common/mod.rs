//! Shared test utilities
#![allow(dead_code)]

use std::time::Duration;

use mesh_gateway::gateway::GatewayEvent;
use mesh_gateway::handlers;
use mesh_gateway::radio::{
    Controller, ControllerUpdate, SendRequest, TransmitStatus, Transport, TxContext,
    UpdateListener,
};
use mesh_gateway::{Connection, FlowTicket, Gateway, NodeId, NodeStore, Scheme};

/// A frame recorded by [`Radio`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub target: NodeId,
    pub payload: Vec<u8>,
    pub context: TxContext,
}

/// Records every outbound call instead of touching a radio
#[derive(Debug, Default)]
pub struct Radio {
    pub sent: Vec<Sent>,
    pub removals: Vec<(NodeId, FlowTicket)>,
    pub updates: Vec<ControllerUpdate>,
}

impl Transport for Radio {
    fn send_data(&mut self, request: SendRequest<'_>) -> mesh_gateway::Result<()> {
        self.sent.push(Sent {
            target: request.target,
            payload: request.payload.to_vec(),
            context: request.context,
        });
        Ok(())
    }
}

impl Controller for Radio {
    fn remove_failed_node(&mut self, node: NodeId, ticket: FlowTicket) -> mesh_gateway::Result<()> {
        self.removals.push((node, ticket));
        Ok(())
    }
}

impl UpdateListener for Radio {
    fn controller_update(&mut self, update: ControllerUpdate) {
        self.updates.push(update);
    }
}

pub type TestGateway = Gateway<Radio, Radio, Radio>;

pub const PROBE_DELAY: Duration = Duration::from_millis(2);

/// Gateway with the built-in handlers and the given nodes allocated
pub fn gateway_with_nodes(ids: &[u16]) -> TestGateway {
    let mut store = NodeStore::new();
    for &id in ids {
        store.allocate(NodeId::new(id)).expect("failed to allocate test node");
    }
    Gateway::new(
        store,
        handlers::builtin_registry(),
        PROBE_DELAY,
        Radio::default(),
        Radio::default(),
        Radio::default(),
    )
}

/// Device Reset Locally Notification from `node`
pub fn reset_notification(node: u16) -> GatewayEvent {
    GatewayEvent::Frame {
        connection: Connection::new(NodeId::new(node), Scheme::None),
        payload: vec![0x5A, 0x01],
    }
}

/// Completion for the most recent frame sent by `gw`
pub fn last_send_done(gw: &TestGateway, status: TransmitStatus) -> GatewayEvent {
    let sent = gw.transport().sent.last().expect("nothing was sent");
    GatewayEvent::SendDataDone {
        status,
        detail: None,
        context: sent.context,
    }
}
