//! In-process radio simulation
//!
//! Stands in for the controller serial link when replaying captured
//! traffic. Completions are posted back through a [`GatewayHandle`] so
//! they arrive as later events, as they would from real hardware.

use std::collections::BTreeSet;

use crate::gateway::{GatewayEvent, GatewayHandle};
use crate::nodes::NodeId;
use crate::radio::{
    Controller, ControllerUpdate, RemoveFailedStatus, SendRequest, TransmitStatus, Transport,
    TxStatusDetail, UpdateListener,
};
use crate::removal::FlowTicket;
use crate::Result;

/// A frame the simulated transport accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    /// Destination node
    pub target: NodeId,
    /// Frame bytes
    pub payload: Vec<u8>,
    /// Status reported back
    pub status: TransmitStatus,
}

/// Transport that acknowledges every node except the unreachable ones
#[derive(Debug)]
pub struct SimTransport {
    handle: GatewayHandle,
    unreachable: BTreeSet<NodeId>,
    sent: Vec<SentFrame>,
}

impl SimTransport {
    /// Create a transport posting completions to `handle`
    #[must_use]
    pub fn new(handle: GatewayHandle, unreachable: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            handle,
            unreachable: unreachable.into_iter().collect(),
            sent: Vec::new(),
        }
    }

    /// Frames sent so far
    #[must_use]
    pub fn sent(&self) -> &[SentFrame] {
        &self.sent
    }
}

impl Transport for SimTransport {
    fn send_data(&mut self, request: SendRequest<'_>) -> Result<()> {
        let status = if self.unreachable.contains(&request.target) {
            TransmitStatus::NoAck
        } else {
            TransmitStatus::Ok
        };

        tracing::debug!(
            node_id = %request.target,
            scheme = %request.scheme,
            frame = %hex::encode(request.payload),
            ?status,
            "sim send"
        );

        self.handle.send(GatewayEvent::SendDataDone {
            status,
            detail: status.is_ok().then_some(TxStatusDetail {
                transmit_ticks: 1,
                repeaters: 0,
                ack_rssi: Some(-60),
            }),
            context: request.context,
        })?;

        self.sent.push(SentFrame {
            target: request.target,
            payload: request.payload.to_vec(),
            status,
        });
        Ok(())
    }
}

/// Controller that removes every failed node except the kept ones
#[derive(Debug)]
pub struct SimController {
    handle: GatewayHandle,
    keep: BTreeSet<NodeId>,
    requests: Vec<NodeId>,
}

impl SimController {
    /// Create a controller posting completions to `handle`
    #[must_use]
    pub fn new(handle: GatewayHandle, keep: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            handle,
            keep: keep.into_iter().collect(),
            requests: Vec::new(),
        }
    }

    /// Nodes removal was requested for, in order
    #[must_use]
    pub fn requests(&self) -> &[NodeId] {
        &self.requests
    }
}

impl Controller for SimController {
    fn remove_failed_node(&mut self, node: NodeId, ticket: FlowTicket) -> Result<()> {
        let status = if self.keep.contains(&node) {
            RemoveFailedStatus::NodeOk
        } else {
            RemoveFailedStatus::Removed
        };
        tracing::debug!(node_id = %node, ticket = %ticket, ?status, "sim remove failed node");

        self.handle
            .send(GatewayEvent::RemoveFailedDone { ticket, status })?;
        self.requests.push(node);
        Ok(())
    }
}

/// Upper layer that logs and records controller updates
#[derive(Debug, Default)]
pub struct UpdateLog {
    updates: Vec<ControllerUpdate>,
}

impl UpdateLog {
    /// Updates received so far
    #[must_use]
    pub fn updates(&self) -> &[ControllerUpdate] {
        &self.updates
    }
}

impl UpdateListener for UpdateLog {
    fn controller_update(&mut self, update: ControllerUpdate) {
        tracing::info!(node_id = %update.node, kind = ?update.kind, "controller update");
        self.updates.push(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Scheme;
    use crate::gateway::channel;
    use crate::radio::TxContext;

    #[test]
    fn unreachable_nodes_are_not_acked() {
        let (handle, mut events) = channel();
        let mut transport = SimTransport::new(handle, [NodeId::new(3)]);

        for node in [3, 4] {
            transport
                .send_data(SendRequest {
                    target: NodeId::new(node),
                    payload: &[0x00],
                    scheme: Scheme::None,
                    context: TxContext::None,
                })
                .unwrap();
        }

        let statuses: Vec<_> = transport.sent().iter().map(|f| f.status).collect();
        assert_eq!(statuses, vec![TransmitStatus::NoAck, TransmitStatus::Ok]);
        assert!(matches!(
            events.try_recv().unwrap(),
            GatewayEvent::SendDataDone {
                status: TransmitStatus::NoAck,
                detail: None,
                ..
            }
        ));
    }

    #[test]
    fn kept_nodes_report_ok() {
        let (handle, mut events) = channel();
        let mut controller = SimController::new(handle, [NodeId::new(8)]);
        let ticket = crate::removal::RemovalFlow::new(crate::removal::DEFAULT_PROBE_DELAY).ticket();

        controller.remove_failed_node(NodeId::new(8), ticket).unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            GatewayEvent::RemoveFailedDone {
                ticket,
                status: RemoveFailedStatus::NodeOk
            }
        );
        assert_eq!(controller.requests(), &[NodeId::new(8)]);
    }

    #[test]
    fn stopped_gateway_refuses_send() {
        let (handle, events) = channel();
        drop(events);
        let mut transport = SimTransport::new(handle, []);

        let result = transport.send_data(SendRequest {
            target: NodeId::new(1),
            payload: &[0x00],
            scheme: Scheme::None,
            context: TxContext::None,
        });

        assert!(result.is_err());
        assert!(transport.sent().is_empty());
    }
}
