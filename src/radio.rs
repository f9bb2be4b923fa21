//! Radio-side collaborators
//!
//! The core never talks to the mesh directly. Outbound frames, controller
//! administration and upper-layer notifications go through these traits;
//! completions come back later as [`GatewayEvent`](crate::gateway::GatewayEvent)s
//! on the same event loop.

use crate::command::Scheme;
use crate::nodes::NodeId;
use crate::removal::FlowTicket;
use crate::Result;

/// Correlates a transmit completion with whoever sent the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxContext {
    /// Nobody waits for the completion
    None,
    /// Reachability probe sent by the removal flow
    RemovalProbe(FlowTicket),
}

/// One outbound frame
#[derive(Debug, Clone, Copy)]
pub struct SendRequest<'a> {
    /// Destination node
    pub target: NodeId,
    /// Frame bytes, command class first
    pub payload: &'a [u8],
    /// Scheme to encapsulate with
    pub scheme: Scheme,
    /// Echoed back in the completion
    pub context: TxContext,
}

/// Transmit completion status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitStatus {
    /// Acknowledged by the destination
    Ok,
    /// Sent but not acknowledged
    NoAck,
    /// Could not be sent
    Fail,
}

impl TransmitStatus {
    /// Whether the destination acknowledged
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Radio-level details of a completed transmission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxStatusDetail {
    /// Time on air in 10 ms ticks
    pub transmit_ticks: u16,
    /// Repeaters on the route used
    pub repeaters: u8,
    /// RSSI of the acknowledgement, if measured
    pub ack_rssi: Option<i8>,
}

/// Outbound frame transmission
pub trait Transport {
    /// Queue a frame for transmission
    ///
    /// The completion arrives later as a `SendDataDone` event carrying
    /// `request.context`.
    ///
    /// # Errors
    ///
    /// Returns error if the frame could not be queued; no completion will
    /// follow
    fn send_data(&mut self, request: SendRequest<'_>) -> Result<()>;
}

/// Outcome of a remove-failed-node operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveFailedStatus {
    /// Node removed from the controller
    Removed,
    /// Node answered; it is operating correctly and was kept
    NodeOk,
    /// Removal failed
    NotRemoved,
}

/// Controller administration
pub trait Controller {
    /// Start removing `node` from the network as a failed node
    ///
    /// The outcome arrives later as a `RemoveFailedDone` event carrying
    /// `ticket`.
    ///
    /// # Errors
    ///
    /// Returns error if the operation could not be started; no completion
    /// will follow
    fn remove_failed_node(&mut self, node: NodeId, ticket: FlowTicket) -> Result<()>;
}

/// Kind of controller update reported to the upper layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// A node was deleted from the network
    DeleteDone,
}

/// Controller update notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerUpdate {
    /// What happened
    pub kind: UpdateKind,
    /// Node concerned
    pub node: NodeId,
}

/// Upper-layer notification sink
pub trait UpdateListener {
    /// Deliver a controller update
    fn controller_update(&mut self, update: ControllerUpdate);
}
