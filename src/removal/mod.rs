//! Device removal flow
//!
//! Confirms and purges a node that reported a local reset:
//!
//! ```text
//! Idle ──arm──▶ ArmedTimer ──expiry──▶ ProbeSent ──tx done──▶ RemovalRequested
//!   ▲               │ arm (new target)                               │
//!   └───────────────┴────────── Completed(Removed|NotNeeded|Failed) ◀─┘
//! ```
//!
//! There is a single slot. Arming for a new node discards all progress on
//! the previous target; completions carrying an older [`FlowTicket`] are
//! ignored.

use std::fmt;
use std::time::{Duration, Instant};

use crate::command::{CommandClass, Scheme};
use crate::nodes::{NodeId, NodeState, NodeStore};
use crate::radio::{
    Controller, ControllerUpdate, RemoveFailedStatus, SendRequest, Transport, TransmitStatus,
    TxContext, UpdateKind, UpdateListener,
};

/// Delay between arming and probing
pub const DEFAULT_PROBE_DELAY: Duration = Duration::from_millis(2);

/// One-byte No Operation frame used to flush pending traffic before removal
const PROBE_FRAME: [u8; 1] = [CommandClass::NO_OPERATION.0];

/// Identifies one arming of the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowTicket(u64);

impl fmt::Display for FlowTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Terminal result of a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// Node removed and the upper layer notified
    Removed,
    /// Node still operating; nothing removed
    NotNeeded,
    /// Removal failed or could not start
    Failed,
}

/// Current position in the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalState {
    /// Never armed
    Idle,
    /// Waiting for the probe delay to expire
    ArmedTimer { deadline: Instant },
    /// Probe queued, waiting for its transmit completion
    ProbeSent,
    /// Remove-failed-node started, waiting for its status
    RemovalRequested,
    /// Finished; stays here until armed again
    Completed(RemovalOutcome),
}

/// Collaborators the flow drives
pub struct RemovalEnv<'a> {
    /// Resource directory updated on completion
    pub store: &'a mut NodeStore,
    /// Sends the probe
    pub transport: &'a mut dyn Transport,
    /// Removes the node
    pub controller: &'a mut dyn Controller,
    /// Receives the delete-done notification
    pub updates: &'a mut dyn UpdateListener,
}

/// Single-slot removal state machine
#[derive(Debug)]
pub struct RemovalFlow {
    delay: Duration,
    generation: u64,
    target: Option<NodeId>,
    state: RemovalState,
}

impl RemovalFlow {
    /// Idle flow probing `delay` after each arm
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            target: None,
            state: RemovalState::Idle,
        }
    }

    /// Probe delay
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> RemovalState {
        self.state
    }

    /// Node the flow is working on (or finished with)
    #[must_use]
    pub const fn target(&self) -> Option<NodeId> {
        self.target
    }

    /// Ticket of the current arming
    #[must_use]
    pub const fn ticket(&self) -> FlowTicket {
        FlowTicket(self.generation)
    }

    /// When the armed timer expires, if armed
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        match self.state {
            RemovalState::ArmedTimer { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Start (or restart) the flow for `node`
    ///
    /// Replaces any previous target and its timer.
    pub fn arm(&mut self, node: NodeId, now: Instant) -> FlowTicket {
        if let Some(previous) = self.target
            && !matches!(self.state, RemovalState::Completed(_))
        {
            tracing::debug!(
                node_id = %node,
                previous = %previous,
                state = ?self.state,
                "removal flow restarted, previous target discarded"
            );
        }

        self.generation = self.generation.wrapping_add(1);
        self.target = Some(node);
        self.state = RemovalState::ArmedTimer {
            deadline: now + self.delay,
        };

        tracing::info!(node_id = %node, ticket = %self.ticket(), "removal flow armed");
        self.ticket()
    }

    /// Fire the timer if it has expired by `now`
    ///
    /// Sends the probe to the target. Returns `true` if the timer fired.
    pub fn poll_timer(&mut self, now: Instant, env: &mut RemovalEnv<'_>) -> bool {
        let (Some(node), Some(deadline)) = (self.target, self.deadline()) else {
            return false;
        };
        if now < deadline {
            return false;
        }

        if let Some(record) = env.store.get_mut(node) {
            record.state = NodeState::Failing;
        }

        let ticket = self.ticket();
        self.state = RemovalState::ProbeSent;
        tracing::debug!(node_id = %node, ticket = %ticket, "sending probe");

        let request = SendRequest {
            target: node,
            payload: &PROBE_FRAME,
            scheme: Scheme::None,
            context: TxContext::RemovalProbe(ticket),
        };
        if let Err(e) = env.transport.send_data(request) {
            tracing::debug!(node_id = %node, error = %e, "probe not queued");
            self.on_probe_done(ticket, TransmitStatus::Fail, env);
        }
        true
    }

    /// Probe transmit completion
    ///
    /// Either status leads to the same remove-failed-node request; the
    /// probe only flushes pending traffic.
    pub fn on_probe_done(
        &mut self,
        ticket: FlowTicket,
        status: TransmitStatus,
        env: &mut RemovalEnv<'_>,
    ) {
        if !self.is_current(ticket, RemovalState::ProbeSent) {
            tracing::debug!(ticket = %ticket, ?status, "ignoring stale probe completion");
            return;
        }
        let Some(node) = self.target else {
            return;
        };

        if status.is_ok() {
            tracing::debug!(node_id = %node, "probe acknowledged, removing anyway");
        } else {
            tracing::debug!(node_id = %node, ?status, "probe failed, node unreachable");
        }

        self.state = RemovalState::RemovalRequested;
        if let Err(e) = env.controller.remove_failed_node(node, ticket) {
            tracing::debug!(node_id = %node, error = %e, "remove failed node not started");
            self.on_removal_status(ticket, RemoveFailedStatus::NotRemoved, env);
        }
    }

    /// Remove-failed-node completion
    pub fn on_removal_status(
        &mut self,
        ticket: FlowTicket,
        status: RemoveFailedStatus,
        env: &mut RemovalEnv<'_>,
    ) {
        if !self.is_current(ticket, RemovalState::RemovalRequested) {
            tracing::debug!(ticket = %ticket, ?status, "ignoring stale removal status");
            return;
        }
        let Some(node) = self.target else {
            return;
        };

        let outcome = match status {
            RemoveFailedStatus::Removed => {
                env.store.free(node);
                env.updates.controller_update(ControllerUpdate {
                    kind: UpdateKind::DeleteDone,
                    node,
                });
                tracing::info!(node_id = %node, "failed node removed");
                RemovalOutcome::Removed
            }
            RemoveFailedStatus::NodeOk => {
                if let Some(record) = env.store.get_mut(node) {
                    record.state = NodeState::Done;
                }
                tracing::info!(node_id = %node, "node is operating correctly");
                RemovalOutcome::NotNeeded
            }
            RemoveFailedStatus::NotRemoved => {
                tracing::warn!(node_id = %node, "remove failed node failed");
                RemovalOutcome::Failed
            }
        };

        self.state = RemovalState::Completed(outcome);
    }

    fn is_current(&self, ticket: FlowTicket, expected: RemovalState) -> bool {
        ticket == self.ticket() && self.state == expected
    }
}
