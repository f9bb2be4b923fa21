//! Gateway event loop
//!
//! All core state lives on one task. Radio completions and inbound frames
//! arrive as [`GatewayEvent`]s through a [`GatewayHandle`]; the removal
//! timer is serviced between events. Nothing in the core blocks or locks.

use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::command::{
    Connection, DispatchOutcome, Dispatcher, HandlerContext, HandlerRegistry,
};
use crate::nodes::NodeStore;
use crate::radio::{
    Controller, RemoveFailedStatus, TransmitStatus, Transport, TxContext, TxStatusDetail,
    UpdateListener,
};
use crate::removal::{FlowTicket, RemovalEnv, RemovalFlow, RemovalState};
use crate::{Error, Result};

/// Something the gateway must react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// Inbound application frame
    Frame {
        /// Who sent it and how
        connection: Connection,
        /// Frame bytes, command class first
        payload: Vec<u8>,
    },
    /// Completion of an earlier `send_data`
    SendDataDone {
        /// Transmit result
        status: TransmitStatus,
        /// Radio details, if the transport reports them
        detail: Option<TxStatusDetail>,
        /// Context given with the request
        context: TxContext,
    },
    /// Completion of an earlier `remove_failed_node`
    RemoveFailedDone {
        /// Ticket given with the request
        ticket: FlowTicket,
        /// Removal result
        status: RemoveFailedStatus,
    },
    /// Stop the event loop
    Shutdown,
}

/// Receiving half of the event channel, consumed by [`Gateway::run`]
pub type EventReceiver = mpsc::UnboundedReceiver<GatewayEvent>;

/// Cloneable sender for gateway events
#[derive(Debug, Clone)]
pub struct GatewayHandle {
    tx: mpsc::UnboundedSender<GatewayEvent>,
}

/// Create a connected handle and receiver
#[must_use]
pub fn channel() -> (GatewayHandle, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (GatewayHandle { tx }, rx)
}

impl GatewayHandle {
    /// Post an event
    ///
    /// # Errors
    ///
    /// Returns error if the event loop has stopped
    pub fn send(&self, event: GatewayEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| Error::Stopped)
    }

    /// Post an inbound frame
    ///
    /// # Errors
    ///
    /// Returns error if the event loop has stopped
    pub fn frame(&self, connection: Connection, payload: impl Into<Vec<u8>>) -> Result<()> {
        self.send(GatewayEvent::Frame {
            connection,
            payload: payload.into(),
        })
    }

    /// Ask the event loop to stop after the events already queued
    ///
    /// # Errors
    ///
    /// Returns error if the event loop has already stopped
    pub fn shutdown(&self) -> Result<()> {
        self.send(GatewayEvent::Shutdown)
    }

    /// Whether the event loop has stopped
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

enum Step {
    Event(Option<GatewayEvent>),
    Timer,
}

/// The gateway core: directory, dispatch and removal on one event loop
pub struct Gateway<T, C, U> {
    store: NodeStore,
    dispatcher: Dispatcher,
    removal: RemovalFlow,
    transport: T,
    controller: C,
    updates: U,
}

impl<T, C, U> Gateway<T, C, U>
where
    T: Transport,
    C: Controller,
    U: UpdateListener,
{
    /// Assemble a gateway around a loaded directory and a frozen registry
    #[must_use]
    pub const fn new(
        store: NodeStore,
        registry: HandlerRegistry,
        probe_delay: Duration,
        transport: T,
        controller: C,
        updates: U,
    ) -> Self {
        Self {
            store,
            dispatcher: Dispatcher::new(registry),
            removal: RemovalFlow::new(probe_delay),
            transport,
            controller,
            updates,
        }
    }

    /// Resource directory
    #[must_use]
    pub const fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Mutable resource directory, for provisioning before `run`
    pub const fn store_mut(&mut self) -> &mut NodeStore {
        &mut self.store
    }

    /// Handler registry
    #[must_use]
    pub const fn registry(&self) -> &HandlerRegistry {
        self.dispatcher.registry()
    }

    /// Removal flow state
    #[must_use]
    pub const fn removal(&self) -> &RemovalFlow {
        &self.removal
    }

    /// Transport collaborator
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Controller collaborator
    #[must_use]
    pub const fn controller(&self) -> &C {
        &self.controller
    }

    /// Update listener collaborator
    #[must_use]
    pub const fn updates(&self) -> &U {
        &self.updates
    }

    /// Tear down, returning the directory and collaborators
    #[must_use]
    pub fn into_parts(self) -> (NodeStore, T, C, U) {
        (self.store, self.transport, self.controller, self.updates)
    }

    /// When the event loop must next call [`poll_timer`](Self::poll_timer)
    #[must_use]
    pub const fn next_deadline(&self) -> Option<Instant> {
        self.removal.deadline()
    }

    /// Process one event at time `now`
    ///
    /// Returns `Break` on shutdown.
    pub fn handle_event(&mut self, event: GatewayEvent, now: Instant) -> ControlFlow<()> {
        match event {
            GatewayEvent::Frame {
                connection,
                payload,
            } => {
                let outcome = self.dispatch(&connection, &payload, now);
                log_outcome(&connection, &payload, &outcome);
            }
            GatewayEvent::SendDataDone {
                status,
                detail,
                context,
            } => match context {
                TxContext::RemovalProbe(ticket) => {
                    let (removal, mut env) = self.removal_parts();
                    removal.on_probe_done(ticket, status, &mut env);
                }
                TxContext::None => {
                    tracing::trace!(?status, ?detail, "transmit completed");
                }
            },
            GatewayEvent::RemoveFailedDone { ticket, status } => {
                let (removal, mut env) = self.removal_parts();
                removal.on_removal_status(ticket, status, &mut env);
            }
            GatewayEvent::Shutdown => {
                tracing::debug!("shutdown requested");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Fire the removal timer if due. Returns `true` if it fired.
    pub fn poll_timer(&mut self, now: Instant) -> bool {
        let (removal, mut env) = self.removal_parts();
        removal.poll_timer(now, &mut env)
    }

    /// Route one inbound frame through the handler registry
    pub fn dispatch(&mut self, connection: &Connection, payload: &[u8], now: Instant) -> DispatchOutcome {
        let mut ctx = HandlerContext {
            store: &mut self.store,
            removal: &mut self.removal,
            transport: &mut self.transport,
            registry: self.dispatcher.registry(),
            now,
        };
        self.dispatcher.dispatch(&mut ctx, connection, payload)
    }

    /// Run until shutdown or until every handle is dropped
    #[allow(clippy::future_not_send)]
    pub async fn run(&mut self, mut events: EventReceiver) {
        tracing::info!(
            nodes = self.store.len(),
            handlers = self.registry().len(),
            probe_delay_ms = self.removal.delay().as_millis(),
            "gateway started"
        );

        loop {
            let step = match self.next_deadline() {
                Some(deadline) => {
                    let sleep = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline));
                    tokio::select! {
                        event = events.recv() => Step::Event(event),
                        () = sleep => Step::Timer,
                    }
                }
                None => Step::Event(events.recv().await),
            };

            match step {
                Step::Timer => {
                    self.poll_timer(Instant::now());
                }
                Step::Event(Some(event)) => {
                    if self.handle_event(event, Instant::now()).is_break() {
                        break;
                    }
                }
                Step::Event(None) => {
                    tracing::debug!("all gateway handles dropped");
                    break;
                }
            }
        }

        if !matches!(
            self.removal.state(),
            RemovalState::Idle | RemovalState::Completed(_)
        ) {
            tracing::warn!(
                node_id = ?self.removal.target(),
                state = ?self.removal.state(),
                "stopping with removal in progress"
            );
        }
        tracing::info!("gateway stopped");
    }

    /// Process queued events and due timers until nothing is pending
    ///
    /// Returns `Break` if a shutdown event was seen.
    #[allow(clippy::future_not_send)]
    pub async fn settle(&mut self, events: &mut EventReceiver) -> ControlFlow<()> {
        loop {
            while let Ok(event) = events.try_recv() {
                if self.handle_event(event, Instant::now()).is_break() {
                    return ControlFlow::Break(());
                }
            }

            let Some(deadline) = self.next_deadline() else {
                return ControlFlow::Continue(());
            };
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
            self.poll_timer(Instant::now());
        }
    }

    fn removal_parts(&mut self) -> (&mut RemovalFlow, RemovalEnv<'_>) {
        (
            &mut self.removal,
            RemovalEnv {
                store: &mut self.store,
                transport: &mut self.transport,
                controller: &mut self.controller,
                updates: &mut self.updates,
            },
        )
    }
}

fn log_outcome(connection: &Connection, payload: &[u8], outcome: &DispatchOutcome) {
    match outcome {
        DispatchOutcome::Handled => {
            tracing::trace!(node_id = %connection.source, "frame handled");
        }
        DispatchOutcome::Unhandled => {
            tracing::debug!(
                node_id = %connection.source,
                scheme = %connection.scheme,
                frame = %hex::encode(payload),
                "frame not handled"
            );
        }
        DispatchOutcome::Malformed(e) => {
            tracing::debug!(node_id = %connection.source, error = %e, "malformed frame dropped");
        }
        DispatchOutcome::Rejected(status) => {
            tracing::debug!(node_id = %connection.source, ?status, "frame rejected by handler");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Scheme;
    use crate::handlers;
    use crate::nodes::NodeId;
    use crate::radio::{ControllerUpdate, SendRequest};

    #[derive(Default)]
    struct Radio {
        sent: Vec<(NodeId, Vec<u8>, TxContext)>,
        removals: Vec<(NodeId, FlowTicket)>,
        updates: Vec<ControllerUpdate>,
    }

    impl Transport for Radio {
        fn send_data(&mut self, request: SendRequest<'_>) -> Result<()> {
            self.sent
                .push((request.target, request.payload.to_vec(), request.context));
            Ok(())
        }
    }

    impl Controller for Radio {
        fn remove_failed_node(&mut self, node: NodeId, ticket: FlowTicket) -> Result<()> {
            self.removals.push((node, ticket));
            Ok(())
        }
    }

    impl UpdateListener for Radio {
        fn controller_update(&mut self, update: ControllerUpdate) {
            self.updates.push(update);
        }
    }

    fn gateway() -> Gateway<Radio, Radio, Radio> {
        Gateway::new(
            NodeStore::new(),
            handlers::builtin_registry(),
            Duration::from_millis(2),
            Radio::default(),
            Radio::default(),
            Radio::default(),
        )
    }

    #[test]
    fn shutdown_breaks() {
        let mut gw = gateway();
        assert!(gw.handle_event(GatewayEvent::Shutdown, Instant::now()).is_break());
    }

    #[test]
    fn reset_notification_arms_timer() {
        let mut gw = gateway();
        let now = Instant::now();
        let conn = Connection::new(NodeId::new(5), Scheme::None);

        let flow = gw.handle_event(
            GatewayEvent::Frame {
                connection: conn,
                payload: vec![0x5A, 0x01],
            },
            now,
        );

        assert!(flow.is_continue());
        assert_eq!(gw.next_deadline(), Some(now + Duration::from_millis(2)));
        assert!(gw.transport().sent.is_empty());
    }

    #[test]
    fn probe_completion_routes_to_removal() {
        let mut gw = gateway();
        let now = Instant::now();
        let conn = Connection::new(NodeId::new(5), Scheme::None);
        gw.dispatch(&conn, &[0x5A, 0x01], now);
        assert!(gw.poll_timer(now + Duration::from_millis(2)));

        let (_, _, context) = gw.transport().sent[0].clone();
        gw.handle_event(
            GatewayEvent::SendDataDone {
                status: TransmitStatus::NoAck,
                detail: None,
                context,
            },
            now,
        );

        assert_eq!(gw.controller().removals.len(), 1);
        assert_eq!(gw.removal().state(), RemovalState::RemovalRequested);
    }

    #[test]
    fn unrelated_completion_is_ignored() {
        let mut gw = gateway();

        gw.handle_event(
            GatewayEvent::SendDataDone {
                status: TransmitStatus::Ok,
                detail: Some(TxStatusDetail::default()),
                context: TxContext::None,
            },
            Instant::now(),
        );

        assert!(gw.controller().removals.is_empty());
        assert_eq!(gw.removal().state(), RemovalState::Idle);
    }

    #[test]
    fn handle_reports_stopped_loop() {
        let (handle, events) = channel();
        drop(events);

        assert!(handle.is_closed());
        assert!(matches!(handle.shutdown(), Err(Error::Stopped)));
    }
}
