//! Inbound frame dispatch

use std::time::Instant;

use super::class::CommandClass;
use super::connection::Connection;
use super::frame::{Frame, FrameError};
use super::registry::{HandlerRegistry, HandlerStatus};
use crate::nodes::NodeStore;
use crate::radio::Transport;
use crate::removal::RemovalFlow;

/// State a handler may read or mutate
pub struct HandlerContext<'a> {
    /// Resource directory
    pub store: &'a mut NodeStore,
    /// Device removal state machine
    pub removal: &'a mut RemovalFlow,
    /// Outbound transmissions
    pub transport: &'a mut dyn Transport,
    /// The frozen handler table (read-only)
    pub registry: &'a HandlerRegistry,
    /// Event loop time of this dispatch
    pub now: Instant,
}

/// Outcome of dispatching one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler consumed the frame
    Handled,
    /// No applicable handler, or every candidate declined
    Unhandled,
    /// Frame failed validation for its class
    Malformed(FrameError),
    /// A handler stopped dispatch with an error status
    Rejected(HandlerStatus),
}

/// Routes inbound frames to registered handlers
///
/// Dispatch performs no deduplication; handlers that care about repeated
/// delivery must be idempotent.
#[derive(Debug)]
pub struct Dispatcher {
    registry: HandlerRegistry,
}

impl Dispatcher {
    /// Dispatch through a frozen registry
    #[must_use]
    pub const fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }

    /// The registry backing this dispatcher
    #[must_use]
    pub const fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Route `bytes` from `connection` to its handlers
    ///
    /// Candidates for the frame's class run in order until one reports
    /// `Handled`. Candidates reporting the command or class unsupported are
    /// skipped; `ParseError` and `Busy` stop dispatch.
    pub fn dispatch(
        &self,
        ctx: &mut HandlerContext<'_>,
        connection: &Connection,
        bytes: &[u8],
    ) -> DispatchOutcome {
        let Some(&first) = bytes.first() else {
            return DispatchOutcome::Malformed(FrameError::Empty);
        };
        let class = CommandClass(first);

        let mut candidates = self.registry.candidates(class, connection.scheme).peekable();
        if candidates.peek().is_none() {
            tracing::debug!(
                node_id = %connection.source,
                class = %class,
                scheme = %connection.scheme,
                "no handler for command class"
            );
            return DispatchOutcome::Unhandled;
        }

        let frame = match Frame::parse(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(
                    node_id = %connection.source,
                    class = %class,
                    error = %e,
                    "dropping malformed frame"
                );
                return DispatchOutcome::Malformed(e);
            }
        };

        for entry in candidates {
            let status = (entry.handler)(ctx, connection, &frame);
            tracing::trace!(
                node_id = %connection.source,
                handler = entry.name,
                ?status,
                "handler returned"
            );

            match status {
                HandlerStatus::Handled => return DispatchOutcome::Handled,
                s if s.is_unsupported() => {}
                s => {
                    tracing::debug!(
                        node_id = %connection.source,
                        handler = entry.name,
                        status = ?s,
                        "handler rejected frame"
                    );
                    return DispatchOutcome::Rejected(s);
                }
            }
        }

        DispatchOutcome::Unhandled
    }
}
