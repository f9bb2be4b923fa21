//! Device Reset Locally handler
//!
//! A node that was factory reset announces it before leaving. The
//! gateway confirms it is gone and removes it from the network.

use crate::command::class::DEVICE_RESET_LOCALLY_VERSION;
use crate::command::{
    CommandClass, CommandHandlerEntry, Connection, DeviceResetLocallyCommand, Frame,
    HandlerContext, HandlerStatus, Scheme,
};

/// Registration for the Device Reset Locally class
#[must_use]
pub const fn entry() -> CommandHandlerEntry {
    CommandHandlerEntry {
        name: "device_reset_locally",
        class: CommandClass::DEVICE_RESET_LOCALLY,
        version: DEVICE_RESET_LOCALLY_VERSION,
        scheme: Scheme::None,
        priority: 0,
        handler,
    }
}

fn handler(ctx: &mut HandlerContext<'_>, connection: &Connection, frame: &Frame<'_>) -> HandlerStatus {
    match frame {
        Frame::DeviceResetLocally(DeviceResetLocallyCommand::Notification) => {
            if !connection.source.is_valid() {
                tracing::warn!(
                    node_id = %connection.source,
                    "reset notification from invalid node id"
                );
                return HandlerStatus::ClassNotSupported;
            }
            tracing::info!(node_id = %connection.source, "device reset locally");
            ctx.removal.arm(connection.source, ctx.now);
            HandlerStatus::Handled
        }
        _ => HandlerStatus::CommandNotSupported,
    }
}
