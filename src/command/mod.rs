//! Command class handling
//!
//! Inbound frames are routed by their leading command class byte to the
//! handlers registered for that class at startup.

pub mod class;
pub mod connection;
pub mod dispatch;
pub mod frame;
pub mod registry;

pub use class::{CommandClass, Scheme};
pub use connection::Connection;
pub use dispatch::{DispatchOutcome, Dispatcher, HandlerContext};
pub use frame::{DeviceResetLocallyCommand, Frame, FrameError, VersionCommand};
pub use registry::{
    CommandHandlerEntry, HandlerFn, HandlerRegistry, HandlerRegistryBuilder, HandlerStatus,
};
