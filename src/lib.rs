//! Mesh Gateway - application core of a home-automation mesh gateway
//!
//! This library provides the gateway's core functionality:
//! - Resource directory of mesh nodes (fixed-capacity node store, DSK index)
//! - Command-class handler registry and dispatcher
//! - Device removal after a local reset
//! - Directory persistence over a byte-addressable store
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Radio / Controller link                 │
//! │   Transport  │  Controller  │  UpdateListener       │
//! └────────────────────┬────────────────────────────────┘
//!                      │ GatewayEvent
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Gateway loop                        │
//! │   Dispatcher  │  Handlers  │  Removal flow          │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │               Resource directory                     │
//! │   Node store  │  DSK index  │  Eeprom persistence   │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod nodes;
pub mod radio;
pub mod removal;
pub mod replay;
pub mod sim;
pub mod storage;

pub use command::{
    CommandClass, CommandHandlerEntry, Connection, DispatchOutcome, Dispatcher, Frame,
    FrameError, HandlerContext, HandlerRegistry, HandlerRegistryBuilder, HandlerStatus, Scheme,
};
pub use config::Config;
pub use error::{Error, Result};
pub use gateway::{Gateway, GatewayEvent, GatewayHandle};
pub use nodes::{Dsk, Endpoint, NodeId, NodeRecord, NodeState, NodeStore};
pub use removal::{FlowTicket, RemovalFlow, RemovalOutcome, RemovalState};
pub use storage::{Eeprom, FileEeprom, MemoryEeprom};
