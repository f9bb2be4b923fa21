//! Built-in command handlers

pub mod device_reset_locally;
pub mod version;

use crate::command::{HandlerRegistry, HandlerRegistryBuilder};

/// Add the built-in handlers to `builder`
#[must_use]
pub fn register_builtin(builder: HandlerRegistryBuilder) -> HandlerRegistryBuilder {
    builder
        .register(device_reset_locally::entry())
        .register(version::entry())
}

/// Registry holding only the built-in handlers
#[must_use]
pub fn builtin_registry() -> HandlerRegistry {
    register_builtin(HandlerRegistry::builder()).build()
}
