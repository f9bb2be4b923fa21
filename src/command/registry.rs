//! Command handler registry
//!
//! Built once at startup with [`HandlerRegistryBuilder`]; the resulting
//! [`HandlerRegistry`] has no mutating methods.

use std::collections::BTreeMap;
use std::ops::Range;

use super::class::{CommandClass, Scheme};
use super::connection::Connection;
use super::dispatch::HandlerContext;
use super::frame::Frame;

/// Result reported by a command handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerStatus {
    /// Frame consumed
    Handled,
    /// Class understood but this command is not
    CommandNotSupported,
    /// Handler declines the class
    ClassNotSupported,
    /// Payload did not match the command layout
    ParseError,
    /// Handler cannot take the frame right now
    Busy,
}

impl HandlerStatus {
    /// Whether the dispatcher should try the next candidate
    #[must_use]
    pub const fn is_unsupported(self) -> bool {
        matches!(self, Self::CommandNotSupported | Self::ClassNotSupported)
    }
}

/// Command handler entry point
///
/// Must not block and must not dispatch recursively.
pub type HandlerFn = fn(&mut HandlerContext<'_>, &Connection, &Frame<'_>) -> HandlerStatus;

/// Immutable registration of one handler
#[derive(Debug, Clone, Copy)]
pub struct CommandHandlerEntry {
    /// Name used in logs
    pub name: &'static str,
    /// Command class handled
    pub class: CommandClass,
    /// Highest class version implemented
    ///
    /// Reported by the Version handler; not a dispatch filter.
    pub version: u8,
    /// Weakest scheme accepted
    pub scheme: Scheme,
    /// Higher runs first within a class
    pub priority: u8,
    /// Entry point
    pub handler: HandlerFn,
}

/// Collects registrations during initialisation
#[derive(Debug, Default)]
pub struct HandlerRegistryBuilder {
    entries: Vec<CommandHandlerEntry>,
}

impl HandlerRegistryBuilder {
    /// Start an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler
    #[must_use]
    pub fn register(mut self, entry: CommandHandlerEntry) -> Self {
        tracing::debug!(
            handler = entry.name,
            class = %entry.class,
            version = entry.version,
            scheme = %entry.scheme,
            priority = entry.priority,
            "command handler registered"
        );
        self.entries.push(entry);
        self
    }

    /// Freeze the table
    ///
    /// Entries are grouped by class; within a class, higher priority comes
    /// first and equal priorities keep registration order.
    #[must_use]
    pub fn build(mut self) -> HandlerRegistry {
        // Stable sort keeps registration order among equal keys
        self.entries
            .sort_by_key(|e| (e.class, std::cmp::Reverse(e.priority)));

        let mut by_class: BTreeMap<CommandClass, Range<usize>> = BTreeMap::new();
        for (i, entry) in self.entries.iter().enumerate() {
            by_class
                .entry(entry.class)
                .and_modify(|range| range.end = i + 1)
                .or_insert(i..i + 1);
        }

        tracing::info!(
            handlers = self.entries.len(),
            classes = by_class.len(),
            "command handler registry frozen"
        );

        HandlerRegistry {
            entries: self.entries.into_boxed_slice(),
            by_class,
        }
    }
}

/// Frozen handler table grouped by command class
#[derive(Debug)]
pub struct HandlerRegistry {
    entries: Box<[CommandHandlerEntry]>,
    by_class: BTreeMap<CommandClass, Range<usize>>,
}

impl HandlerRegistry {
    /// Start building a registry
    #[must_use]
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::new()
    }

    /// All entries registered for `class`, in invocation order
    #[must_use]
    pub fn entries_for(&self, class: CommandClass) -> &[CommandHandlerEntry] {
        match self.by_class.get(&class) {
            Some(range) => &self.entries[range.clone()],
            None => &[],
        }
    }

    /// Entries for `class` applicable to a frame received with `scheme`
    pub fn candidates(
        &self,
        class: CommandClass,
        scheme: Scheme,
    ) -> impl Iterator<Item = &CommandHandlerEntry> {
        self.entries_for(class)
            .iter()
            .filter(move |entry| scheme.satisfies(entry.scheme))
    }

    /// Highest version registered for `class`
    #[must_use]
    pub fn version_of(&self, class: CommandClass) -> Option<u8> {
        self.entries_for(class).iter().map(|e| e.version).max()
    }

    /// Registered classes in ascending order
    pub fn classes(&self) -> impl Iterator<Item = CommandClass> + '_ {
        self.by_class.keys().copied()
    }

    /// Number of registrations
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
