//! Replay of captured inbound traffic
//!
//! A script holds one frame per line:
//!
//! ```text
//! # source [scheme] hex
//! 5 5a01
//! 7 s0 861325
//! ```
//!
//! Each frame is fed to a gateway wired to the simulated radio, and the
//! gateway settles before the next line is read.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::command::{Connection, Scheme};
use crate::gateway::{self, Gateway};
use crate::handlers;
use crate::nodes::{NodeId, NodeStore};
use crate::radio::ControllerUpdate;
use crate::removal::DEFAULT_PROBE_DELAY;
use crate::sim::{SentFrame, SimController, SimTransport, UpdateLog};
use crate::{Error, Result};

/// One scripted inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFrame {
    /// 1-based line number in the script
    pub line: usize,
    /// Sender and scheme
    pub connection: Connection,
    /// Frame bytes
    pub payload: Vec<u8>,
}

/// Parse a replay script
///
/// # Errors
///
/// Returns error naming the first line that is not `<source> [scheme] <hex>`
pub fn parse_script(script: &str) -> Result<Vec<ScriptFrame>> {
    let mut frames = Vec::new();

    for (index, raw) in script.lines().enumerate() {
        let line = index + 1;
        let text = raw.split('#').next().unwrap_or_default().trim();
        if text.is_empty() {
            continue;
        }

        let fields: Vec<&str> = text.split_whitespace().collect();
        let (source, scheme, payload) = match fields.as_slice() {
            [source, payload] => (*source, Scheme::None, *payload),
            [source, scheme, payload] => (*source, parse_scheme(line, scheme)?, *payload),
            _ => {
                return Err(Error::Script(format!(
                    "line {line}: expected `<source> [scheme] <hex>`"
                )));
            }
        };

        let source = source
            .parse::<u16>()
            .ok()
            .map(NodeId::new)
            .filter(|id| id.is_valid())
            .ok_or_else(|| Error::Script(format!("line {line}: invalid source node `{source}`")))?;

        let payload = hex::decode(payload)
            .map_err(|e| Error::Script(format!("line {line}: invalid frame hex: {e}")))?;

        frames.push(ScriptFrame {
            line,
            connection: Connection::new(source, scheme),
            payload,
        });
    }

    Ok(frames)
}

fn parse_scheme(line: usize, text: &str) -> Result<Scheme> {
    text.parse()
        .map_err(|_| Error::Script(format!("line {line}: unknown scheme `{text}`")))
}

/// Simulation knobs for a replay
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Delay between a reset notification and the probe
    pub probe_delay: Duration,
    /// Nodes that never acknowledge
    pub unreachable: BTreeSet<NodeId>,
    /// Nodes the controller finds still operating
    pub keep: BTreeSet<NodeId>,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            probe_delay: DEFAULT_PROBE_DELAY,
            unreachable: BTreeSet::new(),
            keep: BTreeSet::new(),
        }
    }
}

/// What a replay did
#[derive(Debug)]
pub struct ReplayReport {
    /// Directory after the replay
    pub store: NodeStore,
    /// Frames the gateway transmitted
    pub sent: Vec<SentFrame>,
    /// Nodes removal was requested for
    pub removals: Vec<NodeId>,
    /// Updates delivered to the upper layer
    pub updates: Vec<ControllerUpdate>,
}

/// Feed `frames` through a simulated gateway starting from `store`
///
/// # Errors
///
/// Returns error if the gateway event channel closes unexpectedly
pub async fn replay(
    store: NodeStore,
    frames: Vec<ScriptFrame>,
    options: &ReplayOptions,
) -> Result<ReplayReport> {
    let (handle, mut events) = gateway::channel();
    let transport = SimTransport::new(handle.clone(), options.unreachable.iter().copied());
    let controller = SimController::new(handle.clone(), options.keep.iter().copied());
    let mut gateway = Gateway::new(
        store,
        handlers::builtin_registry(),
        options.probe_delay,
        transport,
        controller,
        UpdateLog::default(),
    );

    for frame in frames {
        tracing::debug!(
            line = frame.line,
            node_id = %frame.connection.source,
            frame = %hex::encode(&frame.payload),
            "replaying frame"
        );
        handle.frame(frame.connection, frame.payload)?;
        if gateway.settle(&mut events).await.is_break() {
            break;
        }
    }

    let (store, transport, controller, updates) = gateway.into_parts();
    Ok(ReplayReport {
        store,
        sent: transport.sent().to_vec(),
        removals: controller.requests().to_vec(),
        updates: updates.updates().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lines_with_and_without_scheme() {
        let frames = parse_script("# header\n5 5a01\n\n7 s0 861325  # get\n").unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].line, 2);
        assert_eq!(frames[0].connection, Connection::new(NodeId::new(5), Scheme::None));
        assert_eq!(frames[0].payload, vec![0x5A, 0x01]);
        assert_eq!(frames[1].line, 4);
        assert_eq!(frames[1].connection.scheme, Scheme::S0);
        assert_eq!(frames[1].payload, vec![0x86, 0x13, 0x25]);
    }

    #[test]
    fn rejects_out_of_range_source() {
        let err = parse_script("0 5a01").unwrap_err();
        assert!(err.to_string().contains("line 1"));

        assert!(parse_script("233 5a01").is_err());
    }

    #[test]
    fn empty_script_leaves_store_untouched() {
        let mut store = NodeStore::new();
        store.allocate(NodeId::new(4)).unwrap();

        let report =
            tokio_test::block_on(replay(store, Vec::new(), &ReplayOptions::default())).unwrap();

        assert!(report.store.contains(NodeId::new(4)));
        assert!(report.sent.is_empty());
        assert!(report.removals.is_empty());
    }

    #[test]
    fn version_query_is_answered_without_removal() {
        let frames = parse_script("9 s0 86135a").unwrap();

        let report = tokio_test::block_on(replay(
            NodeStore::new(),
            frames,
            &ReplayOptions::default(),
        ))
        .unwrap();

        assert_eq!(report.sent.len(), 1);
        assert_eq!(report.sent[0].payload, vec![0x86, 0x14, 0x5A, 1]);
        assert!(report.updates.is_empty());
    }

    #[test]
    fn rejects_bad_hex_and_scheme() {
        assert!(parse_script("5 zz").is_err());
        assert!(parse_script("5 s9 5a01").is_err());
        assert!(parse_script("5 s0 5a 01").is_err());
    }

    #[tokio::test]
    async fn reset_waits_for_probe_timer_then_removes() {
        let mut store = NodeStore::new();
        store.allocate(NodeId::new(5)).unwrap();
        store.allocate(NodeId::new(6)).unwrap();
        let frames = parse_script("5 5a01").unwrap();
        let options = ReplayOptions {
            probe_delay: Duration::from_millis(5),
            ..ReplayOptions::default()
        };

        let report = replay(store, frames, &options).await.unwrap();

        assert_eq!(report.sent.len(), 1);
        assert_eq!(report.sent[0].target, NodeId::new(5));
        assert_eq!(report.sent[0].payload, vec![0x00]);
        assert_eq!(report.removals, vec![NodeId::new(5)]);
        assert_eq!(report.updates.len(), 1);
        assert!(!report.store.contains(NodeId::new(5)));
        assert!(report.store.contains(NodeId::new(6)));
    }
}
