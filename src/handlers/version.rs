//! Version command class handler

use crate::command::class::VERSION_VERSION;
use crate::command::frame::version_report;
use crate::command::{
    CommandClass, CommandHandlerEntry, Connection, Frame, HandlerContext, HandlerStatus, Scheme,
    VersionCommand,
};
use crate::radio::{SendRequest, TxContext};

/// Registration for the Version class
#[must_use]
pub const fn entry() -> CommandHandlerEntry {
    CommandHandlerEntry {
        name: "version",
        class: CommandClass::VERSION,
        version: VERSION_VERSION,
        scheme: Scheme::None,
        priority: 0,
        handler,
    }
}

/// Answers Command Class Get with the registered version (0 if unknown)
fn handler(ctx: &mut HandlerContext<'_>, connection: &Connection, frame: &Frame<'_>) -> HandlerStatus {
    let Frame::Version(VersionCommand::CommandClassGet { requested }) = frame else {
        return HandlerStatus::CommandNotSupported;
    };

    let version = ctx.registry.version_of(*requested).unwrap_or(0);
    let report = version_report(*requested, version);
    let request = SendRequest {
        target: connection.source,
        payload: &report,
        scheme: connection.scheme,
        context: TxContext::None,
    };

    if let Err(e) = ctx.transport.send_data(request) {
        tracing::warn!(
            node_id = %connection.source,
            class = %requested,
            error = %e,
            "failed to queue version report"
        );
        return HandlerStatus::Busy;
    }

    tracing::debug!(node_id = %connection.source, class = %requested, version, "version reported");
    HandlerStatus::Handled
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::command::HandlerRegistry;
    use crate::handlers::device_reset_locally;
    use crate::nodes::{NodeId, NodeStore};
    use crate::radio::Transport;
    use crate::removal::{DEFAULT_PROBE_DELAY, RemovalFlow};

    #[derive(Default)]
    struct Capture {
        sent: Vec<(NodeId, Vec<u8>, Scheme)>,
        refuse: bool,
    }

    impl Transport for Capture {
        fn send_data(&mut self, request: SendRequest<'_>) -> crate::Result<()> {
            if self.refuse {
                return Err(crate::Error::Transmit("busy".to_string()));
            }
            self.sent
                .push((request.target, request.payload.to_vec(), request.scheme));
            Ok(())
        }
    }

    fn invoke(transport: &mut Capture, bytes: &[u8]) -> HandlerStatus {
        let registry = HandlerRegistry::builder()
            .register(entry())
            .register(device_reset_locally::entry())
            .build();
        let mut store = NodeStore::new();
        let mut removal = RemovalFlow::new(DEFAULT_PROBE_DELAY);
        let mut ctx = HandlerContext {
            store: &mut store,
            removal: &mut removal,
            transport,
            registry: &registry,
            now: Instant::now(),
        };
        let frame = Frame::parse(bytes).unwrap();
        handler(&mut ctx, &Connection::new(NodeId::new(2), Scheme::S0), &frame)
    }

    #[test]
    fn reports_registered_version() {
        let mut transport = Capture::default();

        assert_eq!(invoke(&mut transport, &[0x86, 0x13, 0x5A]), HandlerStatus::Handled);
        assert_eq!(
            transport.sent,
            vec![(NodeId::new(2), vec![0x86, 0x14, 0x5A, 1], Scheme::S0)]
        );
    }

    #[test]
    fn unknown_class_reports_zero() {
        let mut transport = Capture::default();

        invoke(&mut transport, &[0x86, 0x13, 0x25]);
        assert_eq!(transport.sent[0].1, vec![0x86, 0x14, 0x25, 0]);
    }

    #[test]
    fn report_is_not_handled_here() {
        let mut transport = Capture::default();

        assert_eq!(
            invoke(&mut transport, &[0x86, 0x14, 0x25, 1]),
            HandlerStatus::CommandNotSupported
        );
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn refused_report_is_busy() {
        let mut transport = Capture {
            refuse: true,
            ..Capture::default()
        };

        assert_eq!(invoke(&mut transport, &[0x86, 0x13, 0x86]), HandlerStatus::Busy);
    }
}
