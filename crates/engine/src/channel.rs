// Outbound channel seam.
//
// The engine publishes envelopes through `OutboundChannel` and drains
// inbound events in its run loop; the actual transport (socket, handshake,
// reconnection) lives outside this crate. The seam is a trait so the
// synchronization logic is testable without a real connection.

use draftsync_common::protocol::Envelope;
use tokio::sync::mpsc;

use crate::error::CollabError;

/// Publishing side of the session channel.
pub trait OutboundChannel: Send {
    /// Publish one envelope to the session channel.
    ///
    /// Fails with [`CollabError::ChannelUnavailable`] when the transport is
    /// down; the caller decides whether already-applied local state is kept
    /// (it is — missed broadcasts are not resent on reconnect).
    fn publish(&self, envelope: Envelope) -> Result<(), CollabError>;
}

/// Outbound channel backed by an in-process tokio queue.
///
/// The transport task drains the paired receiver and writes to the wire;
/// in tests the receiver is inspected directly.
#[derive(Debug, Clone)]
pub struct MpscChannel {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl MpscChannel {
    pub fn new(tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { tx }
    }

    /// Create a connected channel plus the receiver the transport drains.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl OutboundChannel for MpscChannel {
    fn publish(&self, envelope: Envelope) -> Result<(), CollabError> {
        self.tx.send(envelope).map_err(|_| CollabError::ChannelUnavailable)
    }
}
