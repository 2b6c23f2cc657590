//! The per-connection reader and writer loops, shared by both bridges.

use std::fmt;
use std::sync::Arc;

use cavern_protocol::{BoxedMessage, Protocol, ProtocolError};
use cavern_transport::{FrameReader, FrameWriter, TransportError};
use tokio::sync::{mpsc, watch};

/// Raised once to stop both halves of a connection.
pub(crate) type StopSignal = Arc<watch::Sender<bool>>;

pub(crate) fn stop_signal() -> StopSignal {
    Arc::new(watch::Sender::new(false))
}

/// Why a reader loop ended.
#[derive(Debug)]
pub(crate) enum ReadEnd {
    /// The stop signal was raised locally.
    Stopped,
    /// The peer closed the connection cleanly.
    PeerClosed,
    /// The socket failed.
    Transport(TransportError),
    /// The peer sent a frame that is not a valid message.
    Violation(ProtocolError),
    /// Nobody is draining the inbound queue any more.
    QueueClosed,
}

impl fmt::Display for ReadEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "closed locally"),
            Self::PeerClosed => write!(f, "closed by peer"),
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Violation(e) => write!(f, "protocol violation: {e}"),
            Self::QueueClosed => write!(f, "inbound queue dropped"),
        }
    }
}

/// Receives frames until the connection ends, decoding each one and handing
/// it to `deliver` in receipt order.
///
/// `deliver` returns `false` when the inbound queue is gone. A frame that
/// fails to decode ends the loop: dropping it silently would leave the two
/// peers disagreeing about what was said.
pub(crate) async fn read_frames<R: FrameReader>(
    mut reader: R,
    protocol: &Protocol,
    mut stop: watch::Receiver<bool>,
    mut deliver: impl FnMut(BoxedMessage) -> bool,
) -> ReadEnd {
    loop {
        let received = tokio::select! {
            _ = stop.wait_for(|stopped| *stopped) => return ReadEnd::Stopped,
            received = reader.recv() => received,
        };

        let frame = match received {
            Ok(Some(frame)) => frame,
            Ok(None) => return ReadEnd::PeerClosed,
            Err(e) => return ReadEnd::Transport(e),
        };

        match protocol.decode(&frame) {
            Ok(message) => {
                tracing::trace!(message = (*message).type_name(), "frame decoded");
                if !deliver(message) {
                    return ReadEnd::QueueClosed;
                }
            }
            Err(e) => return ReadEnd::Violation(e),
        }
    }
}

/// Sends queued frames until the stop signal is raised or the queue's
/// sender side is dropped, then closes the socket.
///
/// Frames already queued when the stop signal goes up are still sent, so a
/// reply followed by `close()` reaches the peer.
pub(crate) async fn write_frames<W: FrameWriter>(
    mut writer: W,
    mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    stop: StopSignal,
) {
    let mut stopped = stop.subscribe();
    loop {
        tokio::select! {
            biased;
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                if let Err(e) = writer.send(frame).await {
                    tracing::debug!(error = %e, "send failed, stopping connection");
                    stop.send_replace(true);
                    return;
                }
            }
            // The guard `wait_for` returns is not `Send`; drop it inside the branch.
            () = async {
                let _ = stopped.wait_for(|stopped| *stopped).await;
            } => break,
        }
    }

    if let Err(e) = writer.close().await {
        tracing::trace!(error = %e, "close after stop failed");
    }
}

/// Pops at most the number of items queued at call time, without waiting.
///
/// Items pushed while draining stay queued for the next call, so a busy
/// peer cannot keep a single tick busy forever.
pub(crate) fn drain_snapshot<T>(queue: &mut mpsc::UnboundedReceiver<T>, mut each: impl FnMut(T)) {
    let pending = queue.len();
    for _ in 0..pending {
        match queue.try_recv() {
            Ok(item) => each(item),
            Err(_) => break,
        }
    }
}
