//! Client-side bridge: one connection to the server.

use std::fmt;
use std::sync::Arc;

use cavern_protocol::{BoxedMessage, Message, Protocol};
use cavern_transport::{Connection, TransportError, WebSocketConnection};
use tokio::sync::mpsc;

use crate::io::{self, ReadEnd, StopSignal};
use crate::{Connected, Disconnected, NetError};

/// The client half of the transport bridge.
///
/// [`connect`](Self::connect) returns immediately. Connecting, reading and
/// writing all happen on tokio tasks, and the outcome shows up in
/// [`drain`](Self::drain) as [`Connected`] followed eventually by
/// [`Disconnected`] (or just [`Disconnected`] if the server was never
/// reached).
///
/// Messages sent before the connection is up are queued and go out as soon
/// as it is.
pub struct ClientNetwork {
    protocol: Arc<Protocol>,
    inbound: mpsc::UnboundedReceiver<BoxedMessage>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    stop: StopSignal,
    connected: bool,
}

impl ClientNetwork {
    /// Starts connecting to `url` (e.g. `ws://127.0.0.1:8765`).
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(url: &str, protocol: Arc<Protocol>) -> Self {
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let stop = io::stop_signal();

        tokio::spawn(run(
            url.to_string(),
            Arc::clone(&protocol),
            inbound_tx,
            outbound_rx,
            Arc::clone(&stop),
        ));

        Self {
            protocol,
            inbound,
            outbound,
            stop,
            connected: false,
        }
    }

    /// Takes every message queued at call time, in arrival order.
    pub fn drain(&mut self) -> Vec<BoxedMessage> {
        let mut drained = Vec::new();
        let connected = &mut self.connected;
        io::drain_snapshot(&mut self.inbound, |message| {
            if message.is::<Connected>() {
                *connected = true;
            } else if message.is::<Disconnected>() {
                *connected = false;
            }
            drained.push(message);
        });
        drained
    }

    /// Queues `message` for the server.
    pub fn send<M: Message>(&self, message: &M) -> Result<(), NetError> {
        let frame = self.protocol.encode(message)?;
        tracing::debug!(bytes = frame.len(), "queued frame");
        self.outbound.send(frame).map_err(|_| {
            NetError::Transport(TransportError::ConnectionClosed(
                "connection to server is gone".into(),
            ))
        })
    }

    /// Asks the reader and writer to stop. Already queued frames are flushed.
    pub fn close(&self) {
        tracing::info!("closing connection");
        self.stop.send_replace(true);
    }

    /// Whether a [`Connected`] has been drained and no [`Disconnected`]
    /// since.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn protocol(&self) -> &Arc<Protocol> {
        &self.protocol
    }
}

impl Drop for ClientNetwork {
    fn drop(&mut self) {
        self.stop.send_replace(true);
    }
}

impl fmt::Debug for ClientNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientNetwork")
            .field("connected", &self.connected)
            .finish()
    }
}

async fn run(
    url: String,
    protocol: Arc<Protocol>,
    inbound: mpsc::UnboundedSender<BoxedMessage>,
    outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    stop: StopSignal,
) {
    let mut stopped = stop.subscribe();
    let connecting = tokio::select! {
        _ = stopped.wait_for(|stopped| *stopped) => None,
        result = WebSocketConnection::connect(&url) => Some(result),
    };

    let conn = match connecting {
        Some(Ok(conn)) => conn,
        Some(Err(e)) => {
            tracing::warn!(%url, error = %e, "could not connect");
            let _ = inbound.send(Box::new(Disconnected));
            return;
        }
        None => {
            let _ = inbound.send(Box::new(Disconnected));
            return;
        }
    };

    tracing::info!(%url, "connected");
    if inbound.send(Box::new(Connected)).is_err() {
        return;
    }

    let (writer, reader) = conn.into_split();
    let writer_task = tokio::spawn(io::write_frames(writer, outbound, Arc::clone(&stop)));

    let end = io::read_frames(reader, &protocol, stop.subscribe(), |message| {
        inbound.send(message).is_ok()
    })
    .await;
    match &end {
        ReadEnd::Violation(e) => tracing::warn!(error = %e, "protocol violation, disconnecting"),
        other => tracing::info!(reason = %other, "disconnected"),
    }

    stop.send_replace(true);
    if let Err(e) = writer_task.await {
        tracing::debug!(error = %e, "writer task failed");
    }
    let _ = inbound.send(Box::new(Disconnected));
}
