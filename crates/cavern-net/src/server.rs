//! Server-side bridge: many peers, one tick loop.

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cavern_protocol::{BoxedMessage, Message, Protocol};
use cavern_transport::{Connection, Handshake, Transport, TransportError, WebSocketTransport};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

use crate::io::{self, ReadEnd, StopSignal};
use crate::{ClientConnected, ClientDisconnected, ConnectionId, NetError, SlotAllocator};

/// What the I/O tasks report to the tick loop.
enum Inbound {
    Opened {
        id: ConnectionId,
        addr: Option<SocketAddr>,
        outbound: mpsc::UnboundedSender<Vec<u8>>,
        stop: StopSignal,
    },
    Message {
        id: ConnectionId,
        message: BoxedMessage,
    },
    Closed {
        id: ConnectionId,
    },
}

/// One connected peer as seen from the tick loop.
pub struct Peer<S> {
    id: ConnectionId,
    addr: Option<SocketAddr>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    stop: StopSignal,
    session: S,
}

impl<S> Peer<S> {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    /// Per-connection data owned by the tick loop.
    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    fn push(&self, frame: Vec<u8>) -> Result<(), NetError> {
        self.outbound.send(frame).map_err(|_| {
            NetError::Transport(TransportError::ConnectionClosed(format!(
                "{} is shutting down",
                self.id
            )))
        })
    }
}

impl<S: fmt::Debug> fmt::Debug for Peer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.id)
            .field("addr", &self.addr)
            .field("session", &self.session)
            .finish()
    }
}

/// The server half of the transport bridge.
///
/// Owns an accept loop task plus a reader and a writer task per peer. All
/// methods are non-blocking and meant to be called from the tick loop.
///
/// Lifecycle events are delivered through [`drain`](Self::drain) like any
/// other message: [`ClientConnected`] when a peer is accepted and
/// [`ClientDisconnected<S>`] when it is gone. The peer table is updated as
/// those events are drained, so it always agrees with what handlers have
/// seen.
pub struct ServerNetwork<S = ()> {
    protocol: Arc<Protocol>,
    local_addr: SocketAddr,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    peers: BTreeMap<ConnectionId, Peer<S>>,
    accept_task: JoinHandle<()>,
}

impl<S> ServerNetwork<S>
where
    S: Default + fmt::Debug + Send + 'static,
{
    /// Listens for WebSocket connections on `addr`.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn bind(addr: &str, protocol: Arc<Protocol>) -> Result<Self, NetError> {
        let transport = WebSocketTransport::bind(addr).await?;
        Self::with_transport(transport, protocol)
    }

    /// Serves connections accepted by `transport`.
    pub fn with_transport<T: Transport>(transport: T, protocol: Arc<Protocol>) -> Result<Self, NetError> {
        let local_addr = transport.local_addr()?;
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let accept_task = tokio::spawn(accept_loop(transport, Arc::clone(&protocol), inbound_tx));

        Ok(Self {
            protocol,
            local_addr,
            inbound,
            peers: BTreeMap::new(),
            accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn protocol(&self) -> &Arc<Protocol> {
        &self.protocol
    }

    /// Takes every event queued at call time, in arrival order.
    ///
    /// Never blocks. Events that arrive while draining wait for the next
    /// call.
    pub fn drain(&mut self) -> Vec<(ConnectionId, BoxedMessage)> {
        let mut drained = Vec::new();
        let peers = &mut self.peers;
        io::drain_snapshot(&mut self.inbound, |event| match event {
            Inbound::Opened {
                id,
                addr,
                outbound,
                stop,
            } => {
                peers.insert(
                    id,
                    Peer {
                        id,
                        addr,
                        outbound,
                        stop,
                        session: S::default(),
                    },
                );
                drained.push((id, Box::new(ClientConnected { addr }) as BoxedMessage));
            }
            Inbound::Message { id, message } => drained.push((id, message)),
            Inbound::Closed { id } => {
                let session = match peers.remove(&id) {
                    Some(peer) => peer.session,
                    None => S::default(),
                };
                drained.push((id, Box::new(ClientDisconnected { session }) as BoxedMessage));
            }
        });
        drained
    }

    /// Queues `message` for the peer with the given id.
    pub fn send_to_id<M: Message>(&self, id: ConnectionId, message: &M) -> Result<(), NetError> {
        let peer = self.peers.get(&id).ok_or(NetError::UnknownConnection(id))?;
        self.send_to(peer, message)
    }

    /// Queues `message` for `peer`.
    pub fn send_to<M: Message>(&self, peer: &Peer<S>, message: &M) -> Result<(), NetError> {
        let frame = self.protocol.encode(message)?;
        tracing::debug!(conn_id = %peer.id, bytes = frame.len(), "queued frame");
        peer.push(frame)
    }

    /// Queues `message` for every connected peer.
    ///
    /// The message is encoded once. Peers that are already shutting down
    /// are skipped.
    pub fn broadcast<M: Message>(&self, message: &M) -> Result<(), NetError> {
        let frame = self.protocol.encode(message)?;
        for peer in self.peers.values() {
            if let Err(e) = peer.push(frame.clone()) {
                tracing::trace!(conn_id = %peer.id, error = %e, "broadcast skipped peer");
            }
        }
        Ok(())
    }

    /// Asks the peer's reader and writer to stop.
    ///
    /// Frames already queued are still flushed. The peer stays in the
    /// table until its [`ClientDisconnected`] is drained.
    pub fn close(&self, id: ConnectionId) -> Result<(), NetError> {
        let peer = self.peers.get(&id).ok_or(NetError::UnknownConnection(id))?;
        tracing::info!(conn_id = %id, "closing connection");
        peer.stop.send_replace(true);
        Ok(())
    }

    pub fn peer(&self, id: ConnectionId) -> Option<&Peer<S>> {
        self.peers.get(&id)
    }

    pub fn peer_mut(&mut self, id: ConnectionId) -> Option<&mut Peer<S>> {
        self.peers.get_mut(&id)
    }

    /// Shortcut for `peer_mut(id).map(Peer::session_mut)`.
    pub fn session_mut(&mut self, id: ConnectionId) -> Option<&mut S> {
        self.peers.get_mut(&id).map(Peer::session_mut)
    }

    /// Connected peers, ordered by id.
    pub fn peers(&self) -> impl Iterator<Item = &Peer<S>> {
        self.peers.values()
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}

impl<S> Drop for ServerNetwork<S> {
    fn drop(&mut self) {
        self.accept_task.abort();
        for peer in self.peers.values() {
            peer.stop.send_replace(true);
        }
    }
}

impl<S> fmt::Debug for ServerNetwork<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerNetwork")
            .field("local_addr", &self.local_addr)
            .field("peers", &self.peers.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// I/O tasks
// ---------------------------------------------------------------------------

/// How long an accepted peer may take to finish the WebSocket upgrade.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause after a failed accept. Errors such as running out of file
/// descriptors persist, and retrying at once would spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

async fn accept_loop<T: Transport>(
    mut transport: T,
    protocol: Arc<Protocol>,
    inbound: mpsc::UnboundedSender<Inbound>,
) {
    let slots = Arc::new(Mutex::new(SlotAllocator::new()));
    tracing::info!("accepting connections");

    loop {
        let handshake = match transport.accept().await {
            Ok(handshake) => handshake,
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
                time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        if inbound.is_closed() {
            break;
        }

        // The upgrade runs per peer: a peer that never sends it only
        // stalls its own task.
        tokio::spawn(serve(
            handshake,
            Arc::clone(&protocol),
            inbound.clone(),
            Arc::clone(&slots),
        ));
    }
}

async fn serve<H: Handshake>(
    handshake: H,
    protocol: Arc<Protocol>,
    inbound: mpsc::UnboundedSender<Inbound>,
    slots: Arc<Mutex<SlotAllocator>>,
) {
    let addr = handshake.peer_addr();
    let conn = match time::timeout(HANDSHAKE_TIMEOUT, handshake.complete()).await {
        Ok(Ok(conn)) => conn,
        Ok(Err(e)) => {
            tracing::warn!(?addr, error = %e, "handshake failed");
            return;
        }
        Err(_) => {
            tracing::warn!(?addr, "handshake timed out");
            return;
        }
    };

    let id = match slots.lock() {
        Ok(mut slots) => slots.acquire(),
        Err(_) => {
            tracing::error!(?addr, "slot allocator poisoned, dropping peer");
            return;
        }
    };
    tracing::info!(conn_id = %id, ?addr, "client connected");

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let stop = io::stop_signal();
    let opened = Inbound::Opened {
        id,
        addr: conn.peer_addr(),
        outbound: outbound_tx,
        stop: Arc::clone(&stop),
    };
    if inbound.send(opened).is_err() {
        if let Ok(mut slots) = slots.lock() {
            slots.release(id);
        }
        return;
    }

    let (writer, reader) = conn.into_split();
    let writer_task = tokio::spawn(io::write_frames(writer, outbound_rx, Arc::clone(&stop)));

    let end = io::read_frames(reader, &protocol, stop.subscribe(), |message| {
        inbound.send(Inbound::Message { id, message }).is_ok()
    })
    .await;

    match &end {
        ReadEnd::Violation(e) => {
            tracing::warn!(conn_id = %id, error = %e, "protocol violation, dropping client")
        }
        other => tracing::info!(conn_id = %id, reason = %other, "client disconnected"),
    }

    stop.send_replace(true);
    if let Err(e) = writer_task.await {
        tracing::debug!(conn_id = %id, error = %e, "writer task failed");
    }

    // The slot is freed only once `Closed` is queued, so a reused id can
    // never overtake the event for its previous owner.
    let _ = inbound.send(Inbound::Closed { id });
    if let Ok(mut slots) = slots.lock() {
        slots.release(id);
    }
}
