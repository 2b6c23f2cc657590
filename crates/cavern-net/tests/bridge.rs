//! Integration tests for the transport bridge.
//!
//! Real WebSocket peers on ephemeral ports. The tick loop is simulated by
//! draining in a short polling loop until the expected events show up.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use cavern_net::{
    ClientConnected, ClientDisconnected, ClientNetwork, Connected, ConnectionId, Disconnected,
    NetError, ServerNetwork,
};
use cavern_protocol::catalogue::{self, DataRequest, Introduction};
use cavern_protocol::{BoxedMessage, Protocol};
use cavern_transport::{Transport, TransportError, WebSocketConnection, WebSocketHandshake};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

type Inbound = Vec<(ConnectionId, BoxedMessage)>;

fn protocol() -> Arc<Protocol> {
    Arc::new(catalogue::protocol().unwrap())
}

async fn server() -> (ServerNetwork<Option<String>>, String) {
    let server = ServerNetwork::bind("127.0.0.1:0", protocol()).await.unwrap();
    let url = format!("ws://{}", server.local_addr());
    (server, url)
}

/// Drains until `count` events arrived, or panics after two seconds.
async fn server_events(server: &mut ServerNetwork<Option<String>>, count: usize) -> Inbound {
    let mut events = Vec::new();
    for _ in 0..400 {
        events.extend(server.drain());
        if events.len() >= count {
            return events;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("expected {count} events, got {events:?}");
}

async fn client_events(client: &mut ClientNetwork, count: usize) -> Vec<BoxedMessage> {
    let mut events = Vec::new();
    for _ in 0..400 {
        events.extend(client.drain());
        if events.len() >= count {
            return events;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("expected {count} events, got {events:?}");
}

async fn raw_client(
    url: &str,
) -> tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>> {
    let (ws, _) = tokio_tungstenite::connect_async(url).await.expect("should connect");
    ws
}

#[tokio::test]
async fn test_client_and_server_exchange_messages_in_order() {
    let (mut server, url) = server().await;
    let mut client = ClientNetwork::connect(&url, protocol());

    // Queued before the connection is up: must still arrive, in order.
    for i in 0..10 {
        client
            .send(&Introduction {
                name: format!("caveman-{i}"),
            })
            .unwrap();
    }

    let events = server_events(&mut server, 11).await;
    let (id, first) = &events[0];
    assert_eq!(*id, ConnectionId(0));
    assert!(first.is::<ClientConnected>());

    let names: Vec<_> = events[1..]
        .iter()
        .map(|(id, m)| {
            assert_eq!(*id, ConnectionId(0));
            m.downcast_ref::<Introduction>().unwrap().name.clone()
        })
        .collect();
    let expected: Vec<_> = (0..10).map(|i| format!("caveman-{i}")).collect();
    assert_eq!(names, expected);

    server
        .send_to_id(ConnectionId(0), &Introduction { name: "server".into() })
        .unwrap();
    let events = client_events(&mut client, 2).await;
    assert!(events[0].is::<Connected>());
    assert_eq!(
        events[1].downcast_ref::<Introduction>(),
        Some(&Introduction { name: "server".into() })
    );
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_slot_is_reused_after_disconnect() {
    let (mut server, url) = server().await;

    let first = raw_client(&url).await;
    let _ = server_events(&mut server, 1).await;
    let second = raw_client(&url).await;
    let events = server_events(&mut server, 1).await;
    assert_eq!(events[0].0, ConnectionId(1));

    drop(first);
    let events = server_events(&mut server, 1).await;
    assert_eq!(events[0].0, ConnectionId(0));
    assert!(events[0].1.is::<ClientDisconnected<Option<String>>>());
    assert_eq!(server.peer_count(), 1);

    let _third = raw_client(&url).await;
    let events = server_events(&mut server, 1).await;
    assert_eq!(events[0].0, ConnectionId(0));
    assert!(events[0].1.is::<ClientConnected>());
    drop(second);
}

#[tokio::test]
async fn test_malformed_frame_closes_only_that_connection() {
    let (mut server, url) = server().await;

    let mut bad = raw_client(&url).await;
    let mut good = raw_client(&url).await;
    let _ = server_events(&mut server, 2).await;

    bad.send(Message::text("this is not an envelope")).await.unwrap();
    let events = server_events(&mut server, 1).await;
    assert_eq!(events[0].0, ConnectionId(0));
    assert!(events[0].1.is::<ClientDisconnected<Option<String>>>());

    // The offending socket is closed from the server side.
    let closed = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match bad.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "server should close the offending socket");

    // The other peer is untouched.
    let frame = protocol().encode(&DataRequest {}).unwrap();
    good.send(Message::binary(frame)).await.unwrap();
    let events = server_events(&mut server, 1).await;
    assert_eq!(events[0].0, ConnectionId(1));
    assert!(events[0].1.is::<DataRequest>());
}

#[tokio::test]
async fn test_unknown_id_is_a_protocol_violation() {
    let (mut server, url) = server().await;
    let mut ws = raw_client(&url).await;
    let _ = server_events(&mut server, 1).await;

    ws.send(Message::text(r#"{"id": 99, "payload": {}}"#)).await.unwrap();
    let events = server_events(&mut server, 1).await;
    assert!(events[0].1.is::<ClientDisconnected<Option<String>>>());
}

#[tokio::test]
async fn test_session_travels_with_disconnect() {
    let (mut server, url) = server().await;
    let ws = raw_client(&url).await;
    let events = server_events(&mut server, 1).await;
    let id = events[0].0;

    *server.session_mut(id).unwrap() = Some("grok".into());
    drop(ws);

    let events = server_events(&mut server, 1).await;
    let gone = events[0]
        .1
        .downcast_ref::<ClientDisconnected<Option<String>>>()
        .unwrap();
    assert_eq!(gone.session.as_deref(), Some("grok"));
    assert!(server.peer(id).is_none());
}

#[tokio::test]
async fn test_close_flushes_then_disconnects() {
    let (mut server, url) = server().await;
    let mut client = ClientNetwork::connect(&url, protocol());
    let events = server_events(&mut server, 1).await;
    let id = events[0].0;

    server.send_to_id(id, &Introduction { name: "bye".into() }).unwrap();
    server.close(id).unwrap();

    let events = client_events(&mut client, 3).await;
    assert!(events[0].is::<Connected>());
    assert!(events[1].is::<Introduction>());
    assert!(events[2].is::<Disconnected>());
    assert!(!client.is_connected());

    let events = server_events(&mut server, 1).await;
    assert!(events[0].1.is::<ClientDisconnected<Option<String>>>());
}

#[tokio::test]
async fn test_broadcast_reaches_every_peer() {
    let (mut server, url) = server().await;
    let mut a = ClientNetwork::connect(&url, protocol());
    let mut b = ClientNetwork::connect(&url, protocol());
    let _ = server_events(&mut server, 2).await;

    server.broadcast(&DataRequest {}).unwrap();
    for client in [&mut a, &mut b] {
        let events = client_events(client, 2).await;
        assert!(events[1].is::<DataRequest>());
    }
}

#[tokio::test]
async fn test_send_to_unknown_connection() {
    let (server, _url) = server().await;
    let err = server
        .send_to_id(ConnectionId(5), &DataRequest {})
        .unwrap_err();
    assert!(matches!(err, NetError::UnknownConnection(ConnectionId(5))));
}

#[tokio::test]
async fn test_client_reports_failed_connect() {
    let (server, url) = server().await;
    drop(server);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut client = ClientNetwork::connect(&url, protocol());
    let events = client_events(&mut client, 1).await;
    assert!(events[0].is::<Disconnected>());
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_silent_socket_does_not_block_other_peers() {
    let (mut server, url) = server().await;

    // Plain TCP that never sends the WebSocket upgrade.
    let _silent = tokio::net::TcpStream::connect(server.local_addr()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut client = ClientNetwork::connect(&url, protocol());
    let events = server_events(&mut server, 1).await;
    assert_eq!(events[0].0, ConnectionId(0));
    assert!(events[0].1.is::<ClientConnected>());
    assert_eq!(server.peer_count(), 1);

    let events = client_events(&mut client, 1).await;
    assert!(events[0].is::<Connected>());
}

/// A listener stuck in a failure that does not go away, like EMFILE.
struct FailingTransport {
    attempts: Arc<AtomicUsize>,
}

impl Transport for FailingTransport {
    type Connection = WebSocketConnection;
    type Handshake = WebSocketHandshake;

    async fn accept(&mut self) -> Result<Self::Handshake, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::AcceptFailed(io::Error::other("too many open files")))
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(SocketAddr::from(([127, 0, 0, 1], 0)))
    }
}

#[tokio::test]
async fn test_failing_accept_backs_off() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let transport = FailingTransport {
        attempts: Arc::clone(&attempts),
    };
    let server = ServerNetwork::<()>::with_transport(transport, protocol()).unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    let seen = attempts.load(Ordering::SeqCst);
    assert!((1..=5).contains(&seen), "{seen} accept attempts in 250ms");
    drop(server);
}
