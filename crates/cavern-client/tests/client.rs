//! Headless clients against a real server running its own tick loop.

use std::net::SocketAddr;
use std::time::Duration;

use cavern_client::{ClientApp, ClientConfig, ClientError};
use cavern_protocol::catalogue::IntroductionRequest;
use cavern_server::{ServerApp, ServerConfig, TurnPolicy};

async fn spawn_server_with(policy: TurnPolicy) -> SocketAddr {
    let config = ServerConfig::default()
        .bind("127.0.0.1:0")
        .world_size(10, 10)
        .tick_rate(100)
        .turn_policy(policy)
        .name("grotto")
        .seed(5);
    let app = ServerApp::bind(config).await.unwrap();
    let addr = app.local_addr();
    tokio::spawn(app.run());
    addr
}

async fn spawn_server() -> SocketAddr {
    spawn_server_with(TurnPolicy::AutoAdvance).await
}

fn config(addr: SocketAddr, name: &str) -> ClientConfig {
    ClientConfig::default()
        .url(&format!("ws://{addr}"))
        .name(name)
        .tick_rate(100)
}

/// Ticks `app` until `done` holds, or panics after two seconds.
async fn tick_until(app: &mut ClientApp, done: impl Fn(&ClientApp) -> bool) {
    for _ in 0..400 {
        app.update();
        if done(app) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition never met");
}

#[tokio::test]
async fn test_client_plays_until_max_turns() {
    let addr = spawn_server().await;
    let app = ClientApp::connect(config(addr, "og").max_turns(3)).unwrap();

    let state = tokio::time::timeout(Duration::from_secs(5), app.run())
        .await
        .expect("client should finish")
        .unwrap();

    assert_eq!(state.turns_played, 3);
    assert!(state.is_disconnected());
    assert_eq!((state.world.width(), state.world.height()), (10, 10));
    let actor = state.actor.as_ref().unwrap();
    assert_eq!(actor.kind, "caveman");
    assert!(state.world.find("caveman").contains(&(actor.x as usize, actor.y as usize)));
}

#[tokio::test]
async fn test_two_clients_share_the_turns() {
    let addr = spawn_server().await;
    let first = ClientApp::connect(config(addr, "first").max_turns(2)).unwrap();
    let second = ClientApp::connect(config(addr, "second").max_turns(2)).unwrap();

    let (first, second) = tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(first.run(), second.run())
    })
    .await
    .expect("both clients should finish");

    assert_eq!(first.unwrap().turns_played, 2);
    assert_eq!(second.unwrap().turns_played, 2);
}

#[tokio::test]
async fn test_clients_end_their_turns_on_a_manual_server() {
    let addr = spawn_server_with(TurnPolicy::Manual).await;
    let first = ClientApp::connect(config(addr, "first").max_turns(2).end_turns(true)).unwrap();
    let second = ClientApp::connect(config(addr, "second").max_turns(2).end_turns(true)).unwrap();

    let (first, second) = tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(first.run(), second.run())
    })
    .await
    .expect("both clients should finish");

    assert_eq!(first.unwrap().turns_played, 2);
    assert_eq!(second.unwrap().turns_played, 2);
}

#[tokio::test]
async fn test_manual_play() {
    let addr = spawn_server().await;
    let mut app = ClientApp::connect(config(addr, "careful").auto_play(false)).unwrap();

    tick_until(&mut app, |app| app.state().my_turn).await;
    assert!(app.state().last_result.is_none());
    assert!(app.state().actor.is_some());

    app.state_mut().play_turn();
    assert!(!app.state().my_turn);
    tick_until(&mut app, |app| app.state().last_result.is_some()).await;
    assert_eq!(app.state().turns_played, 1);
}

#[tokio::test]
async fn test_server_introduces_itself() {
    let addr = spawn_server().await;
    let mut app = ClientApp::connect(config(addr, "curious").auto_play(false)).unwrap();
    app.state().network.send(&IntroductionRequest {}).unwrap();

    tick_until(&mut app, |app| app.state().server_name.is_some()).await;
    assert_eq!(app.state().server_name.as_deref(), Some("grotto"));
}

#[tokio::test]
async fn test_unreachable_server() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed = listener.local_addr().unwrap();
    drop(listener);

    let app = ClientApp::connect(config(closed, "lost")).unwrap();
    let err = tokio::time::timeout(Duration::from_secs(5), app.run())
        .await
        .expect("client should give up")
        .unwrap_err();
    assert!(matches!(err, ClientError::Unreachable(url) if url.contains(&closed.port().to_string())));
}
