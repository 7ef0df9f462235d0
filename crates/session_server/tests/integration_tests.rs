//! Integration tests for the player port.
//!
//! These tests run a real [`SessionServer`] on an ephemeral port, talk to it
//! over TCP, and observe the calls it makes on a recording collaborator.

mod common;

use common::{assert_no_call, next_call, GameCall, RecordingGame};
use serde_json::json;
use session_server::{
    Colour, FramingMode, GameId, ServerConfig, ServerError, ServerState, SessionServer,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep, timeout, Duration};

type Calls = UnboundedReceiver<GameCall>;

async fn start_server(config: ServerConfig) -> (SessionServer, Arc<RecordingGame>, Calls, SocketAddr) {
    let (game, rx) = RecordingGame::new();
    let game = Arc::new(game);
    let server = SessionServer::new(config, game.clone());
    server.start(0, 0).await.expect("server should start");
    let addr = server.player_addr().await.expect("server should be listening");
    (server, game, rx, addr)
}

async fn send(stream: &mut TcpStream, message: serde_json::Value) {
    stream
        .write_all(message.to_string().as_bytes())
        .await
        .expect("write should succeed");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_registrations_receive_colours_in_arrival_order() {
    let (server, _game, mut rx, addr) = start_server(ServerConfig::default()).await;

    let mut first = TcpStream::connect(addr).await.unwrap();
    let mut second = TcpStream::connect(addr).await.unwrap();

    send(&mut first, json!({"type": "REGISTER", "student_id": "s1"})).await;
    let call1 = next_call(&mut rx).await;
    send(&mut second, json!({"type": "REGISTER", "student_id": "s2"})).await;
    let call2 = next_call(&mut rx).await;

    match (call1, call2) {
        (
            GameCall::AddPlayer {
                connection: c1,
                colour: colour1,
                game_id: id1,
            },
            GameCall::AddPlayer {
                connection: c2,
                colour: colour2,
                game_id: id2,
            },
        ) => {
            assert_eq!(colour1, Colour::Black);
            assert_eq!(colour2, Colour::Blue);
            assert_eq!(c1.remote_addr(), first.local_addr().unwrap());
            assert_eq!(c2.remote_addr(), second.local_addr().unwrap());
            assert_ne!(c1, c2);
            // No game announced yet
            assert_eq!(id1, GameId::UNSET);
            assert_eq!(id2, GameId::UNSET);
        }
        other => panic!("expected two AddPlayer calls, got {:?}", other),
    }

    server.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_seventh_registration_gets_no_colour() {
    let (server, _game, mut rx, addr) = start_server(ServerConfig::default()).await;
    let mut clients = Vec::new();

    let mut colours = Vec::new();
    for i in 0..6 {
        let mut client = TcpStream::connect(addr).await.unwrap();
        send(&mut client, json!({"type": "REGISTER", "student_id": format!("s{}", i)})).await;
        match next_call(&mut rx).await {
            GameCall::AddPlayer { colour, .. } => colours.push(colour),
            other => panic!("expected AddPlayer, got {:?}", other),
        }
        clients.push(client);
    }
    assert_eq!(colours, Colour::ALL.to_vec());

    let mut late = TcpStream::connect(addr).await.unwrap();
    send(&mut late, json!({"type": "REGISTER", "student_id": "s7"})).await;
    assert_no_call(&mut rx, Duration::from_millis(200)).await;
    assert_eq!(server.coordinator().remaining_colours().await, 0);

    // The listener keeps serving after the failed registration
    send(&mut late, json!({"type": "MOVE", "target": 1})).await;
    assert!(matches!(next_call(&mut rx).await, GameCall::MakeMove { .. }));

    server.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_game_id_is_recorded_once() {
    let (server, game, mut rx, addr) = start_server(ServerConfig::default()).await;
    assert_eq!(server.game_id().await, GameId(-1));

    game.initialise(GameId(42));
    timeout(Duration::from_secs(2), async {
        while server.game_id().await != GameId(42) {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("game id should be recorded");

    game.initialise(GameId(43));
    sleep(Duration::from_millis(100)).await;
    assert_eq!(server.game_id().await, GameId(42));

    let mut client = TcpStream::connect(addr).await.unwrap();
    send(&mut client, json!({"type": "REGISTER", "student_id": "s1"})).await;
    match next_call(&mut rx).await {
        GameCall::AddPlayer { colour, game_id, .. } => {
            assert_eq!(colour, Colour::Black);
            assert_eq!(game_id, GameId(42));
        }
        other => panic!("expected AddPlayer, got {:?}", other),
    }

    server.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_move_is_forwarded_verbatim_without_registration() {
    let (server, _game, mut rx, addr) = start_server(ServerConfig::default()).await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    let message = json!({
        "type": "MOVE",
        "colour": "Red",
        "target": 128,
        "ticket": "Underground",
        "double": [{"target": 140, "ticket": "Taxi"}]
    });
    send(&mut client, message.clone()).await;

    match next_call(&mut rx).await {
        GameCall::MakeMove {
            connection,
            payload,
        } => {
            assert_eq!(payload, message);
            assert_eq!(connection.remote_addr(), client.local_addr().unwrap());
        }
        other => panic!("expected MakeMove, got {:?}", other),
    }
    assert_eq!(server.coordinator().remaining_colours().await, 6);

    server.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_message_type_is_ignored() {
    let (server, _game, mut rx, addr) = start_server(ServerConfig::default()).await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    send(&mut client, json!({"type": "PING"})).await;
    assert_no_call(&mut rx, Duration::from_millis(150)).await;

    // Same connection is still served afterwards
    send(&mut client, json!({"type": "MOVE", "target": 5})).await;
    match next_call(&mut rx).await {
        GameCall::MakeMove { payload, .. } => assert_eq!(payload["target"], 5),
        other => panic!("expected MakeMove, got {:?}", other),
    }
    assert_eq!(server.coordinator().remaining_colours().await, 6);

    server.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_json_disconnects_only_the_sender() {
    let (server, _game, mut rx, addr) = start_server(ServerConfig::default()).await;

    let mut good = TcpStream::connect(addr).await.unwrap();
    let mut bad = TcpStream::connect(addr).await.unwrap();

    bad.write_all(b"this is not json").await.unwrap();

    let mut buf = [0u8; 16];
    let read = timeout(Duration::from_secs(2), bad.read(&mut buf))
        .await
        .expect("bad client should be disconnected");
    assert!(matches!(read, Ok(0) | Err(_)));

    send(&mut good, json!({"type": "REGISTER", "student_id": "s1"})).await;
    match next_call(&mut rx).await {
        GameCall::AddPlayer { colour, .. } => assert_eq!(colour, Colour::Black),
        other => panic!("expected AddPlayer, got {:?}", other),
    }

    server.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_lines_framing_splits_one_write() {
    let config = ServerConfig {
        framing: FramingMode::Lines,
        ..Default::default()
    };
    let (server, _game, mut rx, addr) = start_server(config).await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    client
        .write_all(
            b"{\"type\":\"REGISTER\",\"student_id\":\"s1\"}\n{\"type\":\"REGISTER\",\"student_id\":\"s2\"}\n",
        )
        .await
        .unwrap();

    let mut colours = Vec::new();
    for _ in 0..2 {
        match next_call(&mut rx).await {
            GameCall::AddPlayer { colour, .. } => colours.push(colour),
            other => panic!("expected AddPlayer, got {:?}", other),
        }
    }
    assert_eq!(colours, vec![Colour::Black, Colour::Blue]);

    server.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_close_refuses_new_connections() {
    let (server, _game, _rx, addr) = start_server(ServerConfig::default()).await;
    let _existing = TcpStream::connect(addr).await.unwrap();

    server.close().await.unwrap();
    assert_eq!(server.state().await, ServerState::Closed);
    assert!(server.player_addr().await.is_none());

    let attempt = timeout(Duration::from_secs(1), TcpStream::connect(addr)).await;
    assert!(
        !matches!(attempt, Ok(Ok(_))),
        "connection after close should be refused"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bind_failure_is_fatal() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let (game, _rx) = RecordingGame::new();
    let server = SessionServer::new(ServerConfig::default(), Arc::new(game));

    let result = server.start(port, 0).await;
    assert!(matches!(result, Err(ServerError::Bind { .. })));
    assert_eq!(server.state().await, ServerState::Idle);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_register_with_missing_or_numeric_student_id() {
    let (server, _game, mut rx, addr) = start_server(ServerConfig::default()).await;

    let mut anonymous = TcpStream::connect(addr).await.unwrap();
    send(&mut anonymous, json!({"type": "REGISTER"})).await;
    match next_call(&mut rx).await {
        GameCall::AddPlayer { colour, .. } => assert_eq!(colour, Colour::Black),
        other => panic!("expected AddPlayer, got {:?}", other),
    }

    let mut numeric = TcpStream::connect(addr).await.unwrap();
    send(&mut numeric, json!({"type": "REGISTER", "student_id": 12345})).await;
    match next_call(&mut rx).await {
        GameCall::AddPlayer { colour, .. } => assert_eq!(colour, Colour::Blue),
        other => panic!("expected AddPlayer, got {:?}", other),
    }

    // Both connections stay open
    send(&mut anonymous, json!({"type": "MOVE", "target": 1})).await;
    assert!(matches!(next_call(&mut rx).await, GameCall::MakeMove { .. }));
    send(&mut numeric, json!({"type": "MOVE", "target": 2})).await;
    assert!(matches!(next_call(&mut rx).await, GameCall::MakeMove { .. }));

    server.close().await.unwrap();
}
