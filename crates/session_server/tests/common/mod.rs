//! Shared helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use session_server::{
    CollaboratorError, Colour, GameCollaborator, GameId, GameNotifier, PlayerConnection,
};
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// A call received by [`RecordingGame`].
#[derive(Debug, Clone)]
pub enum GameCall {
    AddPlayer {
        connection: PlayerConnection,
        colour: Colour,
        game_id: GameId,
    },
    MakeMove {
        connection: PlayerConnection,
        payload: Value,
    },
}

/// Game collaborator that records every call and exposes its notifier.
pub struct RecordingGame {
    calls: mpsc::UnboundedSender<GameCall>,
    notifier: Mutex<Option<GameNotifier>>,
}

impl RecordingGame {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<GameCall>) {
        let (calls, rx) = mpsc::unbounded_channel();
        (
            Self {
                calls,
                notifier: Mutex::new(None),
            },
            rx,
        )
    }

    /// Announces a game as the real game server would.
    pub fn initialise(&self, game_id: GameId) {
        let notifier = self.notifier.lock().unwrap().clone();
        notifier
            .expect("collaborator is not listening")
            .initialised(game_id);
    }
}

#[async_trait]
impl GameCollaborator for RecordingGame {
    async fn listen(
        &self,
        _addr: SocketAddr,
        notifier: GameNotifier,
    ) -> Result<(), CollaboratorError> {
        *self.notifier.lock().unwrap() = Some(notifier);
        Ok(())
    }

    async fn close(&self) -> Result<(), CollaboratorError> {
        self.notifier.lock().unwrap().take();
        Ok(())
    }

    async fn add_player(
        &self,
        connection: &PlayerConnection,
        colour: Colour,
        game_id: GameId,
    ) -> Result<(), CollaboratorError> {
        let _ = self.calls.send(GameCall::AddPlayer {
            connection: connection.clone(),
            colour,
            game_id,
        });
        Ok(())
    }

    async fn make_move(
        &self,
        connection: &PlayerConnection,
        payload: Value,
    ) -> Result<(), CollaboratorError> {
        let _ = self.calls.send(GameCall::MakeMove {
            connection: connection.clone(),
            payload,
        });
        Ok(())
    }
}

/// Waits for the next recorded call, failing the test after two seconds.
pub async fn next_call(rx: &mut mpsc::UnboundedReceiver<GameCall>) -> GameCall {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a game call")
        .expect("call channel closed")
}

/// Asserts that no call arrives within `wait`.
pub async fn assert_no_call(rx: &mut mpsc::UnboundedReceiver<GameCall>, wait: Duration) {
    if let Ok(Some(call)) = timeout(wait, rx.recv()).await {
        panic!("unexpected game call: {:?}", call);
    }
}
