use super::*;

use serde::Deserialize;

/// Everything a joined client may send, one JSON object per line.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(super) enum ClientMessage {
    Join {
        uid: String,
        name: String,
    },
    Move {
        x: f64,
        y: f64,
        z: f64,
        #[serde(default)]
        yaw: f32,
    },
    Query {
        #[serde(default)]
        date: String,
        #[serde(default)]
        player_filter: String,
    },
    Pong,
    SetMode {
        mode: GameMode,
    },
    Save,
    Stop,
}

impl crate::World {
    pub(super) fn play_request(
        &mut self,
        pid: usize,
        inboxes: Inboxes,
        message: ClientMessage,
    ) -> Result<(), Disconnection> {
        match message {
            // joining twice is a broken client
            ClientMessage::Join { .. } => return Err(Disconnection),
            ClientMessage::Move { x, y, z, yaw } => self.request_move(pid, x, y, z, yaw),
            ClientMessage::Query { date, player_filter } => {
                self.request_data(pid, inboxes, QueryRequest { date, player_filter });
            }
            ClientMessage::Pong => self.acknowledge_ping(pid),
            ClientMessage::SetMode { mode } => self.set_mode(pid, mode),
            ClientMessage::Save => self.request_save(pid, inboxes),
            ClientMessage::Stop => self.request_stop(pid),
        }
        Ok(())
    }
}
