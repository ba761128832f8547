use crate::prelude::*;

use serde::Serialize;

/// Everything the server may send to a client, one JSON object per line.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Welcome { role: String, mode: GameMode },
    Ping,
    Notice { message: String },
    Data(QueryResponse),
}

impl Response {
    /// Appends the serialized message and its line terminator to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        serde_json::to_writer(&mut *out, self).expect("responses always serialize");
        out.push(b'\n');
    }
}
