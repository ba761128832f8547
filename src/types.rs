use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Sentinel player filter meaning "no filter".
pub const ALL_PLAYERS: &str = "__all__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Survival,
    Creative,
}

/// One player's position and orientation, captured at one sampling tick.
///
/// Records are immutable once created. Coordinates are rounded to one
/// fractional digit at capture. `yaw` is absent from history files written
/// before orientation was recorded, so it defaults to zero on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub timestamp: String,
    pub player_uid: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub yaw: f32,
}

/// Raw sample handed to the store by the tick loop, before rounding and
/// timestamping.
#[derive(Debug, Clone)]
pub struct Sample {
    pub player_uid: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
}

/// A date/player-filtered history request. Both fields may be empty: an
/// empty date asks for the list of available dates only, an empty (or
/// [`ALL_PLAYERS`]) filter keeps every player's records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryRequest {
    pub date: String,
    pub player_filter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub available_dates: Vec<String>,
    pub records: Vec<PositionRecord>,
    pub player_names: HashMap<String, String>,
}

/// The client sent something we can't recover from; drop the connection.
#[derive(Debug)]
pub struct Disconnection;
