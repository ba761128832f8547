use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::GameMode;

/// Server configuration, one JSON file read at startup.
///
/// Every field has a default, so operators only write the keys they care
/// about. A missing file is created with the defaults to give them
/// something to edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub data_dir: PathBuf,
    /// Seconds between position sampling batches.
    pub position_update_interval_seconds: u64,
    /// Seconds between background flushes of the history to disk.
    pub autosave_interval_seconds: u64,
    /// Game mode every player starts in.
    pub default_game_mode: GameMode,
    /// Player uids granted the admin role at join.
    pub admins: Vec<String>,
    /// Discord credentials for the audit side channel. Either one empty
    /// disables it; the local audit log is unaffected.
    pub discord_bot_token: String,
    pub discord_channel_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:25575".to_owned(),
            data_dir: PathBuf::from("data"),
            position_update_interval_seconds: 60,
            autosave_interval_seconds: 300,
            default_game_mode: GameMode::Survival,
            admins: vec![],
            discord_bot_token: String::new(),
            discord_channel_id: String::new(),
        }
    }
}

/// Loads `path`, writing the default config there first when absent.
pub fn load_or_create(path: &Path) -> io::Result<Config> {
    if !path.exists() {
        let config = Config::default();
        fs::write(path, serde_json::to_vec_pretty(&config)?)?;
        log::info!("wrote default config to {}", path.display());
        return Ok(config);
    }
    Ok(serde_json::from_slice(&fs::read(path)?)?)
}
