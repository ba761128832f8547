use crate::prelude::*;

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::Utc;

use crate::audit::{AuditLog, Notifier};
use crate::config::Config;
use crate::gate::{AuthContext, Outcome, PlayerDirectory, QueryGate, ADMIN_ROLE};
use crate::store::PositionStore;

pub const TICKS_PER_SECOND: u32 = 20;
const PING_INTERVAL_TICKS: u32 = 5 * TICKS_PER_SECOND;
const PING_TIMEOUT_TICKS: u32 = 20 * TICKS_PER_SECOND;

#[derive(Debug, Clone)]
struct Player {
    uid: String,
    name: String,
    role: String,
    mode: GameMode,
    position: (f64, f64, f64),
    yaw: f32,
    last_ping_ack: u32,
}

/// Last-known display names for every uid that joined this session. This is
/// the player directory the gate resolves response names through.
#[derive(Debug, Default)]
pub struct Roster {
    names: HashMap<String, String>,
}

impl Roster {
    fn remember(&mut self, uid: &str, name: &str) {
        self.names.insert(uid.to_owned(), name.to_owned());
    }
}

impl PlayerDirectory for Roster {
    fn last_known_name(&self, uid: &str) -> Option<String> {
        self.names.get(uid).cloned()
    }
}

/// Live server state: joined players, the position history, and the query
/// gate. Driven by the network layer between ticks and by `tick_until` on
/// the fixed 50 ms cadence.
pub struct World {
    players: Vec<Option<Player>>,
    roster: Roster,
    store: PositionStore,
    gate: QueryGate,
    data_dir: PathBuf,
    default_mode: GameMode,
    admins: Vec<String>,
    sample_interval_ticks: u32,
    autosave_interval_ticks: u32,
    tick: u32,
    stopping: bool,
}

impl World {
    pub fn new(config: &Config) -> io::Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        let audit = AuditLog::open(&config.data_dir.join("audit.log"))?;
        let notifier = crate::audit::DiscordNotifier::from_credentials(
            &config.discord_bot_token,
            &config.discord_channel_id,
        )
        .map(|n| Box::new(n) as Box<dyn Notifier>);
        Ok(Self {
            players: vec![],
            roster: Roster::default(),
            store: PositionStore::new(),
            gate: QueryGate::new(Box::new(audit), notifier),
            data_dir: config.data_dir.clone(),
            default_mode: config.default_game_mode,
            admins: config.admins.clone(),
            sample_interval_ticks: config.position_update_interval_seconds.max(1) as u32 * TICKS_PER_SECOND,
            autosave_interval_ticks: config.autosave_interval_seconds.max(1) as u32 * TICKS_PER_SECOND,
            tick: 0,
            stopping: false,
        })
    }

    pub fn load_positions(&mut self) -> io::Result<()> {
        self.store.load_from_dir(&self.data_dir)
    }
    pub fn save_positions(&self) -> io::Result<()> {
        self.store.save_to_dir(&self.data_dir)
    }
    pub fn stopping(&self) -> bool {
        self.stopping
    }

    pub fn tick_until(&mut self, tickn: u32, mut inboxes: Inboxes) {
        while self.tick < tickn {
            self.tick(inboxes.reborrow());
            self.tick += 1;
        }
    }
    pub fn next_tick(&self) -> u32 {
        self.tick + 1
    }

    fn player(&self, pid: usize) -> Option<&Player> {
        self.players.get(pid).and_then(Option::as_ref)
    }
    fn player_mut(&mut self, pid: usize) -> Option<&mut Player> {
        self.players.get_mut(pid).and_then(Option::as_mut)
    }
    fn context(player: &Player) -> AuthContext {
        AuthContext {
            role: player.role.clone(),
            mode: player.mode,
        }
    }

    pub(crate) fn login(&mut self, pid: usize, uid: String, name: String, mut inbox: Inbox) {
        let role = if self.admins.iter().any(|a| a == &uid) {
            ADMIN_ROLE.to_owned()
        } else {
            "player".to_owned()
        };
        self.roster.remember(&uid, &name);
        log::info!("{name} ({uid}) joined as {role}");
        inbox.submit(Response::Welcome {
            role: role.clone(),
            mode: self.default_mode,
        });
        let player = Player {
            uid,
            name,
            role,
            mode: self.default_mode,
            position: (0.0, 0.0, 0.0),
            yaw: 0.0,
            last_ping_ack: self.tick,
        };
        if self.players.len() <= pid {
            self.players.resize_with(pid + 1, || None);
        }
        self.players[pid] = Some(player);
    }

    pub(crate) fn logout(&mut self, pid: usize) {
        if let Some(player) = self.players.get_mut(pid).and_then(Option::take) {
            log::info!("{} left", player.name);
        }
    }

    pub(crate) fn acknowledge_ping(&mut self, pid: usize) {
        let tick = self.tick;
        if let Some(player) = self.player_mut(pid) {
            player.last_ping_ack = tick;
        }
    }

    pub(crate) fn request_move(&mut self, pid: usize, x: f64, y: f64, z: f64, yaw: f32) {
        if let Some(player) = self.player_mut(pid) {
            player.position = (x, y, z);
            player.yaw = yaw;
        }
    }

    /// Admins may switch their own game mode; everyone else is refused.
    /// Authorization reads the mode live, so dropping out of creative
    /// drops query access with it.
    pub(crate) fn set_mode(&mut self, pid: usize, mode: GameMode) {
        if let Some(player) = self.player_mut(pid) {
            if player.role == ADMIN_ROLE {
                player.mode = mode;
            } else {
                log::warn!("{} tried to switch game mode without permission", player.name);
            }
        }
    }

    pub(crate) fn request_data(&self, pid: usize, mut inboxes: Inboxes, request: QueryRequest) {
        let Some(player) = self.player(pid) else { return };
        match self.gate.handle(
            &player.uid,
            &player.name,
            &Self::context(player),
            &request,
            &self.store,
            &self.roster,
        ) {
            Outcome::Granted(response) => inboxes.get(pid).unwrap().submit(Response::Data(response)),
            Outcome::Denied => {}
        }
    }

    pub(crate) fn request_save(&self, pid: usize, mut inboxes: Inboxes) {
        let Some(player) = self.player(pid) else { return };
        if !self.gate.authorizes(&Self::context(player)) {
            log::warn!("unauthorized save request from {}", player.name);
            return;
        }
        match self.save_positions() {
            Ok(()) => inboxes.get(pid).unwrap().submit(Response::Notice {
                message: format!("saved position data for {} days", self.store.day_count()),
            }),
            Err(e) => log::error!("save requested by {} failed: {e}", player.name),
        }
    }

    pub(crate) fn request_stop(&mut self, pid: usize) {
        let Some(player) = self.player(pid) else { return };
        if !self.gate.authorizes(&Self::context(player)) {
            log::warn!("unauthorized stop request from {}", player.name);
            return;
        }
        log::info!("shutdown requested by {}", player.name);
        self.stopping = true;
    }

    fn sample_positions(&mut self) {
        let samples: Vec<Sample> = self
            .players
            .iter()
            .flatten()
            .map(|p| Sample {
                player_uid: p.uid.clone(),
                x: p.position.0,
                y: p.position.1,
                z: p.position.2,
                yaw: p.yaw,
            })
            .collect();
        if samples.is_empty() {
            return;
        }
        self.store.record_batch(Utc::now(), &samples);
    }

    fn tick(&mut self, inboxes: Inboxes) {
        if self.tick % PING_INTERVAL_TICKS == 0 {
            let tick = self.tick;
            let players = &mut self.players;
            inboxes.retain(|pid, mut inbox| {
                let Some(player) = players.get_mut(pid).and_then(Option::as_mut) else {
                    return true;
                };
                if tick.saturating_sub(player.last_ping_ack) > PING_TIMEOUT_TICKS {
                    log::warn!("{} timed out", player.name);
                    players[pid] = None;
                    false
                } else {
                    inbox.submit(Response::Ping);
                    true
                }
            });
        }
        if self.tick % self.sample_interval_ticks == 0 {
            self.sample_positions();
        }
        if self.tick != 0 && self.tick % self.autosave_interval_ticks == 0 {
            if let Err(e) = self.save_positions() {
                log::error!("autosave failed: {e}");
            }
        }
    }
}
