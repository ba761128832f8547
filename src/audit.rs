use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};

/// Durable sink receiving one line per granted query.
pub trait AuditSink {
    fn append(&self, line: &str);
}

/// Best-effort side channel for audit lines. Delivery runs off the main
/// thread and a failure must never reach the query path.
pub trait Notifier {
    fn notify(&self, message: &str);
}

/// Append-only audit log file. Lines are timestamped at append time; a
/// failed append is logged and swallowed, never surfaced to the query path.
#[derive(Debug)]
pub struct AuditLog {
    file: File,
}

impl AuditLog {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl AuditSink for AuditLog {
    fn append(&self, line: &str) {
        let stamped = format!("{} {line}\n", Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
        if let Err(e) = (&self.file).write_all(stamped.as_bytes()) {
            log::warn!("failed to append audit line: {e}");
        }
    }
}

/// Forwards audit lines to a Discord channel through the bot API.
pub struct DiscordNotifier {
    client: reqwest::blocking::Client,
    url: String,
    authorization: String,
}

impl DiscordNotifier {
    /// Returns `None` when either credential is missing, which disables the
    /// side channel without touching the audit log.
    pub fn from_credentials(bot_token: &str, channel_id: &str) -> Option<Self> {
        if bot_token.is_empty() || channel_id.is_empty() {
            return None;
        }
        let client = match reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                log::warn!("discord notifier disabled: {e}");
                return None;
            }
        };
        Some(Self {
            client,
            url: format!("https://discord.com/api/v10/channels/{channel_id}/messages"),
            authorization: format!("Bot {bot_token}"),
        })
    }
}

impl Notifier for DiscordNotifier {
    fn notify(&self, message: &str) {
        let client = self.client.clone();
        let url = self.url.clone();
        let authorization = self.authorization.clone();
        let body = serde_json::json!({ "content": message });
        thread::spawn(move || {
            let sent = client
                .post(&url)
                .header("Authorization", authorization)
                .json(&body)
                .send()
                .and_then(|response| response.error_for_status());
            if let Err(e) = sent {
                log::warn!("failed to send discord audit: {e}");
            }
        });
    }
}
