//! External roster notifications
//!
//! The poller only knows the [`Notifier`] trait. Refreshing is best-effort: an
//! implementation logs its own failures and never reports them back, so a broken
//! notification channel can't disturb monitoring.
//!
//! [`TelegramNotifier`] keeps a single summary message per channel up to date. The
//! first refresh posts it, later refreshes edit it in place. The message id is stored
//! on disk so a restart keeps editing the same message.

use crate::error::NotifyError;
use chrono::Local;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use shared::ServerInfo;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const TELEGRAM_API: &str = "https://api.telegram.org";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Receives the roster whenever it changes
#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn refresh(&mut self, players: &[String], info: &ServerInfo);
}

/// Notifier used when no channel is configured
#[derive(Debug, Default)]
pub struct Disabled;

impl Notifier for Disabled {
    async fn refresh(&mut self, _players: &[String], _info: &ServerInfo) {}
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Renders the channel summary in Telegram's HTML flavour
pub fn format_summary(players: &[String], info: &ServerInfo, updated: &str) -> String {
    let list = players
        .iter()
        .map(|p| format!("- <b>{}</b>", escape_html(p)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Server: <b>{}</b>\n\nPlayers <b>{}</b> / {}:\n\n{}\n\nBots: {}\nMap: <b>{}</b>\nLast update: {}",
        escape_html(&info.name),
        info.players,
        info.max_players,
        list,
        info.bots,
        escape_html(&info.map),
        updated
    )
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredMessage {
    message_id: i64,
}

/// Reads the remembered message id; a missing or unreadable file means none
fn load_message_id(path: &Path) -> Option<i64> {
    let bytes = std::fs::read(path).ok()?;
    match bincode::deserialize::<StoredMessage>(&bytes) {
        Ok(stored) if stored.message_id > 0 => Some(stored.message_id),
        Ok(_) => None,
        Err(e) => {
            debug!("Ignoring message id file {}: {}", path.display(), e);
            None
        }
    }
}

fn store_message_id(path: &Path, message_id: i64) -> Result<(), NotifyError> {
    let bytes = bincode::serialize(&StoredMessage { message_id })?;
    std::fs::write(path, bytes)?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    result: Option<ApiMessage>,
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message_id: i64,
}

/// Posts and edits the summary message in a Telegram channel
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    token: String,
    channel_id: String,
    message_id: Option<i64>,
    message_id_file: PathBuf,
}

impl TelegramNotifier {
    pub fn new(
        token: &str,
        channel_id: &str,
        message_id_file: &Path,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let message_id = load_message_id(message_id_file);
        if let Some(id) = message_id {
            info!("Continuing to edit Telegram message {}", id);
        }

        Ok(Self {
            client,
            api_base: TELEGRAM_API.to_string(),
            token: token.to_string(),
            channel_id: channel_id.to_string(),
            message_id,
            message_id_file: message_id_file.to_path_buf(),
        })
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn message_id(&self) -> Option<i64> {
        self.message_id
    }

    /// Sends `text` as a new message or as an edit of the remembered one
    pub async fn send(&mut self, text: &str) -> Result<(), NotifyError> {
        let method = if self.message_id.is_some() {
            "editMessageText"
        } else {
            "sendMessage"
        };
        let url = format!("{}/bot{}/{}", self.api_base, self.token, method);

        let mut params = vec![
            ("chat_id", self.channel_id.clone()),
            ("text", text.to_string()),
            ("parse_mode", "HTML".to_string()),
        ];
        if let Some(id) = self.message_id {
            params.push(("message_id", id.to_string()));
        }

        let body = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await?
            .text()
            .await?;
        let response: ApiResponse = serde_json::from_str(&body)?;

        if !response.ok {
            if response.description.contains("message to edit not found") {
                // Deleted by hand: post a fresh one next time
                self.message_id = None;
            }
            return Err(NotifyError::Api {
                code: response.error_code,
                description: response.description,
            });
        }

        let message = response.result.ok_or(NotifyError::MissingResult)?;
        if self.message_id != Some(message.message_id) {
            self.message_id = Some(message.message_id);
            store_message_id(&self.message_id_file, message.message_id)?;
        }
        Ok(())
    }
}

impl Notifier for TelegramNotifier {
    async fn refresh(&mut self, players: &[String], info: &ServerInfo) {
        let updated = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let text = format_summary(players, info, &updated);
        if let Err(e) = self.send(&text).await {
            error!("Sending Telegram message failed: {}", e);
        }
    }
}
