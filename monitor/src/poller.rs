//! Presence poller: the monitor's main loop
//!
//! Each cycle queries the server, diffs the roster against the tracked players,
//! greets and bids farewell over the console, arms the rule announcements when a
//! player has been around long enough, and plays any announcement that is due.
//!
//! All state (tracked roster, last server info, announcement progress) is owned here
//! and only touched by the cycle itself, one cycle at a time.

use crate::config::{fill_template, Config};
use crate::console_client::ConsoleClient;
use crate::error::{ConsoleError, MonitorError};
use crate::notifier::Notifier;
use crate::query_client::QueryClient;
use crate::roster::TrackedRoster;
use crate::scheduler::AnnouncementScheduler;
use log::{error, info, warn};
use shared::{RosterSnapshot, ServerInfo};
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Pause after a successful cycle
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Pause after the server could not be queried
pub const RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Behaviour knobs for the poller
#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub template_welcome: String,
    pub template_farewell: String,
    pub first_rule_delay: Duration,
    pub poll_interval: Duration,
    pub retry_interval: Duration,
    pub exit_on_auth_failure: bool,
}

impl PollerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            template_welcome: config.template_welcome.clone(),
            template_farewell: config.template_farewell.clone(),
            first_rule_delay: config.first_rule_delay,
            poll_interval: POLL_INTERVAL,
            retry_interval: RETRY_INTERVAL,
            exit_on_auth_failure: config.exit_on_auth_failure,
        }
    }
}

/// What a snapshot means for the outside world
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Console messages to say, in order
    pub messages: Vec<String>,
    pub roster_changed: bool,
}

/// Watches one server and reacts to players coming and going
pub struct Poller<N: Notifier> {
    query: QueryClient,
    console: ConsoleClient,
    notifier: N,
    settings: PollerSettings,
    roster: TrackedRoster,
    server_info: ServerInfo,
    scheduler: AnnouncementScheduler,
    notified: bool,
}

impl<N: Notifier> Poller<N> {
    pub fn new(
        query: QueryClient,
        console: ConsoleClient,
        notifier: N,
        scheduler: AnnouncementScheduler,
        settings: PollerSettings,
    ) -> Self {
        Self {
            query,
            console,
            notifier,
            settings,
            roster: TrackedRoster::new(),
            server_info: ServerInfo::default(),
            scheduler,
            notified: false,
        }
    }

    /// Wires up clients and scheduler from a loaded config
    pub fn from_config(config: &Config, rules: Vec<String>, notifier: N) -> Self {
        Self::new(
            QueryClient::new(&config.host, config.query_port),
            ConsoleClient::new(&config.host, config.rcon_port, &config.rcon_password),
            notifier,
            AnnouncementScheduler::new(rules, config.next_rule_delay),
            PollerSettings::from_config(config),
        )
    }

    pub fn roster(&self) -> &TrackedRoster {
        &self.roster
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    pub fn scheduler(&self) -> &AnnouncementScheduler {
        &self.scheduler
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Folds a fresh snapshot into the poller state
    ///
    /// Pure state transition: works out greetings, farewells and the next due rule
    /// without sending anything. `info` replaces the cached server info when present.
    pub fn observe(
        &mut self,
        snapshot: &RosterSnapshot,
        info: Option<ServerInfo>,
        now: Instant,
    ) -> CycleOutcome {
        if let Some(info) = info {
            self.server_info = info;
        }

        let update = self.roster.apply(snapshot, self.settings.first_rule_delay);
        let mut messages = Vec::new();

        for name in &update.diff.joined {
            info!("Player joined: {}", name);
            messages.push(fill_template(&self.settings.template_welcome, name));
        }
        for name in &update.diff.left {
            info!("Player left: {}", name);
            messages.push(fill_template(&self.settings.template_farewell, name));
        }

        if let Some(name) = update.became_eligible.first() {
            if self.scheduler.arm(now) {
                info!(
                    "Announcing {} rules, triggered by {}",
                    self.scheduler.rule_count(),
                    name
                );
            }
        }
        if let Some(rule) = self.scheduler.poll(now) {
            messages.push(rule);
        }

        CycleOutcome {
            messages,
            roster_changed: !update.diff.is_empty(),
        }
    }

    /// Says `text` on the server
    ///
    /// Console trouble is logged and skipped. A rejected password ends monitoring
    /// when the settings ask for it.
    async fn say(&self, text: &str) -> Result<(), MonitorError> {
        match self.console.say(text).await {
            Ok(()) => {
                info!("Said: {}", text);
                Ok(())
            }
            Err(ConsoleError::AuthRejected) if self.settings.exit_on_auth_failure => {
                error!("Console authentication failed. Password wrong?");
                Err(MonitorError::AuthRejected)
            }
            Err(e) => {
                warn!("Could not say \"{}\": {}", text, e);
                Ok(())
            }
        }
    }

    /// Runs one query cycle and returns how long to wait before the next
    pub async fn run_cycle(&mut self) -> Result<Duration, MonitorError> {
        let (snapshot, info) = match self.query.query_server().await {
            Ok(result) => result,
            Err(e) => {
                warn!("Querying {} failed: {}", self.query.addr(), e);
                return Ok(self.settings.retry_interval);
            }
        };

        let outcome = self.observe(&snapshot, info, Instant::now());
        for message in &outcome.messages {
            self.say(message).await?;
        }

        if outcome.roster_changed || !self.notified {
            self.notifier
                .refresh(&self.roster.names(), &self.server_info)
                .await;
            self.notified = true;
        }

        Ok(self.settings.poll_interval)
    }

    /// Polls until a fatal error occurs
    pub async fn run(&mut self) -> Result<(), MonitorError> {
        info!("Start monitoring {}", self.query.addr());
        loop {
            let pause = self.run_cycle().await?;
            sleep(pause).await;
        }
    }
}
