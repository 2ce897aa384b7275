//! # Game Server Receptionist
//!
//! This library watches a live game server from the outside and acts as its
//! receptionist: it greets players when they join, says goodbye when they leave, and
//! reads out the server rules once somebody has stuck around for a while.
//!
//! ## How it talks to the server
//!
//! ### Server Query (UDP)
//! The roster and server metadata come from the server's query port. Each poll sends
//! a player-list request (answering a challenge when the server asks for one) and a
//! best-effort info request. See [`query_client`].
//!
//! ### Remote Console (TCP)
//! Greetings and rules are broadcast with `say` over the password-protected remote
//! console. Each command opens its own connection, authenticates and closes again.
//! See [`console_client`].
//!
//! ## Module Organization
//!
//! ### Poller (`poller`)
//! The single loop that drives everything:
//! - Query the server, back off for longer when it doesn't answer
//! - Diff the new roster against the tracked players
//! - Send welcome and farewell messages
//! - Arm and advance the rule announcements
//! - Refresh the external notification when the roster changed
//!
//! ### Roster (`roster`)
//! Tracked players and whether each may still trigger the rules.
//!
//! ### Scheduler (`scheduler`)
//! Plays the rule list one line at a time with a fixed delay between lines.
//!
//! ### Notifier (`notifier`)
//! Optional summary message in a Telegram channel, edited in place on every change.
//!
//! ### Config and Rules (`config`, `rules`)
//! Loading of the `key = value` config file and the one-rule-per-line rules file.
//!
//! ## Concurrency
//! Everything runs as one sequential task. Every socket operation is bounded by a
//! short timeout, so a dead server or console can delay a cycle but never stall the
//! loop. No state is shared, so nothing needs locking.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use monitor::config::Config;
//! use monitor::notifier::Disabled;
//! use monitor::poller::Poller;
//! use monitor::rules::load_rules;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Path::new("isr.cfg"))?;
//!     let rules = load_rules(&config.rule_file);
//!
//!     let mut poller = Poller::from_config(&config, rules, Disabled);
//!     poller.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod console_client;
pub mod error;
pub mod notifier;
pub mod poller;
pub mod query_client;
pub mod roster;
pub mod rules;
pub mod scheduler;
