//! Tracking of players seen across query cycles
//!
//! Each tracked player carries a single flag: whether the rule announcement may still
//! be triggered on their account. A player goes through three stages:
//! - pending: seen, has not been connected long enough to trigger the rules
//! - notified: passed the first-rule delay, flag cleared
//! - gone: missing from the latest snapshot, entry dropped
//!
//! The roster lives as long as the process; nothing is persisted.

use shared::RosterSnapshot;
use std::collections::BTreeMap;
use std::time::Duration;

/// Names that appeared and disappeared between two rosters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RosterDiff {
    pub joined: Vec<String>,
    pub left: Vec<String>,
}

impl RosterDiff {
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

/// Result of feeding one snapshot into the roster
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RosterUpdate {
    pub diff: RosterDiff,
    /// Players that crossed the first-rule delay during this update
    pub became_eligible: Vec<String>,
}

/// Players currently on the server with their rule-pending flag
#[derive(Debug, Default)]
pub struct TrackedRoster {
    players: BTreeMap<String, bool>,
}

impl TrackedRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.players.contains_key(name)
    }

    /// Whether `name` has not yet triggered the rules; `None` if not tracked
    pub fn is_rule_pending(&self, name: &str) -> Option<bool> {
        self.players.get(name).copied()
    }

    /// Tracked names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.players.keys().cloned().collect()
    }

    /// Compares the tracked names against `snapshot` without changing anything
    pub fn diff(&self, snapshot: &RosterSnapshot) -> RosterDiff {
        RosterDiff {
            joined: snapshot
                .keys()
                .filter(|name| !self.players.contains_key(*name))
                .cloned()
                .collect(),
            left: self
                .players
                .keys()
                .filter(|name| !snapshot.contains_key(*name))
                .cloned()
                .collect(),
        }
    }

    /// Brings the roster in line with `snapshot`
    ///
    /// Players already tracked and still pending become eligible once their session
    /// is longer than `first_rule_delay`. Newly joined players are only checked from
    /// the next update on.
    pub fn apply(
        &mut self,
        snapshot: &RosterSnapshot,
        first_rule_delay: Duration,
    ) -> RosterUpdate {
        let diff = self.diff(snapshot);
        let mut became_eligible = Vec::new();

        for (name, connected) in snapshot {
            if let Some(pending) = self.players.get_mut(name) {
                if *pending && *connected > first_rule_delay {
                    *pending = false;
                    became_eligible.push(name.clone());
                }
            }
        }

        for name in &diff.joined {
            self.players.insert(name.clone(), true);
        }
        for name in &diff.left {
            self.players.remove(name);
        }

        RosterUpdate {
            diff,
            became_eligible,
        }
    }
}
