//! Timed rule announcements
//!
//! Once armed, the scheduler hands out one rule per due poll, spaced by a fixed delay,
//! until the list is exhausted and it falls back to idle. Time is passed in by the
//! caller so the state machine can be driven without sleeping.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Armed {
    next_fire: Instant,
    index: usize,
}

/// Plays the rule list in order at a fixed cadence
#[derive(Debug)]
pub struct AnnouncementScheduler {
    rules: Vec<String>,
    interval: Duration,
    armed: Option<Armed>,
}

impl AnnouncementScheduler {
    pub fn new(rules: Vec<String>, interval: Duration) -> Self {
        Self {
            rules,
            interval,
            armed: None,
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Index of the next rule to announce while armed
    pub fn position(&self) -> Option<usize> {
        self.armed.map(|a| a.index)
    }

    /// Starts the sequence with the first rule due at `now`
    ///
    /// Returns false without touching progress if already armed, or if there are no rules.
    pub fn arm(&mut self, now: Instant) -> bool {
        if self.armed.is_some() || self.rules.is_empty() {
            return false;
        }
        self.armed = Some(Armed {
            next_fire: now,
            index: 0,
        });
        true
    }

    /// Returns the rule due at `now`, if any, and advances the sequence
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let armed = self.armed.as_mut()?;
        if now < armed.next_fire {
            return None;
        }

        let rule = self.rules.get(armed.index)?.clone();
        armed.index += 1;

        match now.checked_add(self.interval) {
            Some(next_fire) if armed.index < self.rules.len() => armed.next_fire = next_fire,
            // End of the list, or a delay too long to ever come due
            _ => self.armed = None,
        }
        Some(rule)
    }
}
