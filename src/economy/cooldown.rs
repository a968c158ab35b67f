//! Per-player action cooldowns.
//!
//! A player holds at most one timer per action key. Setting a cooldown for a key
//! that already has one replaces it; nothing ever stacks.

use std::fmt;

use crate::errors::GameError;
use crate::storage::types::Cooldown;

/// Actions gated by a cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Hunt,
    Abyss,
    Explore,
    Gather,
    Craft,
    Cook,
    Expedition,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::Hunt,
        Action::Abyss,
        Action::Explore,
        Action::Gather,
        Action::Craft,
        Action::Cook,
        Action::Expedition,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Action::Hunt => "hunt",
            Action::Abyss => "abyss",
            Action::Explore => "explore",
            Action::Gather => "gather",
            Action::Craft => "craft",
            Action::Cook => "cook",
            Action::Expedition => "expedition",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownStatus {
    Ready,
    Waiting { until_ms: i64, remaining_ms: i64 },
}

impl CooldownStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, CooldownStatus::Ready)
    }

    /// `Ok` when ready, otherwise the user-facing cooldown rejection.
    pub fn require_ready(self, action: &str) -> Result<(), GameError> {
        match self {
            CooldownStatus::Ready => Ok(()),
            CooldownStatus::Waiting { until_ms, .. } => Err(GameError::OnCooldown {
                action: action.to_string(),
                wait_until_ms: until_ms,
            }),
        }
    }
}

/// Ready once `now_ms` reaches the stored expiry.
pub fn check_cooldown(cooldowns: &[Cooldown], action: &str, now_ms: i64) -> CooldownStatus {
    match cooldowns.iter().find(|c| c.action == action) {
        Some(c) if now_ms < c.expires_at_ms => CooldownStatus::Waiting {
            until_ms: c.expires_at_ms,
            remaining_ms: c.expires_at_ms - now_ms,
        },
        _ => CooldownStatus::Ready,
    }
}

pub fn set_cooldown(cooldowns: &mut Vec<Cooldown>, action: &str, duration_ms: i64, now_ms: i64) {
    set_cooldown_until(cooldowns, action, now_ms.saturating_add(duration_ms.max(0)));
}

pub fn set_cooldown_until(cooldowns: &mut Vec<Cooldown>, action: &str, expires_at_ms: i64) {
    match cooldowns.iter_mut().find(|c| c.action == action) {
        Some(existing) => existing.expires_at_ms = expires_at_ms,
        None => cooldowns.push(Cooldown {
            action: action.to_string(),
            expires_at_ms,
        }),
    }
}

/// Drop timers that have run out.
pub fn prune_expired(cooldowns: &mut Vec<Cooldown>, now_ms: i64) {
    cooldowns.retain(|c| now_ms < c.expires_at_ms);
}

/// "1h 2m 3s" style, omitting leading zero units. Sub-second waits round up.
pub fn format_wait(remaining_ms: i64) -> String {
    let total = (remaining_ms.max(0) + 999) / 1000;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}h {}m {}s", h, m, s)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}
