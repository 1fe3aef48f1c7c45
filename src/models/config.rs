use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::rule::{BlockedRole, RoleScope, RuleSet};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid role regex `{pattern}` for rule `{rule}`: {source}")]
    InvalidRegex {
        rule: String,
        pattern: String,
        source: regex::Error,
    },
    #[error("rule `{rule}` has duplicate server playtime threshold {threshold}")]
    DuplicateTier { rule: String, threshold: f64 },
}

/// One (server threshold, player threshold) pair as configured.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PlaytimeOption {
    pub min_total_server_playtime: f64,
    pub min_player_playtime: f64,
}

/// One blocked infantry role entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockedInfantryOption {
    /// Regex matched against the in-game role name.
    pub role_regex: String,
    /// Human readable name shown to the player.
    pub description: String,
    #[serde(default)]
    pub instant_remove: bool,
    pub playtime_options: Vec<PlaytimeOption>,
}

/// Full option surface of the warden. Every field has a default so a
/// partial JSON config is enough.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub steam_api_key: String,

    pub blocked_infantry: Vec<BlockedInfantryOption>,
    pub blocked_leader_playtime_options: Vec<PlaytimeOption>,
    pub blocked_cmd_playtime_options: Vec<PlaytimeOption>,
    pub is_leader_blocked: bool,
    pub is_cmd_blocked: bool,

    pub whitelisted_players: Vec<String>,

    /// Population floor below which nothing is enforced.
    pub min_players_for_enforcement: usize,
    pub enforce_on_seed: bool,

    pub remove_from_squad: bool,
    /// Grace delay between the warning and the re-verified removal.
    pub grace_delay_secs: u64,

    pub rename_squad: bool,
    pub instant_disband_new_squad: bool,

    pub show_playtime_on_connect: bool,
    pub connect_playtime_delay_secs: u64,
    pub show_blocked_roles_on_connect: bool,
    pub connect_blocked_roles_delay_secs: u64,

    pub unknown_playtime_message_count: u32,
    pub unknown_playtime_message_interval_secs: u64,
    pub ban_message_count: u32,
    pub ban_message_interval_secs: u64,
    pub info_message_interval_secs: u64,

    pub leader_check_interval_secs: u64,

    /// Where the last computed aggregate playtime is persisted.
    pub state_path: PathBuf,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            steam_api_key: String::new(),
            blocked_infantry: Vec::new(),
            blocked_leader_playtime_options: Vec::new(),
            blocked_cmd_playtime_options: Vec::new(),
            is_leader_blocked: false,
            is_cmd_blocked: false,
            whitelisted_players: Vec::new(),
            min_players_for_enforcement: 60,
            enforce_on_seed: false,
            remove_from_squad: true,
            grace_delay_secs: 10,
            rename_squad: true,
            instant_disband_new_squad: true,
            show_playtime_on_connect: true,
            connect_playtime_delay_secs: 10,
            show_blocked_roles_on_connect: true,
            connect_blocked_roles_delay_secs: 20,
            unknown_playtime_message_count: 2,
            unknown_playtime_message_interval_secs: 5,
            ban_message_count: 3,
            ban_message_interval_secs: 2,
            info_message_interval_secs: 5,
            leader_check_interval_secs: 20,
            state_path: PathBuf::from("playtime-warden-state.json"),
        }
    }
}

impl WardenConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        // Fail fast on bad rules rather than at first enforcement.
        config.build_rules()?;
        Ok(config)
    }

    /// Reads `STEAM_API_KEY` from the environment (after loading a .env
    /// file if one is present) when the config leaves the key empty.
    pub fn steam_api_key_or_env(&self) -> String {
        if !self.steam_api_key.is_empty() {
            return self.steam_api_key.clone();
        }
        dotenvy::dotenv().ok();
        std::env::var("STEAM_API_KEY").unwrap_or_default()
    }

    /// Builds the rule set. Duplicate server thresholds inside one rule
    /// would make tier precedence depend on sort stability, so they are
    /// rejected here instead of being silently resolved.
    pub fn build_rules(&self) -> Result<RuleSet, ConfigError> {
        let mut infantry = Vec::with_capacity(self.blocked_infantry.len());
        for entry in &self.blocked_infantry {
            let pattern =
                Regex::new(&entry.role_regex).map_err(|source| ConfigError::InvalidRegex {
                    rule: entry.description.clone(),
                    pattern: entry.role_regex.clone(),
                    source,
                })?;
            let mut rule =
                BlockedRole::new(entry.description.clone(), RoleScope::Infantry { pattern });
            rule.instant_remove = entry.instant_remove;
            add_options(&mut rule, &entry.playtime_options)?;
            infantry.push(rule);
        }

        let mut leader = BlockedRole::new("Squad leader", RoleScope::SquadLeader);
        if self.is_leader_blocked {
            add_options(&mut leader, &self.blocked_leader_playtime_options)?;
        }

        let mut commander = BlockedRole::new("Commander", RoleScope::Commander);
        if self.is_cmd_blocked {
            add_options(&mut commander, &self.blocked_cmd_playtime_options)?;
        }

        Ok(RuleSet {
            infantry,
            leader,
            commander,
        })
    }
}

fn add_options(rule: &mut BlockedRole, options: &[PlaytimeOption]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for option in options {
        if !seen.insert(option.min_total_server_playtime.to_bits()) {
            return Err(ConfigError::DuplicateTier {
                rule: rule.description.clone(),
                threshold: option.min_total_server_playtime,
            });
        }
        rule.add_tier(option.min_total_server_playtime, option.min_player_playtime);
    }
    Ok(())
}
