use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use playtime_warden::models::config::{BlockedInfantryOption, PlaytimeOption, WardenConfig};
use playtime_warden::models::player::{PlayerSnapshot, Playtime};
use playtime_warden::services::console::{AdminConsole, ConsoleError};
use playtime_warden::services::playtime::{PlaytimeLookup, PlaytimeSource};
use playtime_warden::services::server::GameServer;

pub fn player(steam_id: &str, role: &str) -> PlayerSnapshot {
    PlayerSnapshot {
        steam_id: steam_id.to_string(),
        player_id: format!("pid-{}", steam_id),
        eos_id: format!("eos-{}", steam_id),
        name: format!("name-{}", steam_id),
        role: role.to_string(),
        is_leader: false,
        team_id: Some("1".to_string()),
        squad_id: Some("1".to_string()),
        squad_name: Some("Squad 1".to_string()),
    }
}

pub fn leader(steam_id: &str, squad_name: &str) -> PlayerSnapshot {
    let mut p = player(steam_id, "USA_SL_01");
    p.is_leader = true;
    p.squad_name = Some(squad_name.to_string());
    p
}

/// Test config with a two-tier pilot rule, zero message intervals and a
/// low population floor.
pub fn test_config(state_dir: &Path) -> WardenConfig {
    WardenConfig {
        blocked_infantry: vec![BlockedInfantryOption {
            role_regex: ".*Pilot.*".to_string(),
            description: "Helicopter pilot".to_string(),
            instant_remove: false,
            playtime_options: vec![
                PlaytimeOption {
                    min_total_server_playtime: 80_000.0,
                    min_player_playtime: 1_500.0,
                },
                PlaytimeOption {
                    min_total_server_playtime: 100_000.0,
                    min_player_playtime: 2_000.0,
                },
            ],
        }],
        is_leader_blocked: true,
        blocked_leader_playtime_options: vec![PlaytimeOption {
            min_total_server_playtime: 0.0,
            min_player_playtime: 100.0,
        }],
        is_cmd_blocked: true,
        blocked_cmd_playtime_options: vec![PlaytimeOption {
            min_total_server_playtime: 0.0,
            min_player_playtime: 500.0,
        }],
        min_players_for_enforcement: 2,
        grace_delay_secs: 0,
        ban_message_count: 1,
        ban_message_interval_secs: 0,
        unknown_playtime_message_count: 2,
        unknown_playtime_message_interval_secs: 0,
        info_message_interval_secs: 0,
        show_playtime_on_connect: false,
        show_blocked_roles_on_connect: false,
        state_path: state_dir.join("state.json"),
        ..WardenConfig::default()
    }
}

/// Seeds the persisted aggregate so the warden starts with a chosen
/// total server playtime.
pub fn seed_aggregate(state_dir: &Path, total: f64) {
    std::fs::write(
        state_dir.join("state.json"),
        format!("{{ \"last_total_server_playtime\": {} }}", total),
    )
    .unwrap();
}

pub struct FakeServer {
    roster: Mutex<Vec<PlayerSnapshot>>,
    count_override: Mutex<Option<usize>>,
    gamemode: Mutex<Option<String>>,
}

impl FakeServer {
    pub fn new(roster: Vec<PlayerSnapshot>) -> Arc<Self> {
        Arc::new(Self {
            roster: Mutex::new(roster),
            count_override: Mutex::new(None),
            gamemode: Mutex::new(Some("RAAS".to_string())),
        })
    }

    /// Pretend more (or fewer) players are connected than the roster
    /// holds snapshots for.
    pub fn set_player_count(&self, count: usize) {
        *self.count_override.lock().unwrap() = Some(count);
    }

    pub fn set_gamemode(&self, gamemode: &str) {
        *self.gamemode.lock().unwrap() = Some(gamemode.to_string());
    }

}

#[async_trait]
impl GameServer for FakeServer {
    async fn players(&self) -> Vec<PlayerSnapshot> {
        self.roster.lock().unwrap().clone()
    }

    async fn player_by_steam_id(&self, steam_id: &str) -> Option<PlayerSnapshot> {
        self.roster
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.steam_id == steam_id)
            .cloned()
    }

    async fn player_count(&self) -> usize {
        let overridden = *self.count_override.lock().unwrap();
        overridden.unwrap_or_else(|| self.roster.lock().unwrap().len())
    }

    async fn current_gamemode(&self) -> Option<String> {
        self.gamemode.lock().unwrap().clone()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Warn { steam_id: String, message: String },
    RemoveFromSquad { player_id: String },
    DemoteCommander { eos_id: String },
    RenameSquad { team_id: String, squad_id: String },
    DisbandSquad { team_id: String, squad_id: String },
}

#[derive(Default)]
pub struct RecordingConsole {
    actions: Mutex<Vec<Action>>,
}

impl RecordingConsole {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    pub fn removals(&self) -> usize {
        self.actions()
            .iter()
            .filter(|a| matches!(a, Action::RemoveFromSquad { .. }))
            .count()
    }

    pub fn warned(&self, steam_id: &str, needle: &str) -> bool {
        self.actions().iter().any(|a| match a {
            Action::Warn {
                steam_id: id,
                message,
            } => id == steam_id && message.contains(needle),
            _ => false,
        })
    }

    fn record(&self, action: Action) {
        self.actions.lock().unwrap().push(action);
    }
}

#[async_trait]
impl AdminConsole for RecordingConsole {
    async fn warn(&self, steam_id: &str, message: &str) -> Result<(), ConsoleError> {
        self.record(Action::Warn {
            steam_id: steam_id.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    async fn remove_from_squad(&self, player_id: &str) -> Result<(), ConsoleError> {
        self.record(Action::RemoveFromSquad {
            player_id: player_id.to_string(),
        });
        Ok(())
    }

    async fn demote_commander(&self, eos_id: &str) -> Result<(), ConsoleError> {
        self.record(Action::DemoteCommander {
            eos_id: eos_id.to_string(),
        });
        Ok(())
    }

    async fn rename_squad(&self, team_id: &str, squad_id: &str) -> Result<(), ConsoleError> {
        self.record(Action::RenameSquad {
            team_id: team_id.to_string(),
            squad_id: squad_id.to_string(),
        });
        Ok(())
    }

    async fn disband_squad(&self, team_id: &str, squad_id: &str) -> Result<(), ConsoleError> {
        self.record(Action::DisbandSquad {
            team_id: team_id.to_string(),
            squad_id: squad_id.to_string(),
        });
        Ok(())
    }
}

pub struct TablePlaytimes(HashMap<String, Playtime>);

impl TablePlaytimes {
    pub fn new(entries: &[(&str, Playtime)]) -> Arc<Self> {
        Arc::new(Self(
            entries
                .iter()
                .map(|(id, playtime)| (id.to_string(), *playtime))
                .collect(),
        ))
    }
}

#[async_trait]
impl PlaytimeSource for TablePlaytimes {
    async fn playtime(&self, steam_id: &str, _force_refresh: bool) -> PlaytimeLookup {
        PlaytimeLookup {
            playtime: *self.0.get(steam_id).unwrap_or(&Playtime::Unknown),
            errors: Vec::new(),
        }
    }
}
