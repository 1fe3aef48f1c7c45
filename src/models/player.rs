use std::fmt;

use serde::{Deserialize, Serialize};

/// A player's personal playtime in hours, or the reserved "we could not
/// find out" value. `Unknown` is distinct from zero hours and can never
/// satisfy a threshold comparison.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Playtime {
    Hours(f64),
    Unknown,
}

impl Playtime {
    /// Strictly-greater comparison; equality does not satisfy.
    pub fn satisfies(&self, threshold_hours: f64) -> bool {
        match self {
            Playtime::Hours(hours) => *hours > threshold_hours,
            Playtime::Unknown => false,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Playtime::Unknown)
    }

    /// Contribution to the server-wide aggregate. Unknown counts as zero.
    pub fn hours_or_zero(&self) -> f64 {
        match self {
            Playtime::Hours(hours) => *hours,
            Playtime::Unknown => 0.0,
        }
    }
}

impl fmt::Display for Playtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Playtime::Hours(hours) => write!(f, "{:.0}", hours),
            Playtime::Unknown => write!(f, "unknown"),
        }
    }
}

/// A point-in-time view of a connected player, as delivered by the game
/// server. Events carry one of these; enforcement always re-fetches a
/// fresh snapshot before acting on it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub steam_id: String,
    /// Per-session id used by admin commands (kick from squad).
    pub player_id: String,
    /// Id used by the commander demotion command.
    pub eos_id: String,
    pub name: String,
    pub role: String,
    pub is_leader: bool,
    pub team_id: Option<String>,
    pub squad_id: Option<String>,
    pub squad_name: Option<String>,
}

impl PlayerSnapshot {
    /// Leader of the command squad, i.e. the team's commander.
    pub fn is_commander(&self) -> bool {
        self.is_leader && self.squad_name.as_deref() == Some("Command Squad")
    }
}

/// Payload of a squad-created event.
#[derive(Clone, Debug)]
pub struct SquadCreated {
    pub creator: PlayerSnapshot,
    pub team_id: String,
    pub squad_id: String,
    pub squad_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_never_satisfies() {
        assert!(!Playtime::Unknown.satisfies(0.0));
        assert!(!Playtime::Unknown.satisfies(1500.0));
        assert_eq!(Playtime::Unknown.hours_or_zero(), 0.0);
    }

    #[test]
    fn boundary_is_strict() {
        assert!(!Playtime::Hours(1500.0).satisfies(1500.0));
        assert!(Playtime::Hours(1501.0).satisfies(1500.0));
    }

    #[test]
    fn commander_needs_command_squad() {
        let mut player = PlayerSnapshot {
            steam_id: "76561198000000001".to_string(),
            player_id: "12".to_string(),
            eos_id: "eos-1".to_string(),
            name: "Player1".to_string(),
            role: "USA_Rifleman_01".to_string(),
            is_leader: true,
            team_id: Some("1".to_string()),
            squad_id: Some("1".to_string()),
            squad_name: Some("Command Squad".to_string()),
        };
        assert!(player.is_commander());

        player.squad_name = Some("ARMOR".to_string());
        assert!(!player.is_commander());

        player.squad_name = Some("Command Squad".to_string());
        player.is_leader = false;
        assert!(!player.is_commander());
    }
}
