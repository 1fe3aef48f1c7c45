//! Player-facing message text. Every function is a pure renderer so the
//! enforcement code depends only on these signatures, not on any
//! formatting mechanism.

pub fn your_playtime(hours: f64) -> String {
    format!("Your playtime is {:.0} hours", hours)
}

pub fn unknown_playtime() -> String {
    "Your playtime is unknown! Open your Steam profile so that we can allow you to play roles."
        .to_string()
}

pub fn role_blocked(description: &str, min_player_playtime: f64) -> String {
    format!(
        "Role ({}) is blocked until {:.0} playtime, TAKE ANOTHER ONE.",
        description, min_player_playtime
    )
}

pub fn role_blocked_countdown(description: &str, min_player_playtime: f64, secs: u64) -> String {
    format!(
        "Role ({}) is blocked until {:.0} playtime, TAKE ANOTHER ONE. {} seconds.",
        description, min_player_playtime, secs
    )
}

pub fn role_removed(description: &str, min_player_playtime: f64) -> String {
    format!(
        "This role ({}) is blocked until {:.0} hours of playtime!",
        description, min_player_playtime
    )
}

pub fn leader_blocked(min_player_playtime: f64) -> String {
    format!(
        "You are banned from being a squad leader until {:.0} playtime, DISBAND the squad or TRANSFER the role!",
        min_player_playtime
    )
}

pub fn leader_blocked_countdown(min_player_playtime: f64, secs: u64) -> String {
    format!(
        "You are banned from being a squad leader until {:.0} playtime, DISBAND the squad or TRANSFER the role! {} seconds.",
        min_player_playtime, secs
    )
}

pub fn leader_removed(min_player_playtime: f64) -> String {
    format!(
        "It is forbidden to be a squad leader until {:.0} hours of playtime!",
        min_player_playtime
    )
}

pub fn leader_banned(min_player_playtime: f64) -> String {
    format!(
        "You are banned from being a squad leader until {:.0} playtime",
        min_player_playtime
    )
}

pub fn commander_banned(min_player_playtime: f64) -> String {
    format!(
        "You are banned from being a CMD until {:.0} playtime",
        min_player_playtime
    )
}

/// Neutral acknowledgement when a re-check finds the violation cured.
pub fn thanks() -> String {
    "Thanks!".to_string()
}

pub fn all_roles_open() -> String {
    "All roles are open for you".to_string()
}

pub fn blocked_role_info(description: &str, min_player_playtime: f64) -> String {
    format!(
        "Role blocked: {} up to {:.0} hours",
        description, min_player_playtime
    )
}

pub fn total_playtime_info(total_hours: f64) -> String {
    format!(
        "Last saved total server playtime: {:.0} hours",
        total_hours
    )
}
