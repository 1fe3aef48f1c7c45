/// Top-level policy deciding whether enforcement runs at all. Cheap, so
/// it is re-evaluated on every trigger instead of cached; it only ever
/// suppresses new triggers, a pass already inside its grace delay runs to
/// completion and relies on re-verification.
#[derive(Clone, Copy, Debug)]
pub struct EligibilityGate {
    pub min_players: usize,
    pub enforce_on_seed: bool,
}

pub const SEED_GAMEMODE: &str = "Seed";

impl EligibilityGate {
    pub fn should_enforce(&self, player_count: usize, gamemode: Option<&str>) -> bool {
        if player_count < self.min_players {
            return false;
        }
        self.enforce_on_seed || gamemode != Some(SEED_GAMEMODE)
    }
}
