use serde::{Deserialize, Serialize};

use super::player::Playtime;

/// One step of a tiered restriction: once the server-wide aggregate
/// playtime reaches `min_total_server_playtime`, a player needs more than
/// `min_player_playtime` hours to pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub min_total_server_playtime: f64,
    pub min_player_playtime: f64,
}

/// The tier collection owned by one rule, plus whichever tier is active
/// for the last committed aggregate value.
#[derive(Clone, Debug, Default)]
pub struct TierTable {
    tiers: Vec<Tier>,
    active: Option<Tier>,
}

impl TierTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a tier as-is. Ordering and duplicate handling are the
    /// caller's business; `select_active` sorts on every resolution.
    pub fn add_tier(&mut self, min_total_server_playtime: f64, min_player_playtime: f64) {
        self.tiers.push(Tier {
            min_total_server_playtime,
            min_player_playtime,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Re-resolves the active tier: the tier with the largest server
    /// threshold that the current aggregate has reached, or `None` when
    /// the aggregate is below every threshold (unrestricted).
    pub fn select_active(&mut self, current_total_server_playtime: f64) {
        let mut sorted = self.tiers.clone();
        sorted.sort_by(|a, b| {
            b.min_total_server_playtime
                .partial_cmp(&a.min_total_server_playtime)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        self.active = sorted
            .into_iter()
            .find(|tier| tier.min_total_server_playtime <= current_total_server_playtime);
    }

    pub fn active(&self) -> Option<Tier> {
        self.active
    }

    /// True when no tier is active or the playtime strictly exceeds the
    /// active tier's player threshold. Unknown playtime fails whenever a
    /// tier is active.
    pub fn is_playtime_compliant(&self, playtime: Playtime) -> bool {
        match self.active {
            None => true,
            Some(tier) => playtime.satisfies(tier.min_player_playtime),
        }
    }
}
