use regex::Regex;

use super::player::{PlayerSnapshot, Playtime};
use super::tier::{Tier, TierTable};

/// Which assignments a blocked-role rule applies to.
#[derive(Clone, Debug)]
pub enum RoleScope {
    /// Matches infantry kit roles by name.
    Infantry { pattern: Regex },
    /// Any squad leader.
    SquadLeader,
    /// Leader of the command squad.
    Commander,
}

/// One named restriction: a tier table plus the predicate deciding which
/// players it applies to.
#[derive(Clone, Debug)]
pub struct BlockedRole {
    pub description: String,
    /// Skip the grace delay for this rule (infantry rules only).
    pub instant_remove: bool,
    pub scope: RoleScope,
    table: TierTable,
}

impl BlockedRole {
    pub fn new(description: impl Into<String>, scope: RoleScope) -> Self {
        Self {
            description: description.into(),
            instant_remove: false,
            scope,
            table: TierTable::new(),
        }
    }

    pub fn add_tier(&mut self, min_total_server_playtime: f64, min_player_playtime: f64) {
        self.table
            .add_tier(min_total_server_playtime, min_player_playtime);
    }

    pub fn select_tier(&mut self, current_total_server_playtime: f64) {
        self.table.select_active(current_total_server_playtime);
    }

    pub fn active_tier(&self) -> Option<Tier> {
        self.table.active()
    }

    pub fn tiers(&self) -> &[Tier] {
        self.table.tiers()
    }

    /// Whether this rule restricts the given player at all.
    pub fn applies_to(&self, player: &PlayerSnapshot) -> bool {
        match &self.scope {
            RoleScope::Infantry { pattern } => pattern.is_match(&player.role),
            RoleScope::SquadLeader => player.is_leader,
            RoleScope::Commander => player.is_commander(),
        }
    }

    pub fn infantry_pattern(&self) -> Option<&Regex> {
        match &self.scope {
            RoleScope::Infantry { pattern } => Some(pattern),
            RoleScope::SquadLeader | RoleScope::Commander => None,
        }
    }

    /// Role-name check for the infantry scope; leadership scopes have no
    /// role name to match.
    pub fn role_matches(&self, role_name: &str) -> bool {
        match &self.scope {
            RoleScope::Infantry { pattern } => pattern.is_match(role_name),
            RoleScope::SquadLeader | RoleScope::Commander => false,
        }
    }

    pub fn is_playtime_compliant(&self, playtime: Playtime) -> bool {
        self.table.is_playtime_compliant(playtime)
    }

    /// A player is compliant unless the rule applies to them and their
    /// playtime fails the active tier.
    pub fn is_player_compliant(&self, player: &PlayerSnapshot, playtime: Playtime) -> bool {
        !self.applies_to(player) || self.is_playtime_compliant(playtime)
    }
}

/// All configured rules; the active tier of each is re-resolved whenever
/// the server aggregate changes.
#[derive(Clone, Debug)]
pub struct RuleSet {
    pub infantry: Vec<BlockedRole>,
    pub leader: BlockedRole,
    pub commander: BlockedRole,
}

impl RuleSet {
    pub fn select_tiers(&mut self, current_total_server_playtime: f64) {
        for rule in &mut self.infantry {
            rule.select_tier(current_total_server_playtime);
        }
        self.leader.select_tier(current_total_server_playtime);
        self.commander.select_tier(current_total_server_playtime);
    }

    /// First infantry rule the player is currently violating.
    pub fn violated_infantry_rule(
        &self,
        player: &PlayerSnapshot,
        playtime: Playtime,
    ) -> Option<&BlockedRole> {
        self.infantry
            .iter()
            .find(|rule| !rule.is_player_compliant(player, playtime))
    }

    /// Every rule whose active tier the given playtime fails, regardless
    /// of the player's current assignment. Used by the "show my blocked
    /// roles" query.
    pub fn blocked_for_playtime(&self, playtime: Playtime) -> Vec<&BlockedRole> {
        let mut blocked = Vec::new();
        if !self.commander.is_playtime_compliant(playtime) {
            blocked.push(&self.commander);
        }
        if !self.leader.is_playtime_compliant(playtime) {
            blocked.push(&self.leader);
        }
        blocked.extend(
            self.infantry
                .iter()
                .filter(|rule| !rule.is_playtime_compliant(playtime)),
        );
        blocked
    }

    /// Every rule with an active tier right now, for the "show all
    /// current blocks" query.
    pub fn currently_restricted(&self) -> Vec<&BlockedRole> {
        let mut restricted = Vec::new();
        if self.commander.active_tier().is_some() {
            restricted.push(&self.commander);
        }
        if self.leader.active_tier().is_some() {
            restricted.push(&self.leader);
        }
        restricted.extend(self.infantry.iter().filter(|rule| rule.active_tier().is_some()));
        restricted
    }
}
