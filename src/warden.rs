use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::models::config::{ConfigError, WardenConfig};
use crate::models::player::{PlayerSnapshot, Playtime, SquadCreated};
use crate::services::aggregate::{AggregateTracker, StateError};
use crate::services::console::AdminConsole;
use crate::services::gate::EligibilityGate;
use crate::services::messages;
use crate::services::playtime::PlaytimeSource;
use crate::services::server::GameServer;
use crate::state::WardenState;

/// How long an enforcement key lingers after a pass finishes, to absorb
/// a duplicate trigger for the same transition.
const LOCK_LINGER: Duration = Duration::from_secs(1);

/// Became-leader and squad-created arrive together for a new squad; the
/// became-leader path yields this long so the squad-created path claims
/// the squad lock first.
const BECAME_LEADER_SETTLE: Duration = Duration::from_millis(300);

/// Pause between the blocked-roles list and the playtime line of the
/// "show my blocked roles" reply.
const BLOCKED_ROLES_EPILOGUE_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum WardenError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    State(#[from] StateError),
}

/// Orchestrates the whole enforcement flow: event handlers gate and
/// de-duplicate triggers, rule evaluation decides compliance, and the
/// warn → grace → re-verify → remove workflow carries out the action.
///
/// Cloning is cheap and shares all state, so handlers can run on
/// separate tasks against the same instance.
#[derive(Clone)]
pub struct Warden {
    pub config: Arc<WardenConfig>,
    pub state: WardenState,
    pub gate: EligibilityGate,
    server: Arc<dyn GameServer>,
    console: Arc<dyn AdminConsole>,
    playtime: Arc<dyn PlaytimeSource>,
}

/// Everything the delayed half of a workflow needs, captured before the
/// grace suspension so no rule lock is held across an await.
struct ViolationTicket {
    description: String,
    min_player_playtime: f64,
    instant_remove: bool,
    pattern: Regex,
}

impl Warden {
    pub fn new(
        config: WardenConfig,
        server: Arc<dyn GameServer>,
        console: Arc<dyn AdminConsole>,
        playtime: Arc<dyn PlaytimeSource>,
    ) -> Result<Self, WardenError> {
        let mut rules = config.build_rules()?;
        let aggregate = AggregateTracker::load_or_init(&config.state_path)?;
        rules.select_tiers(aggregate.current());

        tracing::info!(
            total_server_playtime = aggregate.current(),
            "playtime warden initialized"
        );

        let gate = EligibilityGate {
            min_players: config.min_players_for_enforcement,
            enforce_on_seed: config.enforce_on_seed,
        };

        Ok(Self {
            config: Arc::new(config),
            state: WardenState::new(rules, aggregate),
            gate,
            server,
            console,
            playtime,
        })
    }

    // ---- event entry points -------------------------------------------

    pub async fn on_role_changed(&self, player: &PlayerSnapshot) {
        self.handle_role_trigger(player).await;
    }

    /// Possession changes fire for the same transitions as role changes;
    /// the shared lock key keeps the pair from double-processing.
    pub async fn on_possessed(&self, player: &PlayerSnapshot) {
        self.handle_role_trigger(player).await;
    }

    async fn handle_role_trigger(&self, player: &PlayerSnapshot) {
        if !self.should_enforce().await {
            return;
        }

        let key = format!("{}{}", player.steam_id, player.role);
        if !self.state.role_locks.try_acquire(&key) {
            return;
        }

        self.verify_player_role(player).await;
        self.state.role_locks.release_after(&key, LOCK_LINGER).await;
    }

    pub async fn on_became_leader(&self, player: &PlayerSnapshot) {
        if !self.should_enforce().await || !self.config.is_leader_blocked {
            return;
        }

        // Let a concurrent squad-created pass claim its lock first.
        sleep(BECAME_LEADER_SETTLE).await;

        let live = match self.server.player_by_steam_id(&player.steam_id).await {
            Some(live) => live,
            None => return,
        };
        if !live.is_leader {
            return;
        }

        let squad_key = squad_lock_key(
            live.squad_id.as_deref().unwrap_or(""),
            live.team_id.as_deref().unwrap_or(""),
        );
        if self.state.squad_locks.is_held(&squad_key) {
            return;
        }
        if !self.state.leader_locks.try_acquire(&live.steam_id) {
            return;
        }

        self.verify_squad_leader(&live).await;
        self.state
            .leader_locks
            .release_after(&live.steam_id, LOCK_LINGER)
            .await;
    }

    pub async fn on_squad_created(&self, event: &SquadCreated) {
        tracing::debug!(
            steam_id = %event.creator.steam_id,
            squad_id = %event.squad_id,
            team_id = %event.team_id,
            squad_name = %event.squad_name,
            "squad created"
        );

        if !self.should_enforce().await
            || !self.config.is_leader_blocked
            || !self.config.instant_disband_new_squad
        {
            return;
        }

        let key = squad_lock_key(&event.squad_id, &event.team_id);
        self.state.squad_locks.try_acquire(&key);
        self.verify_created_squad(event).await;
        self.state.squad_locks.release(&key);
    }

    /// Prefetches the connecting player's playtime and, after the
    /// configured delays, shows them their hours and their currently
    /// blocked roles.
    pub async fn on_player_connected(&self, steam_id: &str) {
        let lookup = self.playtime.playtime(steam_id, true).await;
        if !lookup.errors.is_empty() {
            tracing::info!(steam_id, errors = %lookup.errors.join(", "), "playtime prefetch");
        }

        let mut elapsed = 0;
        if self.config.show_playtime_on_connect {
            sleep(Duration::from_secs(self.config.connect_playtime_delay_secs)).await;
            elapsed = self.config.connect_playtime_delay_secs;
            self.show_user_playtime(steam_id).await;
        }

        if self.config.show_blocked_roles_on_connect && self.should_enforce().await {
            let remaining = self
                .config
                .connect_blocked_roles_delay_secs
                .saturating_sub(elapsed);
            sleep(Duration::from_secs(remaining)).await;
            self.show_user_blocked_roles(steam_id).await;
        }
    }

    /// Recomputes the server-wide aggregate from the full roster and
    /// re-resolves every rule's active tier against it.
    pub async fn on_round_ended(&self) {
        let players = self.server.players().await;

        let total = match self
            .state
            .aggregate
            .recompute(&players, &*self.playtime)
            .await
        {
            Ok(total) => total,
            Err(e) => {
                // The in-memory value is still usable; only persistence
                // failed.
                tracing::error!(error = %e, "failed to persist aggregate playtime");
                self.state.aggregate.current()
            }
        };

        let mut rules = self.state.rules.lock().await;
        rules.select_tiers(total);
        tracing::debug!(total_server_playtime = total, "aggregate recomputed");
    }

    // ---- periodic sweeps ----------------------------------------------

    /// Checks every current squad leader, sweep-style; squads being
    /// handled by the new-squad path are skipped.
    pub async fn leader_sweep(&self) {
        if !self.should_enforce().await || !self.config.is_leader_blocked {
            return;
        }

        for player in self.server.players().await {
            if !player.is_leader {
                continue;
            }

            let squad_key = squad_lock_key(
                player.squad_id.as_deref().unwrap_or(""),
                player.team_id.as_deref().unwrap_or(""),
            );
            if self.state.squad_locks.is_held(&squad_key) {
                continue;
            }
            if !self.state.leader_locks.try_acquire(&player.steam_id) {
                continue;
            }

            self.verify_squad_leader(&player).await;
            self.state
                .leader_locks
                .release_after(&player.steam_id, LOCK_LINGER)
                .await;
        }
    }

    /// Checks the commander of each team. Unlike the other paths this
    /// one acts immediately, with no grace delay.
    pub async fn commander_sweep(&self) {
        if !self.should_enforce().await || !self.config.is_cmd_blocked {
            return;
        }

        for player in self.server.players().await {
            if player.is_commander() {
                self.verify_commander(&player).await;
            }
        }
    }

    /// Runs both sweeps on the configured interval until aborted.
    pub fn spawn_periodic_checks(&self) -> JoinHandle<()> {
        let warden = self.clone();
        tokio::spawn(async move {
            let period = Duration::from_secs(warden.config.leader_check_interval_secs.max(1));
            let mut ticker = tokio::time::interval(period);
            // The first tick fires immediately; skip it so sweeps start
            // one full period after startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                warden.leader_sweep().await;
                warden.commander_sweep().await;
            }
        })
    }

    // ---- chat commands --------------------------------------------------

    /// "refresh my playtime": force-refreshes the cache and reports back.
    pub async fn refresh_playtime_command(&self, steam_id: &str) {
        self.get_playtime(steam_id, true).await;
        self.show_user_playtime(steam_id).await;
    }

    /// "show my blocked roles".
    pub async fn blocked_roles_command(&self, steam_id: &str) {
        self.get_playtime(steam_id, true).await;
        self.show_user_blocked_roles(steam_id).await;
    }

    /// "show all currently blocked roles".
    pub async fn all_blocked_roles_command(&self, steam_id: &str) {
        self.show_all_current_blocked_roles(steam_id).await;
    }

    // ---- verification workflows -----------------------------------------

    /// Role workflow: evaluate, warn, wait out the grace delay, then
    /// re-check the live role before removing.
    async fn verify_player_role(&self, player: &PlayerSnapshot) {
        if self.is_whitelisted(&player.steam_id) {
            return;
        }

        let playtime = self.get_playtime(&player.steam_id, false).await;

        let ticket = {
            let rules = self.state.rules.lock().await;
            rules
                .violated_infantry_rule(player, playtime)
                .and_then(|rule| {
                    Some(ViolationTicket {
                        description: rule.description.clone(),
                        min_player_playtime: rule
                            .active_tier()
                            .map(|tier| tier.min_player_playtime)
                            .unwrap_or(0.0),
                        instant_remove: rule.instant_remove,
                        pattern: rule.infantry_pattern()?.clone(),
                    })
                })
        };

        let ticket = match ticket {
            Some(ticket) => ticket,
            None => {
                tracing::info!(
                    steam_id = %player.steam_id,
                    playtime = %playtime,
                    role = %player.role,
                    "role is allowed"
                );
                return;
            }
        };

        tracing::info!(
            steam_id = %player.steam_id,
            playtime = %playtime,
            role = %player.role,
            rule = %ticket.description,
            "blocked role detected, starting removal workflow"
        );

        if !self.config.remove_from_squad {
            self.warn_repeated(
                &player.steam_id,
                &messages::role_blocked(&ticket.description, ticket.min_player_playtime),
                self.config.ban_message_count,
                self.config.ban_message_interval_secs,
            )
            .await;
            return;
        }

        if ticket.instant_remove {
            self.remove_for_role(&ticket, &player.steam_id).await;
        } else {
            self.warn_repeated(
                &player.steam_id,
                &messages::role_blocked_countdown(
                    &ticket.description,
                    ticket.min_player_playtime,
                    self.config.grace_delay_secs,
                ),
                self.config.ban_message_count,
                self.config.ban_message_interval_secs,
            )
            .await;

            sleep(Duration::from_secs(self.config.grace_delay_secs)).await;
            self.remove_for_role(&ticket, &player.steam_id).await;
        }

        if playtime.is_unknown() {
            self.warn_unknown_playtime(&player.steam_id).await;
        }
    }

    /// Re-verified removal: the player may have changed role, left the
    /// squad or disconnected during the grace delay.
    async fn remove_for_role(&self, ticket: &ViolationTicket, steam_id: &str) {
        let live = match self.server.player_by_steam_id(steam_id).await {
            Some(live) => live,
            None => return,
        };

        if ticket.pattern.is_match(&live.role) {
            self.execute_console(
                self.console.remove_from_squad(&live.player_id).await,
                "remove from squad",
            );
            self.warn(
                steam_id,
                &messages::role_removed(&ticket.description, ticket.min_player_playtime),
            )
            .await;
            tracing::info!(
                steam_id,
                rule = %ticket.description,
                "player removed from squad for blocked role"
            );
        } else {
            // Cured during the grace delay.
            self.warn(steam_id, &messages::thanks()).await;
        }
    }

    /// Squad-leader workflow: warn, optionally rename the squad, wait,
    /// re-check leadership, then remove from the squad.
    async fn verify_squad_leader(&self, player: &PlayerSnapshot) {
        if self.is_whitelisted(&player.steam_id) {
            return;
        }

        let playtime = self.get_playtime(&player.steam_id, false).await;

        let threshold = {
            let rules = self.state.rules.lock().await;
            if rules.leader.is_player_compliant(player, playtime) {
                None
            } else {
                rules
                    .leader
                    .active_tier()
                    .map(|tier| tier.min_player_playtime)
            }
        };

        let threshold = match threshold {
            Some(threshold) => threshold,
            None => {
                tracing::info!(
                    steam_id = %player.steam_id,
                    playtime = %playtime,
                    "squad leader is allowed"
                );
                return;
            }
        };

        tracing::info!(
            steam_id = %player.steam_id,
            playtime = %playtime,
            "underplayed squad leader detected, starting removal workflow"
        );

        if self.config.rename_squad {
            self.rename_custom_squad(&player.steam_id).await;
        }

        if playtime.is_unknown() {
            self.warn_unknown_playtime(&player.steam_id).await;
        }

        if !self.config.remove_from_squad {
            self.warn_repeated(
                &player.steam_id,
                &messages::leader_blocked(threshold),
                self.config.ban_message_count,
                self.config.ban_message_interval_secs,
            )
            .await;
            return;
        }

        self.warn_repeated(
            &player.steam_id,
            &messages::leader_blocked_countdown(threshold, self.config.grace_delay_secs),
            self.config.ban_message_count,
            self.config.ban_message_interval_secs,
        )
        .await;

        sleep(Duration::from_secs(self.config.grace_delay_secs)).await;
        self.remove_for_leader(&player.steam_id, threshold).await;
    }

    /// Default squad names start with "Squad"; anything else was typed
    /// by the violating leader and gets reset.
    async fn rename_custom_squad(&self, steam_id: &str) {
        let live = match self.server.player_by_steam_id(steam_id).await {
            Some(live) => live,
            None => return,
        };

        let has_custom_name = live
            .squad_name
            .as_deref()
            .map(|name| !name.starts_with("Squad"))
            .unwrap_or(false);

        if live.is_leader && has_custom_name {
            if let (Some(team_id), Some(squad_id)) = (&live.team_id, &live.squad_id) {
                self.execute_console(
                    self.console.rename_squad(team_id, squad_id).await,
                    "rename squad",
                );
                tracing::info!(
                    steam_id,
                    squad_name = %live.squad_name.as_deref().unwrap_or(""),
                    "squad renamed"
                );
            }
        }
    }

    async fn remove_for_leader(&self, steam_id: &str, threshold: f64) {
        let live = match self.server.player_by_steam_id(steam_id).await {
            Some(live) => live,
            None => return,
        };

        if live.is_leader {
            self.warn(steam_id, &messages::leader_removed(threshold)).await;
            self.execute_console(
                self.console.remove_from_squad(&live.player_id).await,
                "remove from squad",
            );
            tracing::info!(steam_id, "player removed from squad for leading underplayed");
        } else {
            // Leadership was transferred or the squad disbanded.
            self.warn(steam_id, &messages::thanks()).await;
        }
    }

    /// A brand-new squad has no members to inherit leadership, so an
    /// ineligible creator means the squad is disbanded outright, with no
    /// grace delay.
    async fn verify_created_squad(&self, event: &SquadCreated) {
        let creator = &event.creator;
        if self.is_whitelisted(&creator.steam_id) {
            return;
        }

        let playtime = self.get_playtime(&creator.steam_id, false).await;

        let threshold = {
            let rules = self.state.rules.lock().await;
            if rules.leader.is_playtime_compliant(playtime) {
                None
            } else {
                rules
                    .leader
                    .active_tier()
                    .map(|tier| tier.min_player_playtime)
            }
        };

        // Leadership itself does not matter here: if the creator is still
        // in the squad they made, the squad goes.
        let still_in_squad = match self.server.player_by_steam_id(&creator.steam_id).await {
            Some(live) => {
                live.squad_id.as_deref() == Some(event.squad_id.as_str())
                    && live.team_id.as_deref() == Some(event.team_id.as_str())
            }
            None => false,
        };

        let threshold = match (threshold, still_in_squad) {
            (Some(threshold), true) => threshold,
            _ => {
                tracing::info!(
                    steam_id = %creator.steam_id,
                    playtime = %playtime,
                    "created squad is allowed"
                );
                return;
            }
        };

        self.execute_console(
            self.console
                .disband_squad(&event.team_id, &event.squad_id)
                .await,
            "disband squad",
        );
        self.warn(&creator.steam_id, &messages::leader_banned(threshold))
            .await;

        if playtime.is_unknown() {
            self.warn_unknown_playtime(&creator.steam_id).await;
        }

        tracing::info!(
            steam_id = %creator.steam_id,
            squad_id = %event.squad_id,
            team_id = %event.team_id,
            playtime = %playtime,
            "new squad disbanded, creator below leader threshold"
        );
    }

    /// Commander check: no grace delay, one warning, immediate demotion.
    async fn verify_commander(&self, player: &PlayerSnapshot) {
        if self.is_whitelisted(&player.steam_id) {
            return;
        }

        let playtime = self.get_playtime(&player.steam_id, false).await;

        let threshold = {
            let rules = self.state.rules.lock().await;
            if rules.commander.is_player_compliant(player, playtime) {
                None
            } else {
                rules
                    .commander
                    .active_tier()
                    .map(|tier| tier.min_player_playtime)
            }
        };

        let threshold = match threshold {
            Some(threshold) => threshold,
            None => {
                tracing::info!(
                    steam_id = %player.steam_id,
                    playtime = %playtime,
                    "commander is allowed"
                );
                return;
            }
        };

        self.execute_console(
            self.console.demote_commander(&player.eos_id).await,
            "demote commander",
        );
        self.warn(&player.steam_id, &messages::commander_banned(threshold))
            .await;

        tracing::info!(
            steam_id = %player.steam_id,
            playtime = %playtime,
            "commander demoted"
        );
    }

    // ---- queries --------------------------------------------------------

    pub async fn show_user_playtime(&self, steam_id: &str) {
        let playtime = self.get_playtime(steam_id, false).await;
        match playtime {
            Playtime::Hours(hours) => {
                self.warn(steam_id, &messages::your_playtime(hours)).await;
            }
            Playtime::Unknown => self.warn_unknown_playtime(steam_id).await,
        }
    }

    pub async fn show_user_blocked_roles(&self, steam_id: &str) {
        if self.is_whitelisted(steam_id) {
            self.warn(steam_id, &messages::all_roles_open()).await;
            return;
        }

        let playtime = self.get_playtime(steam_id, false).await;

        let lines: Vec<String> = {
            let rules = self.state.rules.lock().await;
            rules
                .blocked_for_playtime(playtime)
                .into_iter()
                .map(|rule| {
                    messages::blocked_role_info(
                        &rule.description,
                        rule.active_tier()
                            .map(|tier| tier.min_player_playtime)
                            .unwrap_or(0.0),
                    )
                })
                .collect()
        };

        if lines.is_empty() {
            self.warn(steam_id, &messages::all_roles_open()).await;
            return;
        }

        self.warn_many(steam_id, &lines, self.config.info_message_interval_secs)
            .await;

        sleep(BLOCKED_ROLES_EPILOGUE_DELAY).await;

        match playtime {
            Playtime::Hours(hours) => {
                self.warn(steam_id, &messages::your_playtime(hours)).await;
            }
            Playtime::Unknown => self.warn_unknown_playtime(steam_id).await,
        }
    }

    pub async fn show_all_current_blocked_roles(&self, steam_id: &str) {
        let mut lines: Vec<String> = {
            let rules = self.state.rules.lock().await;
            rules
                .currently_restricted()
                .into_iter()
                .map(|rule| {
                    messages::blocked_role_info(
                        &rule.description,
                        rule.active_tier()
                            .map(|tier| tier.min_player_playtime)
                            .unwrap_or(0.0),
                    )
                })
                .collect()
        };
        lines.push(messages::total_playtime_info(self.state.aggregate.current()));

        self.warn_many(steam_id, &lines, self.config.info_message_interval_secs)
            .await;
    }

    // ---- shared helpers ---------------------------------------------------

    async fn should_enforce(&self) -> bool {
        let count = self.server.player_count().await;
        let gamemode = self.server.current_gamemode().await;
        self.gate.should_enforce(count, gamemode.as_deref())
    }

    fn is_whitelisted(&self, steam_id: &str) -> bool {
        self.config
            .whitelisted_players
            .iter()
            .any(|id| id == steam_id)
    }

    async fn get_playtime(&self, steam_id: &str, force_refresh: bool) -> Playtime {
        let lookup = self.playtime.playtime(steam_id, force_refresh).await;
        if !lookup.errors.is_empty() {
            tracing::info!(steam_id, errors = %lookup.errors.join(", "), "playtime lookup");
        }
        lookup.playtime
    }

    /// Console failures are best effort: log and move on.
    fn execute_console(&self, result: Result<(), crate::services::console::ConsoleError>, what: &str) {
        if let Err(e) = result {
            tracing::warn!(error = %e, "{} failed", what);
        }
    }

    async fn warn(&self, steam_id: &str, message: &str) {
        self.execute_console(self.console.warn(steam_id, message).await, "warn");
    }

    /// Sends the same warning `count` times. Each repetition gets one
    /// more trailing U+00A0 so the game client does not collapse
    /// identical messages.
    async fn warn_repeated(&self, steam_id: &str, message: &str, count: u32, interval_secs: u64) {
        for i in 0..count {
            let padded = format!("{}{}", message, "\u{00A0}".repeat(i as usize));
            self.warn(steam_id, &padded).await;

            if i + 1 != count {
                sleep(Duration::from_secs(interval_secs)).await;
            }
        }
    }

    async fn warn_many(&self, steam_id: &str, lines: &[String], interval_secs: u64) {
        for (i, line) in lines.iter().enumerate() {
            self.warn(steam_id, line).await;

            if i + 1 != lines.len() {
                sleep(Duration::from_secs(interval_secs)).await;
            }
        }
    }

    async fn warn_unknown_playtime(&self, steam_id: &str) {
        self.warn_repeated(
            steam_id,
            &messages::unknown_playtime(),
            self.config.unknown_playtime_message_count,
            self.config.unknown_playtime_message_interval_secs,
        )
        .await;
    }
}

fn squad_lock_key(squad_id: &str, team_id: &str) -> String {
    format!("{}{}", squad_id, team_id)
}
