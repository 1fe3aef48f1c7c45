use async_trait::async_trait;

use crate::models::player::PlayerSnapshot;

/// Read-only view of the live game server. Enforcement treats event
/// payloads as triggers only and re-reads state through this trait
/// before acting.
#[async_trait]
pub trait GameServer: Send + Sync {
    /// Current roster of connected players.
    async fn players(&self) -> Vec<PlayerSnapshot>;

    /// Live lookup; `None` when the player has disconnected.
    async fn player_by_steam_id(&self, steam_id: &str) -> Option<PlayerSnapshot>;

    async fn player_count(&self) -> usize;

    /// Gamemode of the active layer, if known.
    async fn current_gamemode(&self) -> Option<String>;
}
