use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("remote console command failed: {0}")]
pub struct ConsoleError(pub String);

/// Admin actions routed through the game server's remote console. All of
/// them are best effort from the warden's point of view: a failure is
/// logged and the workflow carries on as if the action went through.
#[async_trait]
pub trait AdminConsole: Send + Sync {
    /// On-screen warning message to one player.
    async fn warn(&self, steam_id: &str, message: &str) -> Result<(), ConsoleError>;

    async fn remove_from_squad(&self, player_id: &str) -> Result<(), ConsoleError>;

    async fn demote_commander(&self, eos_id: &str) -> Result<(), ConsoleError>;

    async fn rename_squad(&self, team_id: &str, squad_id: &str) -> Result<(), ConsoleError>;

    async fn disband_squad(&self, team_id: &str, squad_id: &str) -> Result<(), ConsoleError>;
}
