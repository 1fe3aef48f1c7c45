use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::player::PlayerSnapshot;
use crate::services::playtime::PlaytimeSource;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to access state file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("state file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Serialize, Deserialize)]
struct PersistedState {
    last_total_server_playtime: f64,
}

/// Holds the last computed sum of all connected players' playtimes and
/// keeps it on disk so tier selection survives a restart. Without the
/// persisted value a restart would reset the aggregate to zero and
/// temporarily unlock every tier.
///
/// Recomputation is one Steam lookup per connected player, so it runs
/// only at round boundaries; mid-round readers see the previous round's
/// committed value.
#[derive(Clone, Debug)]
pub struct AggregateTracker {
    value: Arc<Mutex<f64>>,
    path: PathBuf,
}

impl AggregateTracker {
    /// Loads the persisted aggregate, or initializes the file with zero
    /// when it does not exist yet. Unreadable or malformed state is a
    /// startup failure, not something to run with.
    pub fn load_or_init(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let path = path.as_ref().to_path_buf();

        let value = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|source| StateError::Io {
                path: path.clone(),
                source,
            })?;
            let state: PersistedState =
                serde_json::from_str(&raw).map_err(|source| StateError::Malformed {
                    path: path.clone(),
                    source,
                })?;
            state.last_total_server_playtime
        } else {
            write_state(&path, 0.0)?;
            0.0
        };

        Ok(Self {
            value: Arc::new(Mutex::new(value)),
            path,
        })
    }

    /// Latest committed aggregate.
    pub fn current(&self) -> f64 {
        *self.value.lock().expect("aggregate value poisoned")
    }

    /// Sums the roster's resolved playtimes (unknown counts as zero),
    /// commits the new value and persists it.
    pub async fn recompute(
        &self,
        players: &[PlayerSnapshot],
        source: &dyn PlaytimeSource,
    ) -> Result<f64, StateError> {
        let lookups = join_all(
            players
                .iter()
                .map(|player| source.playtime(&player.steam_id, false)),
        )
        .await;

        let total: f64 = lookups
            .iter()
            .map(|lookup| lookup.playtime.hours_or_zero())
            .sum();

        self.commit(total)?;
        Ok(total)
    }

    /// Commits and persists a value directly. Exposed for startup and
    /// tests; normal operation goes through `recompute`.
    pub fn commit(&self, total: f64) -> Result<(), StateError> {
        *self.value.lock().expect("aggregate value poisoned") = total;
        write_state(&self.path, total)
    }
}

fn write_state(path: &Path, value: f64) -> Result<(), StateError> {
    let state = PersistedState {
        last_total_server_playtime: value,
    };
    let raw = serde_json::to_string_pretty(&state).map_err(|source| StateError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, raw).map_err(|source| StateError::Io {
        path: path.to_path_buf(),
        source,
    })
}
