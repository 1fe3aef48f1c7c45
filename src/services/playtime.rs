use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::models::player::Playtime;

/// Steam app id of Squad. The warden only ever resolves playtime for
/// this one game.
pub const SQUAD_APP_ID: u32 = 393_380;

const STEAM_API_BASE: &str = "https://api.steampowered.com";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a playtime lookup. `errors` is advisory only; callers log
/// it and otherwise treat `playtime` as ordinary data.
#[derive(Clone, Debug)]
pub struct PlaytimeLookup {
    pub playtime: Playtime,
    pub errors: Vec<String>,
}

impl PlaytimeLookup {
    pub fn known(hours: f64) -> Self {
        Self {
            playtime: Playtime::Hours(hours),
            errors: Vec::new(),
        }
    }

    pub fn unknown(error: impl Into<String>) -> Self {
        Self {
            playtime: Playtime::Unknown,
            errors: vec![error.into()],
        }
    }
}

/// Where personal playtimes come from. The production implementation is
/// [`SteamPlaytimeClient`]; tests substitute a table.
#[async_trait]
pub trait PlaytimeSource: Send + Sync {
    /// Resolves a player's Squad playtime in hours. `force_refresh`
    /// bypasses any cached value. Lookups never fail hard: transport and
    /// data problems come back as `Playtime::Unknown`.
    async fn playtime(&self, steam_id: &str, force_refresh: bool) -> PlaytimeLookup;
}

#[derive(Deserialize)]
struct OwnedGamesEnvelope {
    #[serde(default)]
    response: OwnedGamesResponse,
}

#[derive(Deserialize, Default)]
struct OwnedGamesResponse {
    /// Absent entirely when the profile or game list is private.
    games: Option<Vec<OwnedGame>>,
}

#[derive(Deserialize)]
struct OwnedGame {
    appid: u32,
    /// Minutes, per the Steam API.
    #[serde(default)]
    playtime_forever: f64,
}

/// Steam Web API client with an in-process cache. One lookup per player
/// per session is the normal case; the cache keeps chat commands and
/// round-end recomputation from hammering the API.
pub struct SteamPlaytimeClient {
    client: Client,
    api_key: String,
    base_url: String,
    cache: Arc<RwLock<HashMap<String, Playtime>>>,
}

impl SteamPlaytimeClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, STEAM_API_BASE)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn fetch(&self, steam_id: &str) -> PlaytimeLookup {
        let url = format!(
            "{}/IPlayerService/GetOwnedGames/v1/?key={}&steamid={}&include_played_free_games=1",
            self.base_url, self.api_key, steam_id
        );

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return PlaytimeLookup::unknown(format!("steam request failed: {}", e)),
        };

        if !response.status().is_success() {
            return PlaytimeLookup::unknown(format!(
                "steam returned status {}",
                response.status()
            ));
        }

        let envelope: OwnedGamesEnvelope = match response.json().await {
            Ok(envelope) => envelope,
            Err(e) => return PlaytimeLookup::unknown(format!("steam response unreadable: {}", e)),
        };

        let games = match envelope.response.games {
            Some(games) => games,
            None => return PlaytimeLookup::unknown("profile or game list is private"),
        };

        match games.iter().find(|game| game.appid == SQUAD_APP_ID) {
            Some(game) => PlaytimeLookup::known(game.playtime_forever / 60.0),
            None => PlaytimeLookup::unknown("game playtime is hidden"),
        }
    }
}

#[async_trait]
impl PlaytimeSource for SteamPlaytimeClient {
    async fn playtime(&self, steam_id: &str, force_refresh: bool) -> PlaytimeLookup {
        if !force_refresh {
            let cache = self.cache.read().expect("playtime cache poisoned");
            if let Some(&playtime) = cache.get(steam_id) {
                return PlaytimeLookup {
                    playtime,
                    errors: Vec::new(),
                };
            }
        }

        let lookup = self.fetch(steam_id).await;

        let mut cache = self.cache.write().expect("playtime cache poisoned");
        cache.insert(steam_id.to_string(), lookup.playtime);

        lookup
    }
}
