// Card lookup against the Scryfall card database.
//
// Queries `/cards/named?fuzzy=...`, which tolerates minor misspellings and
// returns the canonical card name together with per-format legalities.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::LookupConfig;
use rotisserie_core::{CardInfo, Legality};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const USER_AGENT: &str = concat!("rotisserie/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Trait and errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("card lookup request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("card lookup returned an unreadable response (status {status})")]
    UnexpectedResponse { status: u16 },

    #[error("card lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Resolves the words a user typed to a canonical card.
#[async_trait]
pub trait CardLookup: Send + Sync {
    async fn lookup(&self, query: &[String]) -> Result<CardInfo, LookupError>;
}

// ---------------------------------------------------------------------------
// ScryfallClient
// ---------------------------------------------------------------------------

pub struct ScryfallClient {
    http: reqwest::Client,
    base_url: String,
}

impl ScryfallClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &LookupConfig) -> Self {
        Self::new(config.base_url.clone())
    }
}

#[async_trait]
impl CardLookup for ScryfallClient {
    async fn lookup(&self, query: &[String]) -> Result<CardInfo, LookupError> {
        let fuzzy = fuzzy_query(query);
        if fuzzy.is_empty() {
            return Ok(CardInfo::NotFound);
        }

        let url = format!("{}/cards/named", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .query(&[("fuzzy", fuzzy.as_str())])
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, query = %fuzzy, "card lookup response");

        parse_card_json(&body).ok_or(LookupError::UnexpectedResponse { status })
    }
}

// ---------------------------------------------------------------------------
// StaticLookup
// ---------------------------------------------------------------------------

/// Fixed card table, matched on the case-insensitive joined query. Used for
/// offline runs and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticLookup {
    cards: HashMap<String, CardInfo>,
    delay: Option<Duration>,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a found card under its own name.
    pub fn with_card(mut self, card: CardInfo) -> Self {
        if let Some(name) = card.name() {
            self.cards.insert(name.to_lowercase(), card.clone());
        }
        self
    }

    /// Sleep before answering, to exercise caller timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl CardLookup for StaticLookup {
    async fn lookup(&self, query: &[String]) -> Result<CardInfo, LookupError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let key = query.join(" ").to_lowercase();
        Ok(self.cards.get(&key).cloned().unwrap_or(CardInfo::NotFound))
    }
}

// ---------------------------------------------------------------------------
// JSON parsing helpers
// ---------------------------------------------------------------------------

/// Join query words and title-case each one, e.g. `["black", "LOTUS"]` ->
/// `"Black Lotus"`.
pub(crate) fn fuzzy_query(words: &[String]) -> String {
    words
        .iter()
        .filter(|w| !w.trim().is_empty())
        .map(|w| title_case(w.trim()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Parse a `/cards/named` response body.
///
/// Expected shapes: `{ "object": "card", "name": "...", "legalities": { "modern": "legal", ... },
/// "image_uris": { "normal": "..." } }`
/// or `{ "object": "error", ... }` for unknown or ambiguous names.
pub(crate) fn parse_card_json(data: &str) -> Option<CardInfo> {
    let v: Value = serde_json::from_str(data).ok()?;
    match v.get("object")?.as_str()? {
        "error" => Some(CardInfo::NotFound),
        "card" => {
            let name = v.get("name")?.as_str()?.to_string();
            let legalities = v
                .get("legalities")
                .and_then(Value::as_object)
                .map(|map| {
                    map.iter()
                        .filter_map(|(format, status)| {
                            Some((format.clone(), Legality::from_status(status.as_str()?)))
                        })
                        .collect()
                })
                .unwrap_or_default();
            // Double-faced cards carry their images per face.
            let image_url = v
                .get("image_uris")
                .or_else(|| v.get("card_faces")?.get(0)?.get("image_uris"))
                .and_then(|uris| uris.get("normal"))
                .and_then(Value::as_str)
                .map(String::from);
            Some(CardInfo::Found {
                name,
                legalities,
                image_url,
            })
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
