// Player identity and per-player draft state.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Platform-level user identifier. Unique within a draft.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        PlayerId(s.to_string())
    }
}

/// A drafter: display name plus stable id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub id: PlayerId,
}

impl Player {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Player {
            name: name.into(),
            id: PlayerId(id.into()),
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A joined player together with their resolved picks and pre-pick queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub player: Player,
    /// Resolved picks in the order they were made.
    pub picks: Vec<String>,
    /// Pending pre-picks, consumed from the front.
    pub prepicks: VecDeque<String>,
}

impl Seat {
    pub fn new(player: Player) -> Self {
        Seat {
            player,
            picks: Vec::new(),
            prepicks: VecDeque::new(),
        }
    }

    /// Plain-text decklist, one `1 <card>` line per pick.
    pub fn decklist(&self) -> String {
        self.picks.iter().map(|card| format!("1 {card}\n")).collect()
    }
}
