// Draft parameters: player count, pick count and card format.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DraftError;

pub const PLAYER_COUNT_MIN: usize = 1;
pub const PLAYER_COUNT_MAX: usize = 8;
pub const PICK_COUNT_MIN: usize = 5;
pub const PICK_COUNT_MAX: usize = 100;

/// Card formats a draft can be restricted to. Keys match the legality map
/// returned by the card lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Freeform,
    Standard,
    Future,
    Historic,
    Timeless,
    Gladiator,
    Pioneer,
    Explorer,
    Modern,
    Legacy,
    Pauper,
    Vintage,
    Penny,
    Commander,
    Oathbreaker,
    StandardBrawl,
    Brawl,
    Alchemy,
    PauperCommander,
    Duel,
    OldSchool,
    Premodern,
    Predh,
}

impl Format {
    pub const ALL: [Format; 23] = [
        Format::Freeform,
        Format::Standard,
        Format::Future,
        Format::Historic,
        Format::Timeless,
        Format::Gladiator,
        Format::Pioneer,
        Format::Explorer,
        Format::Modern,
        Format::Legacy,
        Format::Pauper,
        Format::Vintage,
        Format::Penny,
        Format::Commander,
        Format::Oathbreaker,
        Format::StandardBrawl,
        Format::Brawl,
        Format::Alchemy,
        Format::PauperCommander,
        Format::Duel,
        Format::OldSchool,
        Format::Premodern,
        Format::Predh,
    ];

    /// Parse a format name, ignoring case.
    pub fn from_str_format(s: &str) -> Option<Self> {
        let lowered = s.trim().to_lowercase();
        Format::ALL
            .into_iter()
            .find(|f| f.display_str() == lowered)
    }

    /// Lowercase key, as used in legality maps and chat output.
    pub fn display_str(&self) -> &'static str {
        match self {
            Format::Freeform => "freeform",
            Format::Standard => "standard",
            Format::Future => "future",
            Format::Historic => "historic",
            Format::Timeless => "timeless",
            Format::Gladiator => "gladiator",
            Format::Pioneer => "pioneer",
            Format::Explorer => "explorer",
            Format::Modern => "modern",
            Format::Legacy => "legacy",
            Format::Pauper => "pauper",
            Format::Vintage => "vintage",
            Format::Penny => "penny",
            Format::Commander => "commander",
            Format::Oathbreaker => "oathbreaker",
            Format::StandardBrawl => "standardbrawl",
            Format::Brawl => "brawl",
            Format::Alchemy => "alchemy",
            Format::PauperCommander => "paupercommander",
            Format::Duel => "duel",
            Format::OldSchool => "oldschool",
            Format::Premodern => "premodern",
            Format::Predh => "predh",
        }
    }

    /// Freeform drafts skip the legality check entirely.
    pub fn is_freeform(&self) -> bool {
        matches!(self, Format::Freeform)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// Validated draft parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftConfig {
    pub player_count: usize,
    pub pick_count: usize,
    pub format: Format,
}

impl DraftConfig {
    /// Parse the three setup arguments as typed by a user. Any unparseable or
    /// out-of-range value rejects the whole setup.
    pub fn parse(player_count: &str, pick_count: &str, format: &str) -> Result<Self, DraftError> {
        const HELP: &str = "setup";
        let player_count = parse_player_count(player_count, HELP)?;
        let pick_count = parse_pick_count(pick_count, HELP)?;
        let format = parse_format(format, HELP)?;
        Ok(DraftConfig {
            player_count,
            pick_count,
            format,
        })
    }

    /// Whether both counts sit inside the limits `parse` enforces.
    pub fn in_range(&self) -> bool {
        (PLAYER_COUNT_MIN..=PLAYER_COUNT_MAX).contains(&self.player_count)
            && (PICK_COUNT_MIN..=PICK_COUNT_MAX).contains(&self.pick_count)
    }

    /// Total number of picks the draft will run for.
    pub fn total_picks(&self) -> usize {
        self.player_count * self.pick_count
    }
}

/// Parse an unsigned count. Signs, whitespace and decimals are rejected.
fn parse_count(raw: &str) -> Option<usize> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

pub(crate) fn parse_player_count(raw: &str, help: &'static str) -> Result<usize, DraftError> {
    parse_count(raw)
        .filter(|n| (PLAYER_COUNT_MIN..=PLAYER_COUNT_MAX).contains(n))
        .ok_or(DraftError::InvalidParameters(help))
}

pub(crate) fn parse_pick_count(raw: &str, help: &'static str) -> Result<usize, DraftError> {
    parse_count(raw)
        .filter(|n| (PICK_COUNT_MIN..=PICK_COUNT_MAX).contains(n))
        .ok_or(DraftError::InvalidParameters(help))
}

pub(crate) fn parse_format(raw: &str, help: &'static str) -> Result<Format, DraftError> {
    Format::from_str_format(raw).ok_or(DraftError::InvalidParameters(help))
}
