// Serializable snapshot of a draft engine, used for crash recovery.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::DraftConfig;
use super::order::{snake_order, MovementTable, SheetCursor};
use super::player::Seat;
use super::state::DraftEngine;

/// Bumped whenever the snapshot layout changes incompatibly.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Complete engine state as a plain serde record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub version: u32,
    pub config: Option<DraftConfig>,
    pub fired: bool,
    pub seats: Vec<Seat>,
    pub snake_order: Vec<usize>,
    pub active_index: usize,
    pub picks_remaining: usize,
    pub cursor: SheetCursor,
    pub movement: MovementTable,
}

/// Why a snapshot could not be turned back into an engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("unsupported snapshot version {found}")]
    UnsupportedVersion { found: u32 },

    #[error("snapshot has players or picks but no draft setup")]
    MissingSetup,

    #[error("draft settings out of range: {player_count} players, {pick_count} picks")]
    ConfigOutOfRange {
        player_count: usize,
        pick_count: usize,
    },

    #[error("roster has {joined} players but the draft allows {capacity}")]
    RosterOverflow { joined: usize, capacity: usize },

    #[error("player id {0} appears more than once")]
    DuplicatePlayer(String),

    #[error("card {0} was picked more than once")]
    DuplicateCard(String),

    #[error("pick pipeline state is inconsistent: {0}")]
    Pipeline(&'static str),
}

impl DraftEngine {
    pub fn snapshot(&self) -> DraftSnapshot {
        DraftSnapshot {
            version: SNAPSHOT_VERSION,
            config: self.config,
            fired: self.fired,
            seats: self.seats.clone(),
            snake_order: self.snake_order.clone(),
            active_index: self.active_index,
            picks_remaining: self.picks_remaining,
            cursor: self.cursor,
            movement: self.movement.clone(),
        }
    }

    /// Rebuild an engine, rejecting snapshots that break any engine invariant.
    pub fn restore(snapshot: DraftSnapshot) -> Result<DraftEngine, SnapshotError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
            });
        }

        let mut ids = HashSet::new();
        for seat in &snapshot.seats {
            if !ids.insert(&seat.player.id) {
                return Err(SnapshotError::DuplicatePlayer(seat.player.id.to_string()));
            }
        }

        let Some(config) = snapshot.config else {
            if snapshot.fired || !snapshot.seats.is_empty() {
                return Err(SnapshotError::MissingSetup);
            }
            check_idle_pipeline(&snapshot)?;
            return Ok(engine_from(snapshot));
        };

        if !config.in_range() {
            return Err(SnapshotError::ConfigOutOfRange {
                player_count: config.player_count,
                pick_count: config.pick_count,
            });
        }
        if snapshot.seats.len() > config.player_count {
            return Err(SnapshotError::RosterOverflow {
                joined: snapshot.seats.len(),
                capacity: config.player_count,
            });
        }

        if snapshot.fired {
            check_fired_pipeline(&snapshot, &config)?;
        } else {
            check_idle_pipeline(&snapshot)?;
        }

        Ok(engine_from(snapshot))
    }
}

fn engine_from(snapshot: DraftSnapshot) -> DraftEngine {
    DraftEngine {
        config: snapshot.config,
        fired: snapshot.fired,
        seats: snapshot.seats,
        snake_order: snapshot.snake_order,
        active_index: snapshot.active_index,
        picks_remaining: snapshot.picks_remaining,
        cursor: snapshot.cursor,
        movement: snapshot.movement,
    }
}

/// Before fire nothing has been picked and the pipeline is at its defaults.
fn check_idle_pipeline(snapshot: &DraftSnapshot) -> Result<(), SnapshotError> {
    let untouched = snapshot.snake_order.is_empty()
        && snapshot.active_index == 0
        && snapshot.picks_remaining == 0
        && snapshot.cursor == SheetCursor::default()
        && snapshot.movement.is_empty()
        && snapshot
            .seats
            .iter()
            .all(|s| s.picks.is_empty() && s.prepicks.is_empty());
    if untouched {
        Ok(())
    } else {
        Err(SnapshotError::Pipeline("pick state present before fire"))
    }
}

fn check_fired_pipeline(snapshot: &DraftSnapshot, config: &DraftConfig) -> Result<(), SnapshotError> {
    let players = config.player_count;
    if snapshot.seats.len() != players {
        return Err(SnapshotError::Pipeline("fired with an incomplete roster"));
    }
    if snapshot.snake_order != snake_order(players) {
        return Err(SnapshotError::Pipeline("snake order does not match roster"));
    }
    if snapshot.movement != MovementTable::for_players(players) {
        return Err(SnapshotError::Pipeline("movement table does not match roster"));
    }

    let mut seen = HashSet::new();
    for card in snapshot.seats.iter().flat_map(|s| &s.picks) {
        if !seen.insert(card.as_str()) {
            return Err(SnapshotError::DuplicateCard(card.clone()));
        }
    }
    let picked = seen.len();
    if picked + snapshot.picks_remaining != config.total_picks() {
        return Err(SnapshotError::Pipeline("picked and remaining do not add up"));
    }
    if snapshot
        .seats
        .iter()
        .flat_map(|s| &s.prepicks)
        .any(|card| seen.contains(card.as_str()))
    {
        return Err(SnapshotError::Pipeline("queued pre-pick was already chosen"));
    }

    // Replaying the movement table from the start must land on the stored
    // cursor and turn index.
    let turns = snapshot.movement.len();
    let mut cursor = SheetCursor::default();
    for i in 0..picked {
        snapshot.movement.apply(i % turns, &mut cursor);
    }
    if snapshot.active_index != picked % turns || snapshot.cursor != cursor {
        return Err(SnapshotError::Pipeline("turn cursor does not match picks made"));
    }

    Ok(())
}
