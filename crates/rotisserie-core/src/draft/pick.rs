// Pick pipeline: active-turn picks, pre-pick queues and auto-resolution.

use std::fmt;

use tracing::{debug, info, warn};

use super::card::CardInfo;
use super::config::Format;
use super::order::SheetCursor;
use super::player::Player;
use super::state::DraftEngine;
use crate::error::{Action, DraftError};

/// Where a resolved card lands in the mirrored sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub card: String,
    pub row: u32,
    pub column: u32,
}

/// One card that was actually drafted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPick {
    pub player: Player,
    pub card: String,
    pub placement: Placement,
}

/// Everything that happened as a result of one accepted `pick` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickOutcome {
    /// The pick the active player submitted.
    pub pick: ResolvedPick,
    /// Pre-picks that resolved afterwards, in resolution order.
    pub auto_picks: Vec<ResolvedPick>,
    /// Whoever is up next, or `None` once the draft is finished.
    pub next: Option<Player>,
}

impl PickOutcome {
    /// Sheet placements in the order they were made.
    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        std::iter::once(&self.pick)
            .chain(self.auto_picks.iter())
            .map(|p| &p.placement)
    }

    pub fn is_finished(&self) -> bool {
        self.next.is_none()
    }
}

impl fmt::Display for PickOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} has chosen {}.", self.pick.player, self.pick.card)?;
        for auto in &self.auto_picks {
            write!(f, "\n{} has chosen {} from their pre-picks.", auto.player, auto.card)?;
        }
        match &self.next {
            Some(next) => write!(f, "\n{next} is up."),
            None => f.write_str(
                "\nCongrats! The draft has been finished! Decks will arrive shortly.",
            ),
        }
    }
}

impl DraftEngine {
    /// Draft `card` for `player`, then resolve any pre-picks that are now due.
    pub fn pick(&mut self, player: &Player, card: &CardInfo) -> Result<PickOutcome, DraftError> {
        if !self.fired {
            return Err(DraftError::NotFired(Action::Pick));
        }
        if self.picks_remaining == 0 {
            return Err(DraftError::DraftFinished);
        }
        let seat_idx = self.snake_order[self.active_index];
        if self.seats[seat_idx].player.id != player.id {
            return Err(DraftError::NotYourTurn);
        }
        let name = card.name().ok_or(DraftError::CardNotFound)?;
        if self.is_picked(name) {
            return Err(DraftError::AlreadyChosen);
        }
        let format = self.drafting_format();
        if !card.is_legal_in(format) {
            return Err(DraftError::NotLegal {
                format: format.to_string(),
            });
        }

        let pick = self.apply_pick(seat_idx, name.to_string());
        let auto_picks = self.drain_prepicks();
        let next = self.active_player().cloned();
        if next.is_none() {
            info!("Draft finished");
        }

        Ok(PickOutcome {
            pick,
            auto_picks,
            next,
        })
    }

    /// Queue `card` to be drafted automatically on `player`'s turn.
    pub fn pre_pick(&mut self, player: &Player, card: &CardInfo) -> Result<String, DraftError> {
        if !self.fired {
            return Err(DraftError::NotFired(Action::PrePick));
        }
        if self.picks_remaining == 0 {
            return Err(DraftError::DraftFinished);
        }
        let seat_idx = self
            .seat_index(&player.id)
            .ok_or(DraftError::NotInDraft(Action::PrePick))?;
        let name = card.name().ok_or(DraftError::CardNotFound)?;
        let format = self.drafting_format();
        if !card.is_legal_in(format) {
            return Err(DraftError::NotLegal {
                format: format.to_string(),
            });
        }
        if self.is_picked(name) {
            return Err(DraftError::AlreadyChosen);
        }
        let queue = &mut self.seats[seat_idx].prepicks;
        if queue.iter().any(|c| c == name) {
            return Err(DraftError::AlreadyPrePicked);
        }

        queue.push_back(name.to_string());
        debug!("{} queued pre-pick {}", player.name, name);
        Ok(format!("You have pre-picked: {name}."))
    }

    /// Remove the first queued entry matching `card`.
    pub fn cancel_pre_pick(&mut self, player: &Player, card: &CardInfo) -> Result<String, DraftError> {
        if !self.fired {
            return Err(DraftError::NotFired(Action::CancelPrePick));
        }
        let seat_idx = self
            .seat_index(&player.id)
            .ok_or(DraftError::NotInDraft(Action::CancelPrePick))?;
        let name = card.name().ok_or(DraftError::CardNotFound)?;
        let queue = &mut self.seats[seat_idx].prepicks;
        let pos = queue
            .iter()
            .position(|c| c == name)
            .ok_or(DraftError::NotPrePicked)?;

        queue.remove(pos);
        debug!("{} cancelled pre-pick {}", player.name, name);
        Ok(format!("You have successfully removed: {name}."))
    }

    /// 1-indexed listing of `player`'s queue in resolution order.
    pub fn list_pre_picks(&self, player: &Player) -> Result<String, DraftError> {
        if !self.fired {
            return Err(DraftError::NotFired(Action::ListPrePicks));
        }
        let queue = self
            .prepicks_of(&player.id)
            .ok_or(DraftError::NotInDraft(Action::ListPrePicks))?;
        if queue.is_empty() {
            return Ok("Pre-pick queue is empty.".to_string());
        }

        let mut listing = String::from("```");
        for (i, card) in queue.iter().enumerate() {
            listing.push_str(&format!("{}. {}\n", i + 1, card));
        }
        listing.push_str("```");
        Ok(listing)
    }

    /// Every resolved pick with its sheet cell, in the order picks were made.
    /// Rebuilt by replaying the snake order over each seat's pick list.
    pub fn pick_history(&self) -> Vec<Placement> {
        let turns = self.movement.len();
        let picked: usize = self.seats.iter().map(|s| s.picks.len()).sum();
        if !self.fired || turns == 0 {
            return Vec::new();
        }

        let mut taken = vec![0usize; self.seats.len()];
        let mut cursor = SheetCursor::default();
        let mut history = Vec::with_capacity(picked);
        for turn in 0..picked {
            let index = turn % turns;
            let Some(&seat_idx) = self.snake_order.get(index) else {
                break;
            };
            let Some(card) = self.seats[seat_idx].picks.get(taken[seat_idx]) else {
                break;
            };
            taken[seat_idx] += 1;
            history.push(Placement {
                card: card.clone(),
                row: cursor.row,
                column: cursor.column,
            });
            self.movement.apply(index, &mut cursor);
        }
        history
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn is_picked(&self, card: &str) -> bool {
        self.seats.iter().any(|s| s.picks.iter().any(|c| c == card))
    }

    fn drafting_format(&self) -> Format {
        self.config.map(|c| c.format).unwrap_or(Format::Freeform)
    }

    /// Record `card` for the seat at the active index and advance the turn.
    /// Callers must have validated the pick.
    fn apply_pick(&mut self, seat_idx: usize, card: String) -> ResolvedPick {
        let placement = Placement {
            card: card.clone(),
            row: self.cursor.row,
            column: self.cursor.column,
        };

        self.seats[seat_idx].picks.push(card.clone());
        self.movement.apply(self.active_index, &mut self.cursor);
        self.active_index = (self.active_index + 1) % self.snake_order.len();
        self.picks_remaining -= 1;
        for seat in &mut self.seats {
            seat.prepicks.retain(|c| c != &card);
        }

        let player = self.seats[seat_idx].player.clone();
        info!(
            "{} picked {} at ({}, {}), {} remaining",
            player.name, card, placement.row, placement.column, self.picks_remaining
        );
        ResolvedPick {
            player,
            card,
            placement,
        }
    }

    /// Resolve queued pre-picks for as long as the active player has any.
    fn drain_prepicks(&mut self) -> Vec<ResolvedPick> {
        let mut resolved = Vec::new();
        while self.picks_remaining > 0 {
            let seat_idx = self.snake_order[self.active_index];
            let Some(card) = self.seats[seat_idx].prepicks.pop_front() else {
                break;
            };
            if self.is_picked(&card) {
                warn!(
                    "Discarding pre-pick {} for {}: already chosen",
                    card, self.seats[seat_idx].player.name
                );
                continue;
            }
            resolved.push(self.apply_pick(seat_idx, card));
        }
        resolved
    }
}
