// Draft engine state: setup parameters, roster, snake order and sheet cursor.
//
// Lifecycle: NotSetup -> Setup -> Fired -> (finished) -> reset -> NotSetup.
// Every operation validates fully before mutating, so a rejected command
// leaves the engine untouched.

use std::collections::VecDeque;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use super::config::{parse_format, parse_pick_count, parse_player_count, DraftConfig};
use super::order::{snake_order, MovementTable, SheetCursor};
use super::player::{Player, PlayerId, Seat};
use crate::error::{Action, DraftError};

/// A single rotisserie draft table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftEngine {
    /// `Some` once the draft has been set up.
    pub(crate) config: Option<DraftConfig>,
    pub(crate) fired: bool,
    /// Joined players in join order; shuffled in place when the draft fires.
    pub(crate) seats: Vec<Seat>,
    /// Seat indices in turn order, `2 * player_count` long once fired.
    pub(crate) snake_order: Vec<usize>,
    pub(crate) active_index: usize,
    pub(crate) picks_remaining: usize,
    pub(crate) cursor: SheetCursor,
    pub(crate) movement: MovementTable,
}

/// Result of a successful fire: the randomized seating and who picks first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FireOutcome {
    /// Players in shuffled seating order (sheet column order).
    pub order: Vec<Player>,
    pub pick_count: usize,
    pub first: Player,
}

impl FireOutcome {
    /// Announcement text, optionally pointing players at the mirrored sheet.
    pub fn message(&self, sheet_link: Option<&str>) -> String {
        match sheet_link {
            Some(link) if !link.is_empty() => format!(
                "Setup has been completed.\n\nSheet is available here: {link}\n\n{} is up first.",
                self.first
            ),
            _ => format!("Setup has been completed.\n\n{} is up first.", self.first),
        }
    }
}

impl fmt::Display for FireOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message(None))
    }
}

/// Read-only view of the draft for the `info` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftInfo {
    pub config: Option<DraftConfig>,
    pub fired: bool,
    pub players: Vec<String>,
}

impl fmt::Display for DraftInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(config) = &self.config else {
            return f.write_str("The draft has not been set up.");
        };
        writeln!(f, "```player_count is: {}", config.player_count)?;
        writeln!(f, "pick_count is: {}", config.pick_count)?;
        writeln!(f, "draft_fired status is: {}", self.fired)?;
        writeln!(f, "format is: {}", config.format)?;
        writeln!(f, "Current joined drafters are:")?;
        for name in &self.players {
            writeln!(f, "{name}")?;
        }
        f.write_str("```")
    }
}

impl DraftEngine {
    /// A fresh engine in the NotSetup phase.
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Setup / roster
    // ------------------------------------------------------------------

    /// Configure a new draft from raw user arguments.
    pub fn setup_draft(
        &mut self,
        player_count: &str,
        pick_count: &str,
        format: &str,
    ) -> Result<String, DraftError> {
        if self.fired {
            return Err(DraftError::AlreadyFired(Action::Setup));
        }
        if self.config.is_some() {
            return Err(DraftError::AlreadySetup);
        }

        let config = DraftConfig::parse(player_count, pick_count, format)?;
        self.config = Some(config);
        info!(
            "Draft set up: {} players, {} picks, format {}",
            config.player_count, config.pick_count, config.format
        );

        Ok(format!(
            "The draft has been set up. We have {} players, {} picks, and the format is {}. \
             Use the !join command to be added to the draft.",
            config.player_count, config.pick_count, config.format
        ))
    }

    /// Borrow the config for an edit, rejecting edits outside the setup phase.
    fn editable_config(&mut self) -> Result<&mut DraftConfig, DraftError> {
        if self.fired {
            return Err(DraftError::AlreadyFired(Action::Edit));
        }
        self.config.as_mut().ok_or(DraftError::NotSetup(Action::Edit))
    }

    pub fn edit_player_count(&mut self, raw: &str) -> Result<String, DraftError> {
        let joined = self.seats.len();
        let config = self.editable_config()?;
        let player_count = parse_player_count(raw, "edit_player")?;
        if joined > player_count {
            return Err(DraftError::TooManyPlayers {
                requested: player_count,
            });
        }
        config.player_count = player_count;
        Ok(format!("Player count is: {player_count}"))
    }

    pub fn edit_pick_count(&mut self, raw: &str) -> Result<String, DraftError> {
        let config = self.editable_config()?;
        let pick_count = parse_pick_count(raw, "edit_pick")?;
        config.pick_count = pick_count;
        Ok(format!("Pick count is: {pick_count}"))
    }

    pub fn edit_format(&mut self, raw: &str) -> Result<String, DraftError> {
        let config = self.editable_config()?;
        let format = parse_format(raw, "edit_format")?;
        config.format = format;
        Ok(format!("Format is: {format}"))
    }

    /// Add a player to the roster if there is a free spot.
    pub fn join(&mut self, player: Player) -> Result<String, DraftError> {
        if self.fired {
            return Err(DraftError::AlreadyFired(Action::Join));
        }
        let config = self.config.ok_or(DraftError::NotSetup(Action::Join))?;
        if self.seat_index(&player.id).is_some() {
            return Err(DraftError::AlreadyJoined(player.name));
        }
        if self.seats.len() >= config.player_count {
            return Err(DraftError::RosterFull);
        }

        let message = format!("{} has been added to the draft.", player.name);
        info!("{} ({}) joined the draft", player.name, player.id);
        self.seats.push(Seat::new(player));
        Ok(message)
    }

    /// Remove a player (and their pick lists) before the draft fires.
    pub fn leave(&mut self, player: &Player) -> Result<String, DraftError> {
        if self.fired {
            return Err(DraftError::AlreadyFired(Action::Leave));
        }
        let idx = self
            .seat_index(&player.id)
            .ok_or(DraftError::NotInDraft(Action::Leave))?;

        let seat = self.seats.remove(idx);
        info!("{} ({}) left the draft", seat.player.name, seat.player.id);
        Ok(format!("{} has left the draft.", seat.player.name))
    }

    /// Abandon a draft that was set up but nobody has joined.
    pub fn cancel(&mut self) -> Result<String, DraftError> {
        if self.fired {
            return Err(DraftError::AlreadyFired(Action::Cancel));
        }
        if self.config.is_none() {
            return Err(DraftError::NotSetup(Action::Cancel));
        }
        if !self.seats.is_empty() {
            return Err(DraftError::PlayersStillJoined);
        }
        self.config = None;
        info!("Draft setup cancelled");
        Ok("The draft setup has been cancelled.".to_string())
    }

    pub fn info(&self) -> DraftInfo {
        DraftInfo {
            config: self.config,
            fired: self.fired,
            players: self.seats.iter().map(|s| s.player.name.clone()).collect(),
        }
    }

    // ------------------------------------------------------------------
    // Fire / reset
    // ------------------------------------------------------------------

    /// Fire the draft with the thread-local RNG.
    pub fn fire(&mut self) -> Result<FireOutcome, DraftError> {
        self.fire_with_rng(&mut rand::rng())
    }

    /// Lock the roster, randomize seating and start the pick pipeline.
    pub fn fire_with_rng<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<FireOutcome, DraftError> {
        if self.fired {
            return Err(DraftError::AlreadyFired(Action::Fire));
        }
        let config = self.config.ok_or(DraftError::NotSetup(Action::Fire))?;
        if self.seats.len() != config.player_count {
            return Err(DraftError::NotFull);
        }

        self.seats.shuffle(rng);
        self.snake_order = snake_order(self.seats.len());
        self.picks_remaining = config.total_picks();
        self.active_index = 0;
        self.cursor = SheetCursor::default();
        self.movement = MovementTable::for_players(config.player_count);
        self.fired = true;

        let order: Vec<Player> = self.seats.iter().map(|s| s.player.clone()).collect();
        let first = order[0].clone();
        info!(
            "Draft fired: {} picks, order [{}]",
            self.picks_remaining,
            order
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(FireOutcome {
            order,
            pick_count: config.pick_count,
            first,
        })
    }

    /// Return every field to its NotSetup default.
    pub fn reset(&mut self) {
        *self = DraftEngine::default();
        info!("Draft engine reset");
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn is_setup(&self) -> bool {
        self.config.is_some()
    }

    pub fn is_fired(&self) -> bool {
        self.fired
    }

    /// Fired and no picks left to make.
    pub fn is_finished(&self) -> bool {
        self.fired && self.picks_remaining == 0
    }

    pub fn config(&self) -> Option<&DraftConfig> {
        self.config.as_ref()
    }

    /// Joined players in roster order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.seats.iter().map(|s| &s.player)
    }

    pub fn roster_size(&self) -> usize {
        self.seats.len()
    }

    /// Full turn order, `2 * player_count` entries once fired.
    pub fn snake_order(&self) -> Vec<&Player> {
        self.snake_order
            .iter()
            .map(|&idx| &self.seats[idx].player)
            .collect()
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    /// The player whose turn it is, if the draft is running.
    pub fn active_player(&self) -> Option<&Player> {
        if !self.fired || self.picks_remaining == 0 {
            return None;
        }
        self.snake_order
            .get(self.active_index)
            .map(|&idx| &self.seats[idx].player)
    }

    pub fn picks_remaining(&self) -> usize {
        self.picks_remaining
    }

    pub fn cursor(&self) -> SheetCursor {
        self.cursor
    }

    pub fn movement(&self) -> &MovementTable {
        &self.movement
    }

    pub fn picks_of(&self, id: &PlayerId) -> Option<&[String]> {
        self.seat(id).map(|s| s.picks.as_slice())
    }

    pub fn prepicks_of(&self, id: &PlayerId) -> Option<&VecDeque<String>> {
        self.seat(id).map(|s| &s.prepicks)
    }

    /// Each player's decklist, in seating order.
    pub fn decklists(&self) -> Vec<(Player, String)> {
        self.seats
            .iter()
            .map(|s| (s.player.clone(), s.decklist()))
            .collect()
    }

    pub(crate) fn seat_index(&self, id: &PlayerId) -> Option<usize> {
        self.seats.iter().position(|s| &s.player.id == id)
    }

    fn seat(&self, id: &PlayerId) -> Option<&Seat> {
        self.seats.iter().find(|s| &s.player.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::config::Format;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn player(n: usize) -> Player {
        Player::new(format!("player_{n}"), n.to_string())
    }

    fn full_engine(players: usize) -> DraftEngine {
        let mut engine = DraftEngine::new();
        engine
            .setup_draft(&players.to_string(), "45", "freeform")
            .unwrap();
        for n in 1..=players {
            engine.join(player(n)).unwrap();
        }
        engine
    }

    // --- setup ---

    #[test]
    fn setup_valid_reports_parameters() {
        let mut engine = DraftEngine::new();
        let msg = engine.setup_draft("5", "50", "freeform").unwrap();
        assert_eq!(
            msg,
            "The draft has been set up. We have 5 players, 50 picks, and the format is freeform. \
             Use the !join command to be added to the draft."
        );
        let config = engine.config().unwrap();
        assert_eq!(config.player_count, 5);
        assert_eq!(config.pick_count, 50);
        assert_eq!(config.format, Format::Freeform);
    }

    #[test]
    fn setup_twice_is_rejected() {
        let mut engine = DraftEngine::new();
        engine.setup_draft("4", "45", "modern").unwrap();
        assert_eq!(
            engine.setup_draft("4", "45", "modern"),
            Err(DraftError::AlreadySetup)
        );
    }

    #[test]
    fn setup_after_fire_is_rejected() {
        let mut engine = full_engine(2);
        engine.fire().unwrap();
        assert_eq!(
            engine.setup_draft("4", "45", "modern"),
            Err(DraftError::AlreadyFired(Action::Setup))
        );
    }

    #[test]
    fn setup_invalid_leaves_engine_untouched() {
        let mut engine = DraftEngine::new();
        assert_eq!(
            engine.setup_draft("5", "ergd", "freeform"),
            Err(DraftError::InvalidParameters("setup"))
        );
        assert!(!engine.is_setup());
        assert_eq!(engine, DraftEngine::default());
    }

    // --- edits ---

    #[test]
    fn edit_player_count_valid() {
        let mut engine = DraftEngine::new();
        engine.setup_draft("4", "45", "freeform").unwrap();
        assert_eq!(engine.edit_player_count("5").unwrap(), "Player count is: 5");
        assert_eq!(engine.config().unwrap().player_count, 5);
    }

    #[test]
    fn edit_player_count_below_roster_size() {
        let mut engine = full_engine(4);
        assert_eq!(
            engine.edit_player_count("3"),
            Err(DraftError::TooManyPlayers { requested: 3 })
        );
        assert_eq!(engine.config().unwrap().player_count, 4);
    }

    #[test]
    fn edit_before_setup_and_after_fire() {
        let mut engine = DraftEngine::new();
        assert_eq!(
            engine.edit_pick_count("50"),
            Err(DraftError::NotSetup(Action::Edit))
        );

        let mut engine = full_engine(2);
        engine.fire().unwrap();
        assert_eq!(
            engine.edit_format("modern"),
            Err(DraftError::AlreadyFired(Action::Edit))
        );
    }

    #[test]
    fn edit_pick_count_and_format() {
        let mut engine = DraftEngine::new();
        engine.setup_draft("4", "45", "freeform").unwrap();
        assert_eq!(engine.edit_pick_count("50").unwrap(), "Pick count is: 50");
        assert_eq!(
            engine.edit_pick_count("101"),
            Err(DraftError::InvalidParameters("edit_pick"))
        );
        assert_eq!(engine.edit_format("LEGACy").unwrap(), "Format is: legacy");
        assert_eq!(
            engine.edit_format("magical format"),
            Err(DraftError::InvalidParameters("edit_format"))
        );
        assert_eq!(engine.config().unwrap().format, Format::Legacy);
    }

    // --- join / leave / cancel ---

    #[test]
    fn join_then_leave_removes_all_player_state() {
        let mut engine = DraftEngine::new();
        engine.setup_draft("4", "45", "freeform").unwrap();
        engine.join(player(1)).unwrap();
        let before = engine.roster_size();

        assert_eq!(
            engine.join(player(2)).unwrap(),
            "player_2 has been added to the draft."
        );
        assert!(engine.picks_of(&player(2).id).is_some());
        assert!(engine.prepicks_of(&player(2).id).is_some());

        assert_eq!(engine.leave(&player(2)).unwrap(), "player_2 has left the draft.");
        assert_eq!(engine.roster_size(), before);
        assert!(engine.picks_of(&player(2).id).is_none());
        assert!(engine.prepicks_of(&player(2).id).is_none());
    }

    #[test]
    fn join_rejections() {
        let mut engine = DraftEngine::new();
        assert_eq!(engine.join(player(1)), Err(DraftError::NotSetup(Action::Join)));

        engine.setup_draft("1", "45", "freeform").unwrap();
        engine.join(player(1)).unwrap();
        assert_eq!(
            engine.join(player(1)),
            Err(DraftError::AlreadyJoined("player_1".into()))
        );
        assert_eq!(engine.join(player(2)), Err(DraftError::RosterFull));

        engine.fire().unwrap();
        assert_eq!(
            engine.join(player(3)),
            Err(DraftError::AlreadyFired(Action::Join))
        );
    }

    #[test]
    fn roster_matches_on_id_not_display_name() {
        let mut engine = DraftEngine::new();
        engine.setup_draft("2", "45", "freeform").unwrap();
        engine.join(Player::new("alice", "1")).unwrap();

        let renamed = Player::new("alicia", "1");
        assert_eq!(
            engine.join(renamed.clone()),
            Err(DraftError::AlreadyJoined("alicia".into()))
        );
        // Same display name, different account: a separate player.
        engine.join(Player::new("alice", "2")).unwrap();

        assert_eq!(engine.leave(&renamed).unwrap(), "alice has left the draft.");
        assert_eq!(engine.roster_size(), 1);
    }

    #[test]
    fn leave_rejections() {
        let mut engine = full_engine(2);
        assert_eq!(
            engine.leave(&player(9)).unwrap_err().to_string(),
            "You cannot leave the draft if you never joined."
        );
        engine.fire().unwrap();
        assert_eq!(
            engine.leave(&player(1)),
            Err(DraftError::AlreadyFired(Action::Leave))
        );
    }

    #[test]
    fn cancel_requires_empty_roster() {
        let mut engine = DraftEngine::new();
        assert_eq!(engine.cancel(), Err(DraftError::NotSetup(Action::Cancel)));

        engine.setup_draft("2", "45", "freeform").unwrap();
        engine.join(player(1)).unwrap();
        assert_eq!(engine.cancel(), Err(DraftError::PlayersStillJoined));

        engine.leave(&player(1)).unwrap();
        assert_eq!(
            engine.cancel().unwrap(),
            "The draft setup has been cancelled."
        );
        assert!(!engine.is_setup());
        assert_eq!(engine.info().to_string(), "The draft has not been set up.");
    }

    // --- info ---

    #[test]
    fn info_lists_config_and_players() {
        let mut engine = DraftEngine::new();
        engine.setup_draft("4", "45", "freeform").unwrap();
        engine.join(Player::new("tester", "1")).unwrap();
        assert_eq!(
            engine.info().to_string(),
            "```player_count is: 4\n\
             pick_count is: 45\n\
             draft_fired status is: false\n\
             format is: freeform\n\
             Current joined drafters are:\n\
             tester\n\
             ```"
        );
    }

    // --- fire ---

    #[test]
    fn fire_rejections() {
        let mut engine = DraftEngine::new();
        assert_eq!(engine.fire(), Err(DraftError::NotSetup(Action::Fire)));

        engine.setup_draft("3", "45", "freeform").unwrap();
        engine.join(player(1)).unwrap();
        assert_eq!(engine.fire(), Err(DraftError::NotFull));

        let mut engine = full_engine(3);
        engine.fire().unwrap();
        assert_eq!(engine.fire(), Err(DraftError::AlreadyFired(Action::Fire)));
    }

    #[test]
    fn fire_four_players_initializes_pipeline() {
        let mut engine = full_engine(4);
        let outcome = engine.fire_with_rng(&mut StdRng::seed_from_u64(100)).unwrap();

        assert!(engine.is_fired());
        assert_eq!(engine.picks_remaining(), 180);
        assert_eq!(engine.active_index(), 0);
        assert_eq!(engine.cursor(), SheetCursor { row: 2, column: 2 });
        assert_eq!(engine.movement().row_move, vec![0, 0, 0, 1, 0, 0, 0, 1]);
        assert_eq!(
            engine.movement().column_move,
            vec![1, 1, 1, 0, -1, -1, -1, 0]
        );
        assert_eq!(outcome.order.len(), 4);
        assert_eq!(outcome.pick_count, 45);
        assert_eq!(Some(&outcome.first), engine.active_player());
    }

    #[test]
    fn fire_produces_mirrored_snake_order_for_every_size() {
        for players in 1..=8 {
            let mut engine = full_engine(players);
            engine
                .fire_with_rng(&mut StdRng::seed_from_u64(players as u64))
                .unwrap();
            let order = engine.snake_order();
            assert_eq!(order.len(), 2 * players);
            for i in 0..order.len() {
                assert_eq!(order[i], order[2 * players - 1 - i]);
            }
        }
    }

    #[test]
    fn fire_shuffle_is_a_permutation_of_roster() {
        let mut engine = full_engine(6);
        let outcome = engine.fire_with_rng(&mut StdRng::seed_from_u64(3)).unwrap();
        let mut ids: Vec<_> = outcome.order.iter().map(|p| p.id.0.clone()).collect();
        ids.sort();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6"]);
    }

    #[test]
    fn fire_message_includes_sheet_link() {
        let mut engine = full_engine(2);
        let outcome = engine.fire().unwrap();
        let msg = outcome.message(Some("https://sheet.example"));
        assert!(msg.contains("Sheet is available here: https://sheet.example"));
        assert!(msg.ends_with(&format!("{} is up first.", outcome.first)));
    }

    // --- reset ---

    #[test]
    fn reset_is_idempotent() {
        let mut engine = full_engine(3);
        engine.fire().unwrap();
        engine.reset();
        let first = engine.clone();
        engine.reset();
        assert_eq!(engine, first);
        assert_eq!(engine, DraftEngine::default());
        assert!(!engine.is_setup());
        assert!(!engine.is_fired());
        assert_eq!(engine.picks_remaining(), 0);
        assert_eq!(engine.cursor(), SheetCursor::default());
        assert!(engine.movement().is_empty());
    }
}
