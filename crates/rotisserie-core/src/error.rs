// Validation failures returned by every engine operation.

use thiserror::Error;

/// The engine operation a phase or membership failure was raised from.
///
/// Chat users see a different sentence depending on which command they ran,
/// so phase errors carry the action rather than a pre-rendered string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Setup,
    Edit,
    Join,
    Leave,
    Cancel,
    Fire,
    Pick,
    PrePick,
    CancelPrePick,
    ListPrePicks,
}

impl Action {
    fn already_fired_message(&self) -> &'static str {
        match self {
            Action::Setup => {
                "The draft has already fired. Please wait for it to be finished before starting another draft."
            }
            Action::Edit => "The draft has already fired. It cannot be edited.",
            Action::Join => "The draft has already fired and cannot be joined.",
            Action::Leave => "The draft has already fired and must be finished.",
            Action::Cancel => "You cannot cancel a draft that has fired.",
            _ => "The draft has already fired.",
        }
    }

    fn not_setup_message(&self) -> &'static str {
        match self {
            Action::Edit => "The draft has not been set up. It cannot be edited.",
            Action::Cancel => "You cannot cancel a draft that's not set up.",
            _ => "The draft has not been set up.",
        }
    }

    fn not_fired_message(&self) -> &'static str {
        match self {
            Action::Pick => "You cannot make picks until the draft has fired.",
            Action::PrePick => "You cannot make pre-picks until the draft has fired.",
            Action::CancelPrePick => "You cannot cancel pre-picks until the draft has fired.",
            Action::ListPrePicks => "No pre-picks as draft has not fired.",
            _ => "The draft has not fired.",
        }
    }

    fn not_in_draft_message(&self) -> &'static str {
        match self {
            Action::PrePick => "You are not in this draft and cannot make pre-picks.",
            Action::CancelPrePick => "You are not in this draft and cannot cancel pre-picks.",
            Action::ListPrePicks => "You are not in this draft and have no pre-picks.",
            Action::Leave => "You cannot leave the draft if you never joined.",
            _ => "You are not in this draft.",
        }
    }
}

/// A rejected command. Validation never mutates engine state, so callers can
/// retry with corrected input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("{}", .0.already_fired_message())]
    AlreadyFired(Action),

    #[error("{}", .0.not_setup_message())]
    NotSetup(Action),

    #[error("{}", .0.not_fired_message())]
    NotFired(Action),

    #[error("{}", .0.not_in_draft_message())]
    NotInDraft(Action),

    #[error("The draft setup has already been completed. To modify the setup use the edit commands.")]
    AlreadySetup,

    /// Out-of-range or unparseable parameter. Carries the help topic for the
    /// command that was used.
    #[error("Invalid parameters. Please use the '!help {0}' command for details.")]
    InvalidParameters(&'static str),

    #[error("The draft currently has too many players to go to {requested} players. Please have players leave before making the edit.")]
    TooManyPlayers { requested: usize },

    #[error("{0} has already been added to the draft.")]
    AlreadyJoined(String),

    #[error("The draft is full. Please join the next draft!")]
    RosterFull,

    #[error("All players must leave the draft for it to be cancelled.")]
    PlayersStillJoined,

    #[error("Please ensure that the draft is full.")]
    NotFull,

    #[error("The draft has been finished. No more picks can be made.")]
    DraftFinished,

    #[error("You are not the active drafter. Please wait until it is your turn.")]
    NotYourTurn,

    #[error("This card does not exist.")]
    CardNotFound,

    #[error("That card has already been chosen. Please try again.")]
    AlreadyChosen,

    #[error("This card is not legal in {format}.")]
    NotLegal { format: String },

    #[error("You have already pre-picked this card. Please try again.")]
    AlreadyPrePicked,

    #[error("Cannot remove cards you have not pre-picked.")]
    NotPrePicked,
}
