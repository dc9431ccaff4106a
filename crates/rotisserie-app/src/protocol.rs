// Chat command parsing and the help text behind `!help <command>`.

use thiserror::Error;

use rotisserie_core::Player;

/// A parsed chat command. Arguments stay as raw words; the engine does its
/// own validation so every bad input gets the same user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Setup {
        player_count: String,
        pick_count: String,
        format: String,
    },
    EditPlayer(String),
    EditPick(String),
    EditFormat(String),
    Join,
    Leave,
    Fire,
    Info,
    Cancel,
    Pick(Vec<String>),
    PrePick(Vec<String>),
    CancelPrePick(Vec<String>),
    GetPrePicks,
    Reset,
    Help(Option<String>),
    /// Show a card's canonical name and image.
    Card(Vec<String>),
    /// Show a card's per-format legality.
    Legal(Vec<String>),
}

impl Command {
    /// Whether the command can change engine state (and so needs a snapshot).
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Command::Info
                | Command::GetPrePicks
                | Command::Help(_)
                | Command::Card(_)
                | Command::Legal(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("not a command")]
    NotACommand,

    #[error("Unknown command: !{0}. Use !help to list commands.")]
    Unknown(String),

    #[error("Invalid parameters. Please use the '!help {0}' command for details.")]
    MissingArguments(&'static str),
}

/// Parse a `!command arg...` line. Command names accept the chat bot's
/// aliases and are case-insensitive.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let rest = line.trim().strip_prefix('!').ok_or(CommandError::NotACommand)?;
    let mut words = rest.split_whitespace();
    let name = words.next().ok_or(CommandError::NotACommand)?;
    let args: Vec<String> = words.map(String::from).collect();

    let single = |help: &'static str| -> Result<String, CommandError> {
        match args.as_slice() {
            [arg] => Ok(arg.clone()),
            _ => Err(CommandError::MissingArguments(help)),
        }
    };
    let card = |help: &'static str| -> Result<Vec<String>, CommandError> {
        if args.is_empty() {
            Err(CommandError::MissingArguments(help))
        } else {
            Ok(args.clone())
        }
    };

    let lowered = name.to_lowercase();
    let canonical = canonical_name(&lowered).ok_or_else(|| CommandError::Unknown(lowered.clone()))?;
    let command = match canonical {
        "setup" => match args.as_slice() {
            [players, picks, format] => Command::Setup {
                player_count: players.clone(),
                pick_count: picks.clone(),
                format: format.clone(),
            },
            _ => return Err(CommandError::MissingArguments("setup")),
        },
        "edit_player" => Command::EditPlayer(single("edit_player")?),
        "edit_pick" => Command::EditPick(single("edit_pick")?),
        "edit_format" => Command::EditFormat(single("edit_format")?),
        "join" => Command::Join,
        "leave" => Command::Leave,
        "fire" => Command::Fire,
        "info" => Command::Info,
        "cancel" => Command::Cancel,
        "reset" => Command::Reset,
        "pick" => Command::Pick(card("pick")?),
        "pre_pick" => Command::PrePick(card("pre_pick")?),
        "cancel_pre_pick" => Command::CancelPrePick(card("cancel_pre_pick")?),
        "get_pre_picks" => Command::GetPrePicks,
        "card" => Command::Card(card("card")?),
        "legal" => Command::Legal(card("legal")?),
        "help" => Command::Help(args.first().map(|a| a.to_lowercase())),
        _ => return Err(CommandError::Unknown(lowered)),
    };
    Ok(command)
}

/// Split a console line of the form `name#id: !command args` into its
/// author and the command text. Returns `None` when the prefix is malformed.
pub fn parse_chat_line(line: &str) -> Option<(Player, &str)> {
    let (author, text) = line.split_once(':')?;
    let (name, id) = author.trim().split_once('#')?;
    let (name, id) = (name.trim(), id.trim());
    if name.is_empty() || id.is_empty() {
        return None;
    }
    Some((Player::new(name, id), text.trim()))
}

/// Map a lowercased command name or alias to its canonical name.
fn canonical_name(name: &str) -> Option<&'static str> {
    let canonical = match name {
        "setup" => "setup",
        "edit_player" => "edit_player",
        "edit_pick" => "edit_pick",
        "edit_format" => "edit_format",
        "join" => "join",
        "leave" => "leave",
        "fire" => "fire",
        "info" => "info",
        "cancel" => "cancel",
        "reset" => "reset",
        "help" => "help",
        "card" => "card",
        "legal" => "legal",
        "pick" | "p" => "pick",
        "pre_pick" | "prepick" | "pp" => "pre_pick",
        "cancel_pre_pick" | "cancelprepick" | "cancel_prepick" | "cpp" => "cancel_pre_pick",
        "get_pre_picks" | "get_prepicks" | "getprepicks" | "gpp" => "get_pre_picks",
        _ => return None,
    };
    Some(canonical)
}

/// Usage text for `!help [topic]`. Topics accept the same aliases as the
/// commands themselves.
pub fn help_text(topic: Option<&str>) -> &'static str {
    let topic = match topic {
        None => None,
        Some(t) => match canonical_name(&t.trim_start_matches('!').to_lowercase()) {
            Some(name) => Some(name),
            None => return "No command found.",
        },
    };
    match topic {
        None => {
            "Commands: !setup, !edit_player, !edit_pick, !edit_format, !join, !leave, \
             !info, !cancel, !fire, !pick, !pre_pick, !cancel_pre_pick, !get_pre_picks, \
             !reset, !card, !legal. Use !help <command> for details."
        }
        Some("setup") => {
            "!setup <players> <picks> <format>: start a new draft. Players must be 1-8, \
             picks 5-100, and the format a card format such as modern, or freeform."
        }
        Some("edit_player") => "!edit_player <players>: change the player count (1-8) before the draft fires.",
        Some("edit_pick") => "!edit_pick <picks>: change the pick count (5-100) before the draft fires.",
        Some("edit_format") => "!edit_format <format>: change the format before the draft fires.",
        Some("join") => "!join: take a seat in the draft.",
        Some("leave") => "!leave: give up your seat before the draft fires.",
        Some("info") => "!info: show the draft settings and who has joined.",
        Some("cancel") => "!cancel: cancel a draft nobody has joined.",
        Some("fire") => "!fire: randomize seating and start picking once the draft is full.",
        Some("pick") => "!pick <card name>: draft a card on your turn.",
        Some("pre_pick") => {
            "!pre_pick <card name>: queue a card to be drafted automatically on your turn."
        }
        Some("cancel_pre_pick") => "!cancel_pre_pick <card name>: remove a card from your pre-pick queue.",
        Some("get_pre_picks") => "!get_pre_picks: list your pre-pick queue.",
        Some("reset") => "!reset: clear the draft and the sheet.",
        Some("help") => "!help [command]: list commands, or show how to use one.",
        Some("card") => "!card <card name>: show the card's name and image.",
        Some("legal") => "!legal <card name>: show the card's legality in every format.",
        Some(_) => "No command found.",
    }
}
