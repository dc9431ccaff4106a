// Rotisserie draft entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, stdout carries the chat replies)
// 2. Load config
// 3. Open database
// 4. Build the card lookup and sheet mirror
// 5. Create the session and run crash recovery
// 6. Spawn the session task (redraws the sheet from recovered state)
// 7. Read `name#id: !command` lines from stdin until EOF
// 8. Cleanup on exit

use std::path::Path;
use std::sync::Arc;

use rotisserie_app::app::{self, DraftSession, SessionSettings};
use rotisserie_app::config;
use rotisserie_app::db::{self, Decklist};
use rotisserie_app::lookup::ScryfallClient;
use rotisserie_app::protocol::{self, CommandError};
use rotisserie_app::sheet::CsvSheet;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Rotisserie starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: draft_key={}, lookup={}, sheet={}",
        config.draft_key, config.lookup.base_url, config.sheet.path
    );

    // 3. Open database
    let db = db::Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    // 4. Collaborators
    let lookup = Arc::new(ScryfallClient::from_config(&config.lookup));
    let sheet = Arc::new(CsvSheet::new(&config.sheet.path));

    // 5. Session + crash recovery
    let mut session = DraftSession::new(db, lookup, sheet, SessionSettings::from_config(&config));
    match app::recover_from_db(&mut session) {
        Ok(true) => info!("Draft state restored from previous session"),
        Ok(false) => info!("Starting fresh draft session"),
        Err(e) => {
            error!("Crash recovery failed: {}", e);
            return Err(e.context("crash recovery failed"));
        }
    }

    // 6. Spawn the session task
    let (handle, session_task) = session.spawn(64);
    info!("Application ready, reading commands from stdin");

    // 7. Console loop
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let Some((author, text)) = protocol::parse_chat_line(&line) else {
            if !line.trim().is_empty() {
                println!("Expected `name#id: !command`.");
            }
            continue;
        };

        let command = match protocol::parse_command(text) {
            Ok(command) => command,
            Err(CommandError::NotACommand) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        let reply = handle.send(author, command).await?;
        println!("{}", reply.message);
        if !reply.decklists.is_empty() {
            write_decklists(Path::new("decks"), &reply.decklists);
        }
    }

    // 8. Cleanup: closing the handle stops the session loop
    drop(handle);
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), session_task).await;

    info!("Rotisserie shut down cleanly");
    Ok(())
}

/// Write one file per decklist and print where they went.
fn write_decklists(dir: &Path, decklists: &[Decklist]) {
    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!("Failed to create {}: {}", dir.display(), e);
        return;
    }
    for deck in decklists {
        let path = dir.join(deck.file_name());
        match std::fs::write(&path, &deck.list) {
            Ok(()) => println!("Decklist for {} written to {}", deck.player.name, path.display()),
            Err(e) => warn!("Failed to write {}: {}", path.display(), e),
        }
    }
}

/// Initialize tracing to log to a file (stdout is reserved for replies).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("rotisserie.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rotisserie=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
