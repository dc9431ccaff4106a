// Draft session actor: owns one engine plus its collaborators and applies
// chat commands to it one at a time.
//
// Per command: resolve the card (with a timeout) before touching the engine,
// run the engine operation, mirror placements to the sheet (best effort),
// then persist a snapshot.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use rotisserie_core::{CardInfo, DraftEngine, DraftError, Player};

use crate::config::Config;
use crate::db::{Database, Decklist};
use crate::lookup::{CardLookup, LookupError};
use crate::protocol::{help_text, Command};
use crate::sheet::SheetSink;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Per-table settings the session needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub draft_key: String,
    pub sheet_link: Option<String>,
    pub lookup_timeout: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            draft_key: config.draft_key.clone(),
            sheet_link: config.sheet.link().map(String::from),
            lookup_timeout: Duration::from_secs(config.lookup.timeout_secs),
        }
    }
}

/// What the session sends back for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub message: String,
    /// Filled in only when the command finished the draft.
    pub decklists: Vec<Decklist>,
}

impl Reply {
    fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            decklists: Vec::new(),
        }
    }
}

/// A command waiting in the session queue.
pub struct SessionRequest {
    pub author: Player,
    pub command: Command,
    pub reply: oneshot::Sender<Reply>,
}

#[derive(Debug, Error)]
enum CommandFailure {
    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error("Card lookup is unavailable right now. Please try again.")]
    Lookup(#[from] LookupError),
}

// ---------------------------------------------------------------------------
// DraftSession
// ---------------------------------------------------------------------------

pub struct DraftSession {
    engine: DraftEngine,
    lookup: Arc<dyn CardLookup>,
    sheet: Arc<dyn SheetSink>,
    db: Database,
    settings: SessionSettings,
}

impl DraftSession {
    pub fn new(
        db: Database,
        lookup: Arc<dyn CardLookup>,
        sheet: Arc<dyn SheetSink>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            engine: DraftEngine::new(),
            lookup,
            sheet,
            db,
            settings,
        }
    }

    pub fn engine(&self) -> &DraftEngine {
        &self.engine
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Apply one command and produce the reply. Never fails: rejected
    /// commands come back as a reply explaining why.
    pub async fn handle(&mut self, author: &Player, command: Command) -> Reply {
        let mutating = command.is_mutating();
        match self.execute(author, command).await {
            Ok(reply) => {
                if mutating {
                    self.persist();
                }
                reply
            }
            Err(e) => {
                if let CommandFailure::Lookup(err) = &e {
                    warn!("Card lookup failed for {}: {}", author.name, err);
                } else {
                    debug!("Rejected command from {}: {}", author.name, e);
                }
                Reply::text(e.to_string())
            }
        }
    }

    async fn execute(&mut self, author: &Player, command: Command) -> Result<Reply, CommandFailure> {
        let message = match command {
            Command::Setup {
                player_count,
                pick_count,
                format,
            } => self.engine.setup_draft(&player_count, &pick_count, &format)?,
            Command::EditPlayer(n) => self.engine.edit_player_count(&n)?,
            Command::EditPick(n) => self.engine.edit_pick_count(&n)?,
            Command::EditFormat(f) => self.engine.edit_format(&f)?,
            Command::Join => self.engine.join(author.clone())?,
            Command::Leave => self.engine.leave(author)?,
            Command::Cancel => self.engine.cancel()?,
            Command::Info => self.engine.info().to_string(),
            Command::Fire => self.fire().await?,
            Command::Pick(words) => return self.pick(author, &words).await,
            Command::PrePick(words) => {
                let card = self.resolve(&words).await?;
                self.engine.pre_pick(author, &card)?
            }
            Command::CancelPrePick(words) => {
                let card = self.resolve(&words).await?;
                self.engine.cancel_pre_pick(author, &card)?
            }
            Command::GetPrePicks => self.engine.list_pre_picks(author)?,
            Command::Reset => {
                self.reset().await;
                "The draft has been reset.".to_string()
            }
            Command::Help(topic) => help_text(topic.as_deref()).to_string(),
            Command::Card(words) => {
                let card = self.resolve(&words).await?;
                let name = card.name().ok_or(DraftError::CardNotFound)?;
                match card.image_url() {
                    Some(url) => format!("{name}\n{url}"),
                    None => name.to_string(),
                }
            }
            Command::Legal(words) => self
                .resolve(&words)
                .await?
                .legality_report()
                .ok_or(DraftError::CardNotFound)?,
        };
        Ok(Reply::text(message))
    }

    /// Look the card up before any engine mutation, bounded by the configured
    /// timeout.
    async fn resolve(&self, words: &[String]) -> Result<CardInfo, LookupError> {
        let timeout = self.settings.lookup_timeout;
        tokio::time::timeout(timeout, self.lookup.lookup(words))
            .await
            .map_err(|_| LookupError::Timeout(timeout))?
    }

    async fn fire(&mut self) -> Result<String, DraftError> {
        let outcome = self.engine.fire()?;
        let names: Vec<String> = outcome.order.iter().map(|p| p.name.clone()).collect();
        if let Err(e) = self.sheet.initialize(&names, outcome.pick_count).await {
            warn!("Sheet initialization failed: {}", e);
        }
        Ok(outcome.message(self.settings.sheet_link.as_deref()))
    }

    /// Redraw the sheet from engine state: header, then every pick made so
    /// far. Needed after recovery, since sinks start out empty.
    pub async fn rebuild_sheet(&self) {
        let Some(config) = self.engine.config().filter(|_| self.engine.is_fired()) else {
            return;
        };
        let names: Vec<String> = self.engine.players().map(|p| p.name.clone()).collect();
        if let Err(e) = self.sheet.initialize(&names, config.pick_count).await {
            warn!("Sheet rebuild failed: {}", e);
            return;
        }
        let history = self.engine.pick_history();
        for placement in &history {
            if let Err(e) = self
                .sheet
                .place(&placement.card, placement.row, placement.column)
                .await
            {
                warn!("Sheet rebuild failed at ({}, {}): {}", placement.row, placement.column, e);
                return;
            }
        }
        info!("Sheet rebuilt with {} picks", history.len());
    }

    async fn pick(&mut self, author: &Player, words: &[String]) -> Result<Reply, CommandFailure> {
        let card = self.resolve(words).await?;
        let outcome = self.engine.pick(author, &card)?;

        for placement in outcome.placements() {
            if let Err(e) = self
                .sheet
                .place(&placement.card, placement.row, placement.column)
                .await
            {
                warn!(
                    "Sheet write failed for {} at ({}, {}): {}",
                    placement.card, placement.row, placement.column, e
                );
            }
        }

        if !outcome.is_finished() {
            return Ok(Reply::text(outcome.to_string()));
        }

        let decklists: Vec<Decklist> = self
            .engine
            .decklists()
            .into_iter()
            .map(|(player, list)| Decklist { player, list })
            .collect();
        if let Err(e) = self.db.record_finished(&self.settings.draft_key, &decklists) {
            error!("Failed to archive finished draft: {:#}", e);
        }
        self.reset().await;

        Ok(Reply {
            message: format!("{outcome}\n\nThank you all for playing! Come back soon."),
            decklists,
        })
    }

    async fn reset(&mut self) {
        self.engine.reset();
        if let Err(e) = self.sheet.clear().await {
            warn!("Sheet clear failed: {}", e);
        }
    }

    /// Save the engine after a successful mutating command. An idle table has
    /// nothing to recover, so its row is dropped instead.
    fn persist(&self) {
        let key = &self.settings.draft_key;
        let result = if self.engine.is_setup() {
            self.db.save_snapshot(key, &self.engine.snapshot())
        } else {
            self.db.clear_snapshot(key)
        };
        if let Err(e) = result {
            error!("Failed to persist draft snapshot: {:#}", e);
        }
    }

    /// Spawn the session as a task and return a handle for sending commands.
    pub fn spawn(self, queue: usize) -> (SessionHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(queue);
        let task = tokio::spawn(run(self, rx));
        (SessionHandle { tx }, task)
    }
}

// ---------------------------------------------------------------------------
// Crash recovery
// ---------------------------------------------------------------------------

/// Restore the engine from the last saved snapshot, if any. Returns `true`
/// when a snapshot was restored.
pub fn recover_from_db(session: &mut DraftSession) -> anyhow::Result<bool> {
    let key = session.settings.draft_key.clone();
    let Some(stored) = session.db.load_snapshot(&key)? else {
        info!("No saved snapshot for draft_key={}, starting fresh", key);
        return Ok(false);
    };

    let engine = DraftEngine::restore(stored.snapshot)
        .with_context(|| format!("saved snapshot for {key} is inconsistent"))?;
    info!(
        "Crash recovery: restored draft_key={} saved at {} (setup={}, fired={}, {} picks remaining)",
        key,
        stored.saved_at,
        engine.is_setup(),
        engine.is_fired(),
        engine.picks_remaining()
    );
    session.engine = engine;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Actor loop
// ---------------------------------------------------------------------------

/// Process queued commands until every handle is dropped.
pub async fn run(mut session: DraftSession, mut rx: mpsc::Receiver<SessionRequest>) {
    info!("Draft session {} started", session.settings.draft_key);
    session.rebuild_sheet().await;
    while let Some(request) = rx.recv().await {
        let reply = session.handle(&request.author, request.command).await;
        if request.reply.send(reply).is_err() {
            debug!("Requester went away before the reply was sent");
        }
    }
    info!("Draft session {} stopped", session.settings.draft_key);
}

/// Cloneable sender side of a running session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionRequest>,
}

impl SessionHandle {
    pub async fn send(&self, author: Player, command: Command) -> anyhow::Result<Reply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionRequest {
                author,
                command,
                reply: reply_tx,
            })
            .await
            .context("draft session is not running")?;
        reply_rx.await.context("draft session dropped the command")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::StaticLookup;
    use crate::sheet::MemorySheet;
    use rotisserie_core::{Format, Legality};

    fn settings() -> SessionSettings {
        SessionSettings {
            draft_key: "test".into(),
            sheet_link: None,
            lookup_timeout: Duration::from_secs(5),
        }
    }

    fn lookup() -> StaticLookup {
        let mut lookup = StaticLookup::new();
        for name in ["Island", "Mountain", "Forest", "Swamp", "Plains", "Gush"] {
            lookup = lookup.with_card(CardInfo::named(name).with_legality(Format::Modern, Legality::Legal));
        }
        lookup.with_card(CardInfo::named("Black Lotus"))
    }

    fn session_with(sheet: Arc<MemorySheet>, lookup: StaticLookup) -> DraftSession {
        let db = Database::open(":memory:").unwrap();
        DraftSession::new(db, Arc::new(lookup), sheet, settings())
    }

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn alice() -> Player {
        Player::new("alice", "1")
    }

    fn bob() -> Player {
        Player::new("bob", "2")
    }

    async fn fired_session(sheet: Arc<MemorySheet>) -> DraftSession {
        let mut session = session_with(sheet, lookup());
        let setup = Command::Setup {
            player_count: "2".into(),
            pick_count: "5".into(),
            format: "modern".into(),
        };
        session.handle(&alice(), setup).await;
        session.handle(&alice(), Command::Join).await;
        session.handle(&bob(), Command::Join).await;
        session.handle(&alice(), Command::Fire).await;
        session
    }

    fn active(session: &DraftSession) -> Player {
        session.engine().active_player().cloned().unwrap()
    }

    #[tokio::test]
    async fn fire_initializes_sheet() {
        let sheet = Arc::new(MemorySheet::new());
        let session = fired_session(sheet.clone()).await;
        assert!(session.engine().is_fired());

        let grid = sheet.grid();
        assert_eq!(grid.rows().len(), 6);
        assert_eq!(grid.get(1, 1), Some("Players"));
        let mut names = vec![grid.get(1, 2).unwrap(), grid.get(1, 3).unwrap()];
        names.sort();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn pick_places_card_and_persists_snapshot() {
        let sheet = Arc::new(MemorySheet::new());
        let mut session = fired_session(sheet.clone()).await;
        let first = active(&session);

        let reply = session.handle(&first, Command::Pick(words("island"))).await;
        assert!(reply.message.starts_with(&format!("{} has chosen Island.", first.name)));
        assert_eq!(sheet.grid().get(2, 2), Some("Island"));

        let stored = session.db().load_snapshot("test").unwrap().unwrap();
        assert_eq!(stored.snapshot, session.engine().snapshot());
    }

    #[tokio::test]
    async fn rejected_commands_leave_state_untouched() {
        let sheet = Arc::new(MemorySheet::new());
        let mut session = fired_session(sheet.clone()).await;
        let first = active(&session);
        let second = if first == alice() { bob() } else { alice() };
        let before = session.engine().clone();

        let reply = session.handle(&second, Command::Pick(words("island"))).await;
        assert_eq!(reply.message, DraftError::NotYourTurn.to_string());
        let reply = session.handle(&first, Command::Pick(words("no such card"))).await;
        assert_eq!(reply.message, "This card does not exist.");
        let reply = session.handle(&first, Command::Pick(words("black lotus"))).await;
        assert_eq!(reply.message, "This card is not legal in modern.");

        assert_eq!(session.engine(), &before);
        assert_eq!(sheet.grid().get(2, 2), Some(""));
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_timeout_aborts_without_mutation() {
        let sheet = Arc::new(MemorySheet::new());
        let slow = lookup().with_delay(Duration::from_secs(60));
        let mut session = session_with(sheet, slow);
        session
            .handle(
                &alice(),
                Command::Setup {
                    player_count: "1".into(),
                    pick_count: "5".into(),
                    format: "freeform".into(),
                },
            )
            .await;
        session.handle(&alice(), Command::Join).await;
        session.handle(&alice(), Command::Fire).await;
        let before = session.engine().clone();

        let reply = session.handle(&alice(), Command::Pick(words("island"))).await;
        assert_eq!(
            reply.message,
            "Card lookup is unavailable right now. Please try again."
        );
        assert_eq!(session.engine(), &before);
    }

    #[tokio::test]
    async fn card_and_legal_answer_without_a_draft() {
        let lookup = lookup().with_card(
            CardInfo::named("Ponder")
                .with_image("https://img.example/ponder.jpg")
                .with_legality(Format::Legacy, Legality::Legal)
                .with_legality(Format::Standard, Legality::NotLegal),
        );
        let mut session = session_with(Arc::new(MemorySheet::new()), lookup);

        let reply = session.handle(&alice(), Command::Card(words("ponder"))).await;
        assert_eq!(reply.message, "Ponder\nhttps://img.example/ponder.jpg");
        let reply = session.handle(&alice(), Command::Card(words("gush"))).await;
        assert_eq!(reply.message, "Gush");
        let reply = session.handle(&alice(), Command::Legal(words("ponder"))).await;
        assert_eq!(
            reply.message,
            "Ponder Legality\n```\nlegacy: legal\nstandard: not_legal\n```"
        );
        let reply = session.handle(&alice(), Command::Legal(words("tarmogoyf"))).await;
        assert_eq!(reply.message, "This card does not exist.");

        assert!(!session.engine().is_setup());
        assert!(session.db().load_snapshot("test").unwrap().is_none());
    }

    #[tokio::test]
    async fn sheet_failures_do_not_block_picks() {
        let sheet = Arc::new(MemorySheet::failing());
        let mut session = fired_session(sheet).await;
        let first = active(&session);
        session.handle(&first, Command::Pick(words("gush"))).await;
        assert_eq!(session.engine().picks_of(&first.id).unwrap(), &["Gush"]);
    }

    #[tokio::test]
    async fn finishing_returns_decklists_and_resets() {
        let sheet = Arc::new(MemorySheet::new());
        let mut session = session_with(sheet.clone(), lookup());
        session
            .handle(
                &alice(),
                Command::Setup {
                    player_count: "1".into(),
                    pick_count: "5".into(),
                    format: "freeform".into(),
                },
            )
            .await;
        session.handle(&alice(), Command::Join).await;
        session.handle(&alice(), Command::Fire).await;

        let mut reply = Reply::text("");
        for card in ["island", "mountain", "forest", "swamp", "plains"] {
            reply = session.handle(&alice(), Command::Pick(words(card))).await;
        }

        assert!(reply.message.contains("Congrats! The draft has been finished!"));
        assert_eq!(reply.decklists.len(), 1);
        assert_eq!(
            reply.decklists[0].list,
            "1 Island\n1 Mountain\n1 Forest\n1 Swamp\n1 Plains\n"
        );
        assert!(!session.engine().is_setup());
        assert!(sheet.grid().is_empty());
        assert_eq!(session.db().finished_drafts("test").unwrap().len(), 1);
        assert!(session.db().load_snapshot("test").unwrap().is_none());
    }

    #[tokio::test]
    async fn recover_restores_saved_engine() {
        let sheet = Arc::new(MemorySheet::new());
        let mut session = fired_session(sheet.clone()).await;
        let first = active(&session);
        session.handle(&first, Command::Pick(words("gush"))).await;
        let expected = session.engine().clone();

        let DraftSession { db, .. } = session;
        let mut restarted = DraftSession::new(db, Arc::new(lookup()), sheet, settings());
        assert!(recover_from_db(&mut restarted).unwrap());
        assert_eq!(restarted.engine(), &expected);
    }

    #[tokio::test]
    async fn recovered_session_redraws_a_fresh_sheet() {
        let old_sheet = Arc::new(MemorySheet::new());
        let mut session = fired_session(old_sheet.clone()).await;
        let first = active(&session);
        session.handle(&first, Command::Pick(words("gush"))).await;
        let second = active(&session);
        session.handle(&second, Command::Pick(words("island"))).await;

        let DraftSession { db, .. } = session;
        let new_sheet = Arc::new(MemorySheet::new());
        let mut restarted = DraftSession::new(db, Arc::new(lookup()), new_sheet.clone(), settings());
        assert!(recover_from_db(&mut restarted).unwrap());
        restarted.rebuild_sheet().await;
        assert_eq!(new_sheet.grid(), old_sheet.grid());

        let up = active(&restarted);
        restarted.handle(&up, Command::Pick(words("forest"))).await;
        assert_eq!(new_sheet.grid().get(3, 3), Some("Forest"));
    }

    #[tokio::test]
    async fn rebuild_is_a_no_op_before_fire() {
        let sheet = Arc::new(MemorySheet::new());
        let mut session = session_with(sheet.clone(), lookup());
        session
            .handle(
                &alice(),
                Command::Setup {
                    player_count: "2".into(),
                    pick_count: "5".into(),
                    format: "modern".into(),
                },
            )
            .await;
        session.rebuild_sheet().await;
        assert!(sheet.grid().is_empty());
    }

    #[tokio::test]
    async fn recover_without_snapshot_starts_fresh() {
        let mut session = session_with(Arc::new(MemorySheet::new()), lookup());
        assert!(!recover_from_db(&mut session).unwrap());
        assert!(!session.engine().is_setup());
    }

    #[tokio::test]
    async fn actor_serializes_commands() {
        let session = session_with(Arc::new(MemorySheet::new()), lookup());
        let (handle, task) = session.spawn(8);

        let reply = handle
            .send(
                alice(),
                Command::Setup {
                    player_count: "2".into(),
                    pick_count: "5".into(),
                    format: "modern".into(),
                },
            )
            .await
            .unwrap();
        assert!(reply.message.starts_with("The draft has been set up."));

        let join = handle.send(alice(), Command::Join).await.unwrap();
        assert_eq!(join.message, "alice has been added to the draft.");
        let info = handle.send(bob(), Command::Info).await.unwrap();
        assert!(info.message.contains("alice"));

        drop(handle);
        task.await.unwrap();
    }
}
