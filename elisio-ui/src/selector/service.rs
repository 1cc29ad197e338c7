//! Selector service: the single task that owns `UiState`
//!
//! Handles send commands over an mpsc channel; the service applies them in
//! order, spawns the fetches they need and applies each fetch result only if
//! no newer request for the same slot has been issued since. Superseded
//! fetches are cancelled and their callers answered with
//! `Outcome::Superseded`.
//!
//! Random-verse restoration runs inline: the service walks the cascade on a
//! staging copy of the selection and commits it in one step, so nobody can
//! observe a half-restored selection.

use elisio_common::events::{EventBus, Slot, UiEvent};
use elisio_common::models::{Level, ScanResult, Selection, VerseMetadata, VerseType};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::cascade::{FetchOutcome, FetchRequest};
use crate::api::CorpusApi;
use crate::error::{ApiError, ApiResult, UiError, UiResult};
use crate::scan::{self, ScanQuery, ScanSource};
use crate::state::{Ticket, UiState};
use crate::verse::{validate_verse_number, VerseView};

const COMMAND_CAPACITY: usize = 64;

/// How a command ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// State updated
    Applied,
    /// A newer request for the same slot replaced this one
    Superseded,
    /// Input refused before any request was sent
    Rejected(String),
    /// The request failed; the state shows a transient error and `retry` may help
    Failed(String),
}

/// Target of a scan command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanTarget {
    /// The verse currently loaded under the selector
    CurrentVerse,
    Text(String),
}

type Reply = oneshot::Sender<Outcome>;

enum Command {
    LoadAuthors(Reply),
    Select { level: Level, selection: Selection, reply: Reply },
    EnterVerseNumber { input: String, reply: Reply },
    Scan { target: ScanTarget, reply: Reply },
    SetVerseType { verse_type: VerseType, reply: Reply },
    SetDictionary { enabled: bool, reply: Reply },
    RestoreRandomVerse(Reply),
    Retry(Reply),
    Snapshot(oneshot::Sender<UiState>),
}

/// Work that runs outside the service task
#[derive(Debug, Clone)]
enum Job {
    Cascade(FetchRequest),
    Verse { poem_id: i64, number: u32 },
    Scan(ScanQuery),
}

enum Fetched {
    Cascade(FetchOutcome),
    Verse { poem_id: i64, metadata: VerseMetadata },
    Scan(ScanResult),
}

impl Job {
    fn slot(&self) -> Slot {
        match self {
            Job::Cascade(request) => request.slot(),
            Job::Verse { .. } => Slot::Verse,
            Job::Scan(_) => Slot::Scan,
        }
    }

    async fn run(self, api: &dyn CorpusApi) -> ApiResult<Fetched> {
        match self {
            Job::Cascade(request) => request.run(api).await.map(Fetched::Cascade),
            Job::Verse { poem_id, number } => {
                let metadata = api.verse(poem_id, number).await?;
                Ok(Fetched::Verse { poem_id, metadata })
            }
            Job::Scan(query) => scan::dispatch(api, &query).await.map(Fetched::Scan),
        }
    }
}

/// What `retry` re-issues
#[derive(Debug, Clone)]
enum FailedRequest {
    Fetch(Job),
    RestoreRandomVerse,
}

struct Completion {
    ticket: Ticket,
    result: ApiResult<Fetched>,
}

struct InFlight {
    ticket: Ticket,
    token: CancellationToken,
    waiters: Vec<Reply>,
    job: Job,
}

/// Waits for the outcome of a submitted command
pub struct PendingOutcome(oneshot::Receiver<Outcome>);

impl PendingOutcome {
    pub async fn wait(self) -> UiResult<Outcome> {
        self.0.await.map_err(|_| UiError::ServiceStopped)
    }
}

/// Cloneable handle to a running selector service
///
/// The service stops once every handle has been dropped.
#[derive(Clone)]
pub struct SelectorHandle {
    commands: mpsc::Sender<Command>,
    event_bus: EventBus,
}

/// Start a selector service on the current tokio runtime
pub fn spawn_selector(api: Arc<dyn CorpusApi>, event_bus: EventBus) -> SelectorHandle {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (completion_tx, completion_rx) = mpsc::unbounded_channel();

    let service = SelectorService {
        api,
        state: UiState::new(),
        event_bus: event_bus.clone(),
        in_flight: HashMap::new(),
        last_failed: None,
        completions: completion_tx,
        shutdown: CancellationToken::new(),
    };
    tokio::spawn(service.run(command_rx, completion_rx));

    SelectorHandle { commands: command_tx, event_bus }
}

impl SelectorHandle {
    async fn submit(&self, make: impl FnOnce(Reply) -> Command) -> UiResult<PendingOutcome> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| UiError::ServiceStopped)?;
        Ok(PendingOutcome(rx))
    }

    /// Subscribe to UI events
    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.event_bus.subscribe()
    }

    /// Populate the author field
    pub async fn load_authors(&self) -> UiResult<Outcome> {
        self.submit(Command::LoadAuthors).await?.wait().await
    }

    /// Queue a selection change without waiting for its fetch
    ///
    /// Commands are applied in submission order, so a later call supersedes
    /// this one even if its own fetch is still running.
    pub async fn request_select(
        &self,
        level: Level,
        selection: Selection,
    ) -> UiResult<PendingOutcome> {
        self.submit(|reply| Command::Select { level, selection, reply }).await
    }

    /// Change a selection and wait until the next level is populated
    pub async fn select(&self, level: Level, selection: Selection) -> UiResult<Outcome> {
        self.request_select(level, selection).await?.wait().await
    }

    /// Validate typed verse-number input and load the verse
    pub async fn enter_verse_number(&self, input: &str) -> UiResult<Outcome> {
        let input = input.to_string();
        self.submit(|reply| Command::EnterVerseNumber { input, reply })
            .await?
            .wait()
            .await
    }

    pub async fn scan(&self, target: ScanTarget) -> UiResult<Outcome> {
        self.submit(|reply| Command::Scan { target, reply }).await?.wait().await
    }

    pub async fn set_verse_type(&self, verse_type: VerseType) -> UiResult<Outcome> {
        self.submit(|reply| Command::SetVerseType { verse_type, reply })
            .await?
            .wait()
            .await
    }

    pub async fn set_dictionary(&self, enabled: bool) -> UiResult<Outcome> {
        self.submit(|reply| Command::SetDictionary { enabled, reply })
            .await?
            .wait()
            .await
    }

    /// Load a random verse and move every field to it
    pub async fn restore_random_verse(&self) -> UiResult<Outcome> {
        self.submit(Command::RestoreRandomVerse).await?.wait().await
    }

    /// Re-issue the last failed request
    pub async fn retry(&self) -> UiResult<Outcome> {
        self.submit(Command::Retry).await?.wait().await
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> UiResult<UiState> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot(tx))
            .await
            .map_err(|_| UiError::ServiceStopped)?;
        rx.await.map_err(|_| UiError::ServiceStopped)
    }
}

struct SelectorService {
    api: Arc<dyn CorpusApi>,
    state: UiState,
    event_bus: EventBus,
    in_flight: HashMap<Slot, InFlight>,
    /// Cleared once the failed slot is invalidated or succeeds
    last_failed: Option<FailedRequest>,
    completions: mpsc::UnboundedSender<Completion>,
    /// Parent of every fetch's token
    shutdown: CancellationToken,
}

impl SelectorService {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        debug!("Selector service started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                Some(completion) = completions.recv() => self.complete(completion),
            }
        }
        self.shutdown.cancel();
        debug!("Selector service stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::LoadAuthors(reply) => {
                self.dispatch(Job::Cascade(FetchRequest::Authors), Some(reply));
            }
            Command::Select { level, selection, reply } => self.select(level, selection, reply),
            Command::EnterVerseNumber { input, reply } => self.enter_verse_number(&input, reply),
            Command::Scan { target, reply } => self.scan(target, reply),
            Command::SetVerseType { verse_type, reply } => {
                self.state.verse_type = verse_type;
                self.emit_scan_settings();
                let _ = reply.send(Outcome::Applied);
            }
            Command::SetDictionary { enabled, reply } => {
                self.state.dictionary = enabled;
                self.emit_scan_settings();
                let _ = reply.send(Outcome::Applied);
            }
            Command::RestoreRandomVerse(reply) => {
                let outcome = self.restore_random_verse().await;
                let _ = reply.send(outcome);
            }
            Command::Retry(reply) => match self.last_failed.take() {
                Some(FailedRequest::Fetch(job)) => {
                    info!(slot = ?job.slot(), "Retrying failed request");
                    self.dispatch(job, Some(reply));
                }
                Some(FailedRequest::RestoreRandomVerse) => {
                    info!("Retrying random verse");
                    let outcome = self.restore_random_verse().await;
                    let _ = reply.send(outcome);
                }
                None => {
                    let _ = reply.send(Outcome::Rejected("nothing to retry".to_string()));
                }
            },
            Command::Snapshot(reply) => {
                let _ = reply.send(self.state.clone());
            }
        }
    }

    fn select(&mut self, level: Level, selection: Selection, reply: Reply) {
        if let Selection::Id(id) = selection {
            if !self.state.selection.has_option(level, id) {
                let _ = reply.send(Outcome::Rejected(format!("no {} with id {}", level, id)));
                return;
            }
        }

        self.invalidate_below(level);
        let request = self.state.selection.select(level, selection);
        self.state.clear_verse();
        self.emit(UiEvent::SelectionChanged {
            level,
            selection,
            timestamp: chrono::Utc::now(),
        });

        match request {
            Some(request) => self.dispatch(Job::Cascade(request), Some(reply)),
            None => {
                let _ = reply.send(Outcome::Applied);
            }
        }
    }

    fn enter_verse_number(&mut self, input: &str, reply: Reply) {
        let max = self.state.selection.max_verse_number();
        let number = match validate_verse_number(input, max) {
            Ok(number) => number,
            Err(e) => {
                let message = e.to_string();
                debug!(input, %message, "Verse number rejected");
                self.state.warning = Some(message.clone());
                self.emit(UiEvent::VerseWarning {
                    message: message.clone(),
                    timestamp: chrono::Utc::now(),
                });
                let _ = reply.send(Outcome::Rejected(message));
                return;
            }
        };

        // A known maximum implies a selected poem
        let Some(poem_id) = self.state.selection.selected_poem() else {
            let _ = reply.send(Outcome::Rejected("Select a poem first".to_string()));
            return;
        };

        self.state.warning = None;
        self.state.verse_number = Some(number);
        self.dispatch(Job::Verse { poem_id, number }, Some(reply));
    }

    fn scan(&mut self, target: ScanTarget, reply: Reply) {
        let source = match target {
            ScanTarget::CurrentVerse => {
                match (self.state.selection.selected_poem(), self.state.verse_number) {
                    (Some(poem_id), Some(verse_number)) => {
                        ScanSource::Database { poem_id, verse_number }
                    }
                    _ => {
                        let _ = reply.send(Outcome::Rejected("Select a verse first".to_string()));
                        return;
                    }
                }
            }
            ScanTarget::Text(text) => ScanSource::Text(text),
        };

        match ScanQuery::new(source, self.state.verse_type, self.state.dictionary) {
            Ok(query) => self.dispatch(Job::Scan(query), Some(reply)),
            Err(e) => {
                let _ = reply.send(Outcome::Rejected(e.to_string()));
            }
        }
    }

    /// Spawn a job, superseding any request outstanding for its slot
    fn dispatch(&mut self, job: Job, reply: Option<Reply>) {
        let slot = job.slot();
        self.supersede(slot);

        let ticket = self.state.generations.issue(slot);
        let token = self.shutdown.child_token();
        let task_token = token.clone();
        let api = Arc::clone(&self.api);
        let completions = self.completions.clone();
        let task_job = job.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => {
                    debug!(?slot, "Fetch cancelled");
                }
                result = task_job.run(api.as_ref()) => {
                    let _ = completions.send(Completion { ticket, result });
                }
            }
        });

        self.in_flight.insert(
            slot,
            InFlight { ticket, token, waiters: reply.into_iter().collect(), job },
        );
    }

    /// Cancel the outstanding request for `slot`, if any
    fn supersede(&mut self, slot: Slot) {
        if let Some(previous) = self.in_flight.remove(&slot) {
            debug!(?slot, generation = ?previous.ticket.generation, "Superseding request");
            previous.token.cancel();
            for waiter in previous.waiters {
                let _ = waiter.send(Outcome::Superseded);
            }
        }
    }

    fn invalidate(&mut self, slot: Slot) {
        self.supersede(slot);
        self.state.generations.invalidate(slot);
        self.forget_failure(slot);
    }

    /// Drop a failed fetch of `slot` so `retry` cannot apply it to a newer selection
    fn forget_failure(&mut self, slot: Slot) {
        if let Some(FailedRequest::Fetch(job)) = &self.last_failed {
            if job.slot() == slot {
                self.last_failed = None;
            }
        }
    }

    /// Everything that depends on `level`'s selection, scan output included
    fn invalidate_below(&mut self, level: Level) {
        for descendant in level.descendants() {
            self.invalidate(Slot::Options(*descendant));
        }
        self.invalidate(Slot::MaxVerse);
        self.invalidate(Slot::Verse);
        self.invalidate(Slot::Scan);
        self.state.scan.clear();
    }

    fn complete(&mut self, completion: Completion) {
        let Completion { ticket, result } = completion;
        if !self.state.generations.is_current(&ticket) {
            debug!(slot = ?ticket.slot, "Discarding stale response");
            self.emit(UiEvent::StaleResponseDiscarded {
                slot: ticket.slot,
                timestamp: chrono::Utc::now(),
            });
            return;
        }
        let Some(in_flight) = self.in_flight.remove(&ticket.slot) else {
            return;
        };

        let outcome = match result {
            Ok(fetched) => {
                self.state.transient_error = None;
                self.forget_failure(ticket.slot);
                self.apply(fetched);
                Outcome::Applied
            }
            Err(e) => self.fail(ticket.slot, FailedRequest::Fetch(in_flight.job), e),
        };

        for waiter in in_flight.waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Record a failure; `retry` re-issues `request`
    fn fail(&mut self, slot: Slot, request: FailedRequest, error: ApiError) -> Outcome {
        let message = error.to_string();
        warn!(?slot, transient = error.is_transient(), "Request failed: {}", message);
        self.state.transient_error = Some(message.clone());
        self.last_failed = Some(request);
        self.emit(UiEvent::TransientError {
            slot,
            message: message.clone(),
            timestamp: chrono::Utc::now(),
        });
        Outcome::Failed(message)
    }

    fn apply(&mut self, fetched: Fetched) {
        let timestamp = chrono::Utc::now();
        match fetched {
            Fetched::Cascade(FetchOutcome::Options { level, options }) => {
                // New options reset this level, so nothing below may still be loading
                self.invalidate_below(level);
                self.state.selection.replace_options(level, options.clone());
                self.state.clear_verse();
                self.emit(UiEvent::OptionsReplaced { level, options, timestamp });
            }
            Fetched::Cascade(FetchOutcome::MaxVerse { poem_id, max_verse_number }) => {
                self.state.selection.set_max_verse_number(max_verse_number);
                self.emit(UiEvent::MaxVerseKnown { poem_id, max_verse_number, timestamp });
            }
            Fetched::Verse { poem_id, metadata } => {
                let view = VerseView::from_metadata(poem_id, &metadata);
                self.state.verse_type = view.verse_type;
                self.emit(UiEvent::VerseLoaded {
                    poem_id,
                    number: view.number,
                    text: view.text.clone(),
                    verse_type: view.verse_type,
                    timestamp,
                });
                self.state.verse = Some(view);
            }
            Fetched::Scan(result) => {
                self.state.scan.apply(&result);
                self.emit(UiEvent::ScanRendered { result, timestamp });
            }
        }
    }

    /// Walk the cascade to a random verse on a staging copy
    ///
    /// The live selection and its outstanding fetches are untouched unless
    /// the whole walk succeeds.
    async fn restore_random_verse(&mut self) -> Outcome {
        let metadata = match self.api.random_verse().await {
            Ok(metadata) => metadata,
            Err(e) => return self.fail(Slot::Verse, FailedRequest::RestoreRandomVerse, e),
        };
        let Some(path) = metadata.path() else {
            return Outcome::Failed("random verse came without its hierarchy".to_string());
        };
        info!(?path, verse = metadata.verse.number, "Restoring random verse");

        let mut staging = self.state.selection.clone();
        if staging.level(Level::Author).options.is_empty() {
            match FetchRequest::Authors.run(self.api.as_ref()).await {
                Ok(outcome) => staging.apply(outcome),
                Err(e) => {
                    return self.fail(Slot::Options(Level::Author), FailedRequest::RestoreRandomVerse, e)
                }
            }
        }

        for level in Level::ALL {
            let id = path.id_at(level);
            if !staging.has_option(level, id) {
                return Outcome::Failed(format!("{} {} is not offered by the server", level, id));
            }
            if let Some(request) = staging.select(level, Selection::Id(id)) {
                match request.run(self.api.as_ref()).await {
                    Ok(outcome) => staging.apply(outcome),
                    Err(e) => {
                        return self.fail(request.slot(), FailedRequest::RestoreRandomVerse, e)
                    }
                }
            }
        }

        // Nothing started before the restore may land afterwards
        self.invalidate(Slot::Options(Level::Author));
        self.invalidate_below(Level::Author);
        self.last_failed = None;

        let view = VerseView::from_metadata(path.poem, &metadata);
        self.state.selection = staging;
        self.state.verse_number = Some(view.number);
        self.state.verse_type = view.verse_type;
        self.state.verse = Some(view);
        self.state.warning = None;
        self.state.transient_error = None;

        self.emit(UiEvent::SelectionRestored {
            author: path.author,
            opus: path.opus,
            book: path.book,
            poem: path.poem,
            verse_number: metadata.verse.number,
            timestamp: chrono::Utc::now(),
        });
        Outcome::Applied
    }

    fn emit_scan_settings(&self) {
        self.emit(UiEvent::ScanSettingsChanged {
            verse_type: self.state.verse_type,
            dictionary: self.state.dictionary,
            timestamp: chrono::Utc::now(),
        });
    }

    fn emit(&self, event: UiEvent) {
        self.event_bus.emit_lossy(event);
    }
}
