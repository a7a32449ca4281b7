use std::sync::Arc;

use tracing::debug;

use quiz_core::{
    Advanced, CheckOutcome, Clock, ExternalResult, Identity, QuestionBank, Session, SessionError,
    SessionProgress, slug_from_path,
};
use storage::repository::{Snapshot, SnapshotStore, Storage};

use crate::confetti::{ConfettiHook, NoConfetti};
use crate::events::{EventBus, QuizEvent};
use crate::manifest::{ManifestApi, ManifestItem};

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Declarative configuration for one quiz instance.
#[derive(Debug, Clone)]
pub struct QuizConfig {
    /// Raw JSON question source (primary).
    pub questions: Option<String>,
    /// Legacy-compatible alias source.
    pub questions_alias: Option<String>,
    /// Whether to restore a previously saved session at start.
    pub autoload: bool,
    /// Page path owning the persistence slot; also yields the slug.
    pub page_path: String,
    /// Identity prefill for the intro form.
    pub identity: Option<Identity>,
}

impl QuizConfig {
    #[must_use]
    pub fn new(page_path: impl Into<String>) -> Self {
        Self {
            questions: None,
            questions_alias: None,
            autoload: true,
            page_path: page_path.into(),
            identity: None,
        }
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Drives one quiz session and wires its collaborators together.
///
/// Owns the ordering contract: state mutation, then snapshot write, then
/// event publish. Storage and manifest failures never surface to callers;
/// the session simply continues in memory.
pub struct QuizService {
    session: Session,
    page_path: String,
    slug: String,
    store: Arc<dyn SnapshotStore>,
    bus: EventBus,
    manifest: Option<Arc<dyn ManifestApi>>,
    confetti: Arc<dyn ConfettiHook>,
    clock: Clock,
}

impl QuizService {
    /// Builds the service and resolves the initial state in the fixed
    /// order: parse the question bank, restore a saved snapshot when
    /// autoload is on, then reconcile against the remote manifest — remote
    /// wins over local, local over fresh.
    pub async fn start(
        config: QuizConfig,
        storage: &Storage,
        bus: EventBus,
        manifest: Option<Arc<dyn ManifestApi>>,
        clock: Clock,
    ) -> Self {
        let bank = QuestionBank::from_sources(
            config.questions.as_deref(),
            config.questions_alias.as_deref(),
        );
        let slug = slug_from_path(&config.page_path);
        let mut session = Session::new(bank, config.identity);

        let store = Arc::clone(&storage.snapshots);
        if config.autoload {
            match store.load(&config.page_path).await {
                Ok(Some(snapshot)) => match snapshot.into_session() {
                    Ok(restored) => session = restored,
                    Err(err) => debug!(error = %err, "saved snapshot unusable, starting fresh"),
                },
                Ok(None) => {}
                Err(err) => debug!(error = %err, "snapshot load failed, starting fresh"),
            }
        }

        let mut service = Self {
            session,
            page_path: config.page_path,
            slug,
            store,
            bus,
            manifest,
            confetti: Arc::new(NoConfetti),
            clock,
        };
        service.reconcile().await;
        service
    }

    /// Replaces the injected confetti hook.
    #[must_use]
    pub fn with_confetti(mut self, confetti: Arc<dyn ConfettiHook>) -> Self {
        self.confetti = confetti;
        self
    }

    //
    // ─── OPERATIONS ────────────────────────────────────────────────────────────
    //

    /// Records the participant identity and enters the question flow.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when the name is missing or the session is
    /// not on the intro form.
    pub async fn submit_intro(&mut self, identity: Identity) -> Result<(), SessionError> {
        self.session.submit_intro(identity)?;
        self.persist().await;
        Ok(())
    }

    /// Checks an answer against the current question.
    ///
    /// On success the order is fixed: mutate, fire confetti when correct,
    /// persist the snapshot, publish the incremental result event — which
    /// fires for wrong answers too.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` outside `Answering` or when the question is
    /// locked.
    pub async fn check_answer(&mut self, raw: &str) -> Result<CheckOutcome, SessionError> {
        let outcome = self.session.check_answer(raw)?;
        if outcome.correct {
            self.confetti.fire();
        }
        self.persist().await;
        self.bus.publish(QuizEvent::Result {
            slug: self.slug.clone(),
            result: self.session.result(false),
        });
        Ok(outcome)
    }

    /// Advances to the next question, or finishes the session from the last
    /// one — persisting the final snapshot and publishing the terminal
    /// event exactly once.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Unchecked` when the current question has not
    /// been checked.
    pub async fn advance(&mut self) -> Result<Advanced, SessionError> {
        let advanced = self.session.advance()?;
        if let Advanced::Finished(result) = &advanced {
            self.persist().await;
            self.bus.publish(QuizEvent::Finished {
                slug: self.slug.clone(),
                result: result.clone(),
                user: self.session.identity().cloned().unwrap_or_default(),
            });
        }
        Ok(advanced)
    }

    /// Steps back one question. Pure view operation: nothing is persisted
    /// and no event fires.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AtFirstQuestion` at index 0.
    pub fn retreat(&mut self) -> Result<(), SessionError> {
        self.session.retreat()
    }

    /// Restarts from the summary, dropping the persisted snapshot for this
    /// page.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `Summary`.
    pub async fn restart(&mut self) -> Result<(), SessionError> {
        self.session.restart()?;
        if let Err(err) = self.store.clear(&self.page_path).await {
            debug!(page = %self.page_path, error = %err, "snapshot clear failed");
        }
        Ok(())
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        self.session.progress()
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────────
    //

    /// One-shot remote reconciliation: a matching record that indicates
    /// completion overrides whatever local state start assembled.
    async fn reconcile(&mut self) {
        let Some(api) = &self.manifest else {
            return;
        };
        if api.is_local() {
            return;
        }
        let manifest = match api.fetch().await {
            Ok(manifest) => manifest,
            Err(err) => {
                debug!(slug = %self.slug, error = %err, "manifest fetch failed, keeping local state");
                return;
            }
        };
        let Some(record) = manifest.item(&self.slug).and_then(ManifestItem::quiz_record) else {
            return;
        };
        if !record.indicates_completion() {
            return;
        }

        let local_total = u32::try_from(self.session.total_questions()).unwrap_or(u32::MAX);
        self.session.apply_remote(ExternalResult {
            score: record.score.unwrap_or(0),
            percentage: record.percentage.unwrap_or(0),
            total: record.total.unwrap_or(local_total),
        });
    }

    async fn persist(&self) {
        let snapshot = Snapshot::from_session(&self.session, self.clock.now());
        if let Err(err) = self.store.save(&self.page_path, &snapshot).await {
            debug!(page = %self.page_path, error = %err, "snapshot save failed, continuing in memory");
        }
    }
}
