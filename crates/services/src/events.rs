use tokio::sync::broadcast;

use quiz_core::{Identity, QuizResult};

/// A structured notification dispatched by the quiz service.
///
/// `Result` fires after every check, correct or not; consumers must not
/// assume exactly-once delivery of it. `Finished` fires at most once per
/// session lifetime, guarded by the linear state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizEvent {
    /// Incremental update carrying the running score.
    Result { slug: String, result: QuizResult },
    /// Terminal notification for a completed session.
    Finished {
        slug: String,
        result: QuizResult,
        user: Identity,
    },
}

impl QuizEvent {
    #[must_use]
    pub fn slug(&self) -> &str {
        match self {
            QuizEvent::Result { slug, .. } | QuizEvent::Finished { slug, .. } => slug,
        }
    }

    #[must_use]
    pub fn result(&self) -> &QuizResult {
        match self {
            QuizEvent::Result { result, .. } | QuizEvent::Finished { result, .. } => result,
        }
    }
}

/// Typed publish/subscribe bus connecting the quiz service to observers.
///
/// Replaces the original document-scoped broadcast: any number of listeners
/// may observe, and nothing is retained after dispatch.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<QuizEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes to every current subscriber. Having none is fine.
    pub fn publish(&self, event: QuizEvent) {
        let _ = self.tx.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<QuizEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(16)
    }
}
