use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

use quiz_core::{Clock, QuizResult};
use storage::repository::{CachedResult, ResultCache};

use crate::events::QuizEvent;
use crate::manifest::{ItemMetadata, ManifestApi, RemoteQuizRecord};

/// Mirrors incremental results into the local cache and the site manifest.
///
/// A passive listener on the event bus, standing in for the theme shell that
/// used to observe document-scoped result events. Everything here is
/// fallback persistence, never part of the session's critical path: failures
/// are logged and swallowed.
pub struct ResultRecorder {
    cache: Arc<dyn ResultCache>,
    manifest: Option<Arc<dyn ManifestApi>>,
    clock: Clock,
}

impl ResultRecorder {
    #[must_use]
    pub fn new(
        cache: Arc<dyn ResultCache>,
        manifest: Option<Arc<dyn ManifestApi>>,
        clock: Clock,
    ) -> Self {
        Self {
            cache,
            manifest,
            clock,
        }
    }

    /// Handles one event. Only incremental results are recorded; terminal
    /// events belong to the delivery sender.
    pub async fn handle_event(&self, event: &QuizEvent) {
        let QuizEvent::Result { slug, result } = event else {
            return;
        };

        let cached = CachedResult {
            score: result.score,
            percentage: result.percentage,
            finished: result.finished,
            updated: self.clock.now(),
        };
        if let Err(err) = self.cache.upsert(slug, &cached).await {
            debug!(%slug, error = %err, "result cache update failed");
        }

        self.write_back(slug, result).await;
    }

    /// Best-effort read-modify-write of the manifest entry for `slug`.
    ///
    /// Not transactional: concurrent writers race with last-write-wins.
    async fn write_back(&self, slug: &str, result: &QuizResult) {
        let Some(api) = &self.manifest else {
            return;
        };
        let mut manifest = match api.fetch().await {
            Ok(manifest) => manifest,
            Err(err) => {
                debug!(%slug, error = %err, "manifest fetch failed, skipping write-back");
                return;
            }
        };
        let Some(item) = manifest.item_mut(slug) else {
            return;
        };
        let metadata = item.metadata.get_or_insert_with(ItemMetadata::default);
        metadata.quiz_result = Some(RemoteQuizRecord {
            score: Some(result.score),
            percentage: Some(result.percentage),
            finished: result.finished,
            total: None,
            updated: Some(self.clock.now().timestamp_millis()),
        });
        if let Err(err) = api.submit(&manifest).await {
            debug!(%slug, error = %err, "manifest write-back failed");
        }
    }

    /// Consumes events until the bus closes.
    pub async fn run(self, mut events: broadcast::Receiver<QuizEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.handle_event(&event).await,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "result recorder lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    /// Spawns the listener on the current runtime.
    pub fn spawn(self, events: broadcast::Receiver<QuizEvent>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(events))
    }
}
