use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use url::Url;

use quiz_core::{Clock, Identity, QuizResult};

use crate::error::DeliveryError;
use crate::events::QuizEvent;

// Field protocol expected by the external sheet endpoint.
const ACTION: &str = "tambah";
const ANONYMOUS_NAME: &str = "Anonymous";

/// Delivery status of the most recent finished event this sender observed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeliveryStatus {
    #[default]
    Idle,
    /// Handed to the transport; acceptance is not confirmable.
    Sent,
    /// No endpoint configured, nothing was sent.
    Skipped,
    /// Transport failure; never retried.
    Failed(String),
}

/// Transport seam for the form-encoded delivery POST.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// Posts the form fields to the endpoint.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError` on transport failure or a non-success status.
    async fn post_form(
        &self,
        url: &Url,
        fields: &[(&'static str, String)],
    ) -> Result<(), DeliveryError>;
}

/// `reqwest`-backed transport.
#[derive(Clone, Default)]
pub struct HttpDeliveryTransport {
    client: Client,
}

#[async_trait]
impl DeliveryTransport for HttpDeliveryTransport {
    async fn post_form(
        &self,
        url: &Url,
        fields: &[(&'static str, String)],
    ) -> Result<(), DeliveryError> {
        let response = self.client.post(url.clone()).form(fields).send().await?;
        if !response.status().is_success() {
            return Err(DeliveryError::HttpStatus(response.status()));
        }
        Ok(())
    }
}

/// Forwards completed sessions to the external sheet endpoint.
///
/// A passive bus listener with at-most-once intent: the delivery identifier
/// of the previous send sits in a single slot, and an identical id is
/// dropped silently. The slot is deliberately not a set — two distinct
/// sessions interleaved can still resend, which matches the original
/// behavior.
pub struct ResultSender {
    endpoint: Option<Url>,
    transport: Arc<dyn DeliveryTransport>,
    clock: Clock,
    last_sent_id: Mutex<Option<String>>,
    last_status: Mutex<DeliveryStatus>,
}

impl ResultSender {
    #[must_use]
    pub fn new(endpoint: Option<Url>, clock: Clock) -> Self {
        Self::with_transport(endpoint, Arc::new(HttpDeliveryTransport::default()), clock)
    }

    #[must_use]
    pub fn with_transport(
        endpoint: Option<Url>,
        transport: Arc<dyn DeliveryTransport>,
        clock: Clock,
    ) -> Self {
        Self {
            endpoint,
            transport,
            clock,
            last_sent_id: Mutex::new(None),
            last_status: Mutex::new(DeliveryStatus::Idle),
        }
    }

    /// Status of the most recent finished event.
    #[must_use]
    pub fn last_status(&self) -> DeliveryStatus {
        self.last_status
            .lock()
            .map_or(DeliveryStatus::Idle, |guard| guard.clone())
    }

    /// Handles one event; anything but `Finished` is ignored.
    pub async fn handle_event(&self, event: &QuizEvent) {
        let QuizEvent::Finished { slug, result, user } = event else {
            return;
        };

        let Some(endpoint) = &self.endpoint else {
            debug!(%slug, "no delivery endpoint configured, skipping send");
            self.set_status(DeliveryStatus::Skipped);
            return;
        };

        let id = self.delivery_id(slug, result, user);
        // The id is claimed before the send, so a failed delivery is not
        // retried on a duplicate event either.
        {
            let Ok(mut last) = self.last_sent_id.lock() else {
                return;
            };
            if last.as_deref() == Some(id.as_str()) {
                return;
            }
            *last = Some(id.clone());
        }

        let name = if user.name.is_empty() {
            ANONYMOUS_NAME.to_owned()
        } else {
            user.name.clone()
        };
        let note = format!(
            "Kuis: {slug} - {}% ({}/{})",
            result.percentage,
            result.score,
            result.total.unwrap_or(0)
        );
        let fields = [
            ("action", ACTION.to_owned()),
            ("iddata", id),
            ("namaorng", name),
            ("nilai", result.score.to_string()),
            ("nope", user.phone.clone()),
            ("alamatorng", user.address.clone()),
            ("keterangan", note),
        ];

        match self.transport.post_form(endpoint, &fields).await {
            Ok(()) => self.set_status(DeliveryStatus::Sent),
            Err(err) => {
                warn!(%slug, error = %err, "result delivery failed");
                self.set_status(DeliveryStatus::Failed(err.to_string()));
            }
        }
    }

    /// Consumes events until the bus closes.
    pub async fn run(self: Arc<Self>, mut events: broadcast::Receiver<QuizEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.handle_event(&event).await,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "result sender lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    /// Spawns the listener on the current runtime.
    pub fn spawn(
        self: Arc<Self>,
        events: broadcast::Receiver<QuizEvent>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(events))
    }

    fn delivery_id(&self, slug: &str, result: &QuizResult, user: &Identity) -> String {
        let now = self.clock.now().timestamp_millis();
        if result.finished {
            format!(
                "{}-{}-{}-{}-{}-{}-{}",
                result.score,
                result.total.unwrap_or(0),
                user.name,
                user.phone,
                user.address,
                slug,
                now
            )
        } else {
            now.to_string()
        }
    }

    fn set_status(&self, status: DeliveryStatus) {
        if let Ok(mut guard) = self.last_status.lock() {
            *guard = status;
        }
    }
}
