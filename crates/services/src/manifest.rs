use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::error::ManifestError;

//
// ─── WIRE TYPES ────────────────────────────────────────────────────────────────
//

/// The site-wide manifest document.
///
/// Only `items` is modeled; every other field is carried through untouched so
/// a read-modify-write never drops data this core does not understand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteManifest {
    #[serde(default)]
    pub items: Vec<ManifestItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestItem {
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ItemMetadata>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<RemoteQuizRecord>,
    #[serde(
        rename = "quizResult",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub quiz_result: Option<RemoteQuizRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Quiz result embedded in a manifest item's metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteQuizRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<u32>,
    #[serde(default)]
    pub finished: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    /// Millisecond timestamp of the last write-back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
}

impl RemoteQuizRecord {
    /// A record is authoritative when it is finished or carries a score.
    #[must_use]
    pub fn indicates_completion(&self) -> bool {
        self.finished || self.score.is_some()
    }
}

impl SiteManifest {
    /// The item matching a page slug, if any.
    #[must_use]
    pub fn item(&self, slug: &str) -> Option<&ManifestItem> {
        self.items.iter().find(|item| item.slug == slug)
    }

    #[must_use]
    pub fn item_mut(&mut self, slug: &str) -> Option<&mut ManifestItem> {
        self.items.iter_mut().find(|item| item.slug == slug)
    }
}

impl ManifestItem {
    /// The embedded quiz record, preferring the `quiz` key over the
    /// `quizResult` alias.
    #[must_use]
    pub fn quiz_record(&self) -> Option<&RemoteQuizRecord> {
        let metadata = self.metadata.as_ref()?;
        metadata.quiz.as_ref().or(metadata.quiz_result.as_ref())
    }
}

//
// ─── TRANSPORT ─────────────────────────────────────────────────────────────────
//

/// Read/write access to the site manifest resource.
#[async_trait]
pub trait ManifestApi: Send + Sync {
    /// Fetches the whole manifest document.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError` on transport failure or a non-success status.
    async fn fetch(&self) -> Result<SiteManifest, ManifestError>;

    /// Resubmits the whole manifest document.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError` on transport failure or a non-success status.
    async fn submit(&self, manifest: &SiteManifest) -> Result<(), ManifestError>;

    /// True when the manifest lives on a local development host, where
    /// reconciliation is skipped to avoid noisy failed fetches.
    fn is_local(&self) -> bool {
        false
    }
}

/// HTTP client for the manifest resource.
#[derive(Clone)]
pub struct HttpManifestClient {
    client: Client,
    url: Url,
}

impl HttpManifestClient {
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ManifestApi for HttpManifestClient {
    async fn fetch(&self) -> Result<SiteManifest, ManifestError> {
        let response = self.client.get(self.url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(ManifestError::HttpStatus(response.status()));
        }
        Ok(response.json().await?)
    }

    async fn submit(&self, manifest: &SiteManifest) -> Result<(), ManifestError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(manifest)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ManifestError::HttpStatus(response.status()));
        }
        Ok(())
    }

    fn is_local(&self) -> bool {
        match self.url.host() {
            Some(url::Host::Domain(domain)) => domain == "localhost",
            Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
            Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
            None => false,
        }
    }
}
