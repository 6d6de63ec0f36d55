//! Page summaries.
//!
//! Creating a summary stores the URL with empty text and returns at once;
//! a detached task asks the [`Summarizer`] for the text and writes it back.
//! Nothing the summarizer does can fail or delay the creating request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::SummarizerConfig;
use crate::models::Summary;
use crate::services::metrics::record_summarizer_run;
use crate::services::store::SummaryStore;
use crate::services::ServiceError;

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, url: &str) -> Result<String, anyhow::Error>;
}

#[derive(Serialize)]
struct SummarizeRequest<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct SummarizeResponse {
    summary: String,
}

/// Calls an HTTP summarisation endpoint: `POST {"url"}` answered by
/// `{"summary"}`.
#[derive(Clone)]
pub struct RemoteSummarizer {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteSummarizer {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build summarizer client: {}", e))?;

        tracing::info!(endpoint = %endpoint, "Remote summarizer configured");

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn from_config(config: &SummarizerConfig) -> Result<Option<Self>, anyhow::Error> {
        config
            .url
            .as_deref()
            .map(|url| Self::new(url, Duration::from_secs(config.timeout_seconds)))
            .transpose()
    }
}

#[async_trait]
impl Summarizer for RemoteSummarizer {
    #[tracing::instrument(skip(self))]
    async fn summarize(&self, url: &str) -> Result<String, anyhow::Error> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SummarizeRequest { url })
            .send()
            .await?
            .error_for_status()?
            .json::<SummarizeResponse>()
            .await?;

        Ok(response.summary)
    }
}

/// Test double that answers with a fixed text, or fails when built with
/// [`MockSummarizer::failing`]. Records every URL it was asked about.
#[derive(Default)]
pub struct MockSummarizer {
    reply: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl MockSummarizer {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, url: &str) -> Result<String, anyhow::Error> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_string());
        }
        self.reply
            .clone()
            .ok_or_else(|| anyhow::anyhow!("summarizer unavailable"))
    }
}

#[derive(Clone)]
pub struct SummaryService {
    store: Arc<dyn SummaryStore>,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl SummaryService {
    pub fn new(store: Arc<dyn SummaryStore>, summarizer: Option<Arc<dyn Summarizer>>) -> Self {
        Self { store, summarizer }
    }

    /// Store the URL and start summarising it in the background. The
    /// returned handle is only useful to tests; callers drop it.
    pub async fn create(
        &self,
        url: &str,
    ) -> Result<(Summary, Option<JoinHandle<()>>), ServiceError> {
        let summary = self.store.create_summary(url).await?;
        tracing::info!(summary_id = summary.id, "Summary created");

        let handle = self.summarizer.clone().map(|summarizer| {
            let store = Arc::clone(&self.store);
            let id = summary.id;
            let url = summary.url.clone();
            tokio::spawn(generate_summary(store, summarizer, id, url))
        });

        Ok((summary, handle))
    }

    pub async fn get(&self, id: i64) -> Result<Summary, ServiceError> {
        self.store
            .get_summary(id)
            .await?
            .ok_or(ServiceError::NotFound("Summary"))
    }

    pub async fn list(&self) -> Result<Vec<Summary>, ServiceError> {
        Ok(self.store.list_summaries().await?)
    }

    pub async fn update(&self, id: i64, url: &str, text: &str) -> Result<Summary, ServiceError> {
        self.store
            .update_summary(id, url, text)
            .await?
            .ok_or(ServiceError::NotFound("Summary"))
    }

    pub async fn delete(&self, id: i64) -> Result<Summary, ServiceError> {
        let deleted = self
            .store
            .delete_summary(id)
            .await?
            .ok_or(ServiceError::NotFound("Summary"))?;

        tracing::info!(summary_id = id, "Summary deleted");
        Ok(deleted)
    }
}

async fn generate_summary(
    store: Arc<dyn SummaryStore>,
    summarizer: Arc<dyn Summarizer>,
    id: i64,
    url: String,
) {
    let text = match summarizer.summarize(&url).await {
        Ok(text) => text,
        Err(e) => {
            record_summarizer_run("failed");
            tracing::warn!(summary_id = id, error = %e, "Summarizer failed");
            return;
        }
    };

    match store.set_summary_text(id, &text).await {
        Ok(true) => {
            record_summarizer_run("stored");
            tracing::info!(summary_id = id, "Summary text stored");
        }
        Ok(false) => {
            record_summarizer_run("discarded");
            tracing::info!(summary_id = id, "Summary deleted before text was ready");
        }
        Err(e) => {
            record_summarizer_run("failed");
            tracing::error!(summary_id = id, error = %e, "Failed to store summary text");
        }
    }
}
