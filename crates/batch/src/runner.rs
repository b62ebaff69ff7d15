//! The batch runner.
//!
//! Every entry yields exactly one [`DocumentOutcome`], in input order. Each
//! extraction runs in its own task, so an engine error, an expired deadline,
//! or even a panic is recorded as that entry's failure and the batch carries on.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use audit::{
    BatchRunId, ConfigurationError, DocumentEntry, DocumentOutcome, EngineError, ErrorRecord,
    ExtractionClient, ExtractionResult, Outcome, RetryPolicy, Timestamp,
};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::Instrument;

use crate::progress::{ProgressObserver, ProgressUpdate};

/// Tuning for one batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Extractions allowed in flight at once. Capped at the credential pool size.
    pub concurrency: usize,
    /// Deadline for each engine call. `None` waits indefinitely.
    pub deadline: Option<Duration>,
    /// Engine calls per document, including the first. `1` disables retries.
    pub max_attempts: u32,
    /// Base delay between attempts, multiplied by the attempt number, when the
    /// error carries no back-off hint of its own.
    pub retry_backoff: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            deadline: None,
            max_attempts: 1,
            retry_backoff: Duration::from_secs(2),
        }
    }
}

impl BatchOptions {
    /// Rejects settings under which no document could be processed.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.concurrency == 0 {
            return Err(ConfigurationError::new("batch concurrency must be at least 1"));
        }
        if self.max_attempts == 0 {
            return Err(ConfigurationError::new("batch max_attempts must be at least 1"));
        }
        if self.deadline == Some(Duration::ZERO) {
            return Err(ConfigurationError::new("batch deadline must be positive"));
        }
        Ok(())
    }
}

/// The ordered outcome list of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Correlates this run's log output.
    pub run_id: BatchRunId,
    /// One entry per input document, in input order.
    pub outcomes: Vec<DocumentOutcome>,
}

impl BatchReport {
    /// Number of documents that produced a result.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_success()).count()
    }

    /// Number of documents that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Successful results with their document names, in input order.
    pub fn results(&self) -> impl Iterator<Item = (&str, &ExtractionResult)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.outcome.result().map(|r| (o.name.as_str(), r)))
    }
}

/// Runs extraction over a batch of documents.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    client: Arc<ExtractionClient>,
    options: BatchOptions,
}

impl BatchRunner {
    /// Creates a runner.
    pub fn new(client: Arc<ExtractionClient>, options: BatchOptions) -> Self {
        Self { client, options }
    }

    /// Extractions that will actually run at once: the configured value,
    /// capped at the pool size so every in-flight call holds its own credential.
    pub fn effective_concurrency(&self) -> usize {
        self.options
            .concurrency
            .min(self.client.pool_size())
            .max(1)
    }

    /// Processes `entries` and returns one outcome per entry, in input order.
    ///
    /// `progress` is notified after each entry completes.
    pub async fn run(
        &self,
        entries: Vec<DocumentEntry>,
        progress: &dyn ProgressObserver,
    ) -> BatchReport {
        let run_id = BatchRunId::new_random();
        let total = entries.len();
        let concurrency = self.effective_concurrency();
        let span = tracing::info_span!("batch_run", %run_id, total, concurrency);

        async move {
            tracing::info!("Batch started");

            let mut completions = stream::iter(entries.into_iter().enumerate())
                .map(|(index, entry)| self.process(index, entry))
                .buffered(concurrency);

            let mut outcomes = Vec::with_capacity(total);
            while let Some(done) = completions.next().await {
                progress.on_progress(&ProgressUpdate {
                    completed: outcomes.len() + 1,
                    total,
                    document: &done.name,
                    succeeded: done.outcome.is_success(),
                });
                outcomes.push(done);
            }

            let report = BatchReport { run_id, outcomes };
            tracing::info!(
                succeeded = report.succeeded(),
                failed = report.failed(),
                "Batch finished"
            );
            report
        }
        .instrument(span)
        .await
    }

    async fn process(&self, index: usize, entry: DocumentEntry) -> DocumentOutcome {
        let name = entry.name.clone();
        let span = tracing::info_span!("extract_document", index, document = %name);

        // Counted outside the task so a panic mid-retry keeps the tally.
        let attempts = Arc::new(AtomicU32::new(0));
        let task = tokio::spawn(
            extract_with_retries(
                Arc::clone(&self.client),
                entry,
                self.options.clone(),
                Arc::clone(&attempts),
            )
            .instrument(span.clone()),
        );

        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                let message = format!("extraction task aborted: {join_error}");
                span.in_scope(|| tracing::error!(%message, "Extraction task did not complete"));
                Outcome::Failure(ErrorRecord::unexpected(message))
            }
        };
        let attempts = attempts.load(Ordering::SeqCst).max(1);

        DocumentOutcome {
            index,
            name,
            outcome,
            attempts,
            completed_at: Timestamp::now(),
        }
    }
}

/// Calls the engine until it succeeds, fails permanently, or attempts run out.
async fn extract_with_retries(
    client: Arc<ExtractionClient>,
    entry: DocumentEntry,
    options: BatchOptions,
    attempts: Arc<AtomicU32>,
) -> Outcome {
    loop {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let error = match attempt_once(&client, &entry.content, options.deadline).await {
            Ok(result) => {
                tracing::info!(attempt, "Document extracted");
                return Outcome::Success(result);
            }
            Err(error) => error,
        };

        match error.retry_policy() {
            RetryPolicy::Retryable { after } if attempt < options.max_attempts => {
                let delay = after.unwrap_or(options.retry_backoff * attempt);
                tracing::warn!(attempt, %error, ?delay, "Extraction failed, retrying");
                tokio::time::sleep(delay).await;
            }
            _ => {
                tracing::warn!(attempt, %error, "Extraction failed");
                return Outcome::Failure(ErrorRecord::from_error(&error));
            }
        }
    }
}

async fn attempt_once(
    client: &ExtractionClient,
    document: &[u8],
    deadline: Option<Duration>,
) -> Result<ExtractionResult, EngineError> {
    match deadline {
        None => client.extract(document).await,
        Some(after) => tokio::time::timeout(after, client.extract(document))
            .await
            .unwrap_or(Err(EngineError::Timeout { after })),
    }
}
