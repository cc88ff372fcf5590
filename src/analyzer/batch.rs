//! Batch orchestration
//!
//! A fixed-size pool of workers pulls URLs from a bounded queue and runs the
//! full single-page pipeline for each one, using the batch link checker and
//! the governors shared with every other analysis. A failed URL is recorded
//! and never stops its siblings.

use crate::analyzer::Analyzer;
use crate::config::BatchConfig;
use crate::models::AnalysisResult;
use crate::{AnalyzerError, Result};
use futures::future::try_join_all;
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Failures listed verbatim in a batch summary
pub const MAX_REPORTED_ERRORS: usize = 5;

/// One URL that could not be analyzed
#[derive(Debug)]
pub struct BatchFailure {
    pub url: String,
    pub error: AnalyzerError,
}

/// Outcome of a batch: every success plus every failure
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Successful analyses in completion order
    pub results: Vec<AnalysisResult>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Human-readable failure list, empty when nothing failed
    ///
    /// The first [`MAX_REPORTED_ERRORS`] failures are listed verbatim and the
    /// rest are summarized by count.
    pub fn summary(&self) -> String {
        if self.failures.is_empty() {
            return String::new();
        }

        let mut out = format!("{} errors occurred during analysis:", self.failures.len());
        for failure in self.failures.iter().take(MAX_REPORTED_ERRORS) {
            let _ = write!(out, "\n- {}: {}", failure.url, failure.error);
        }

        let hidden = self.failures.len().saturating_sub(MAX_REPORTED_ERRORS);
        if hidden > 0 {
            let _ = write!(out, "\n... and {} more errors", hidden);
        }

        out
    }
}

/// Runs many single-page analyses through a bounded worker pool
pub struct BatchOrchestrator {
    analyzer: Analyzer,
    workers: usize,
    queue_capacity: usize,
}

impl BatchOrchestrator {
    pub fn new(analyzer: Analyzer, config: &BatchConfig) -> Self {
        Self {
            analyzer,
            workers: config.max_concurrent_analyses,
            queue_capacity: config.url_queue_capacity,
        }
    }

    /// Analyzes every URL once
    ///
    /// # Returns
    ///
    /// * `Ok(BatchReport)` - At least one URL succeeded (or none were given)
    /// * `Err(Cancelled)` - The token fired before any URL was dispatched, or
    ///   the batch was cancelled with nothing to show for it
    /// * `Err(PartialBatchFailure)` - Every URL failed
    pub async fn run(&self, urls: Vec<String>, cancel: &CancellationToken) -> Result<BatchReport> {
        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }
        if urls.is_empty() {
            return Ok(BatchReport::default());
        }

        let total = urls.len();
        let worker_count = self.workers.clamp(1, total);
        tracing::info!(urls = total, workers = worker_count, "Starting batch analysis");

        let (url_tx, url_rx) = mpsc::channel::<String>(self.queue_capacity.max(1));
        let url_rx = Arc::new(Mutex::new(url_rx));
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(String, Result<AnalysisResult>)>();

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let analyzer = self.analyzer.clone();
            let url_rx = Arc::clone(&url_rx);
            let done_tx = done_tx.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                batch_worker(worker_id, analyzer, url_rx, done_tx, cancel).await
            }));
        }
        drop(done_tx);

        let mut report = BatchReport::default();
        let mut pending = urls.into_iter();
        while let Some(url) = pending.next() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = url_tx.reserve() => permit.ok(),
            };
            let Some(permit) = permit else {
                // never dispatched; still attributable to its URL
                report.failures.push(BatchFailure {
                    url,
                    error: AnalyzerError::Cancelled,
                });
                report.failures.extend(pending.by_ref().map(|url| BatchFailure {
                    url,
                    error: AnalyzerError::Cancelled,
                }));
                break;
            };
            permit.send(url);
        }
        drop(url_tx);

        while let Some((url, outcome)) = done_rx.recv().await {
            match outcome {
                Ok(result) => report.results.push(result),
                Err(error) => {
                    tracing::warn!(url = %url, error = %error, "Batch entry failed");
                    report.failures.push(BatchFailure { url, error });
                }
            }
        }

        try_join_all(handles)
            .await
            .map_err(|e| AnalyzerError::Worker(e.to_string()))?;

        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Batch analysis complete"
        );

        if report.results.is_empty() {
            if cancel.is_cancelled() {
                return Err(AnalyzerError::Cancelled);
            }
            return Err(AnalyzerError::PartialBatchFailure {
                succeeded: 0,
                failed: report.failed(),
                summary: report.summary(),
            });
        }

        Ok(report)
    }
}

async fn batch_worker(
    worker_id: usize,
    analyzer: Analyzer,
    url_rx: Arc<Mutex<mpsc::Receiver<String>>>,
    done_tx: mpsc::UnboundedSender<(String, Result<AnalysisResult>)>,
    cancel: CancellationToken,
) {
    loop {
        let next = {
            let mut rx = url_rx.lock().await;
            rx.recv().await
        };
        let Some(url) = next else {
            break;
        };

        tracing::debug!(worker = worker_id, url = %url, "Analyzing batch entry");
        let outcome = match analyzer.rate_limiter().acquire(&cancel).await {
            Ok(()) => analyzer.analyze_batch_entry(&cancel, &url).await,
            Err(e) => Err(e),
        };

        if done_tx.send((url, outcome)).is_err() {
            break;
        }
    }
}
