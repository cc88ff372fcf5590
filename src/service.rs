//! Analysis service
//!
//! Composes the [`Analyzer`] engine with a [`Storage`] backend. The storage
//! lock is only ever taken in synchronous sections, never across an await.

use crate::analyzer::{Analyzer, BatchReport};
use crate::models::{AnalysisResult, DeepAnalysisResult};
use crate::storage::{clamp_limit, SqliteStorage, Stats, Storage, StorageError, StorageResult};
use crate::{AnalyzerError, Result};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Analyze-and-persist front end over one engine and one store
pub struct AnalysisService<S: Storage = SqliteStorage> {
    analyzer: Analyzer,
    storage: Arc<Mutex<S>>,
    freshness_window: Duration,
}

impl<S: Storage> Clone for AnalysisService<S> {
    fn clone(&self) -> Self {
        Self {
            analyzer: self.analyzer.clone(),
            storage: Arc::clone(&self.storage),
            freshness_window: self.freshness_window,
        }
    }
}

impl<S: Storage> AnalysisService<S> {
    pub fn new(analyzer: Analyzer, storage: S) -> Self {
        let freshness_window = analyzer.config().analyzer.freshness_window();
        Self {
            analyzer,
            storage: Arc::new(Mutex::new(storage)),
            freshness_window,
        }
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Analyzes a page and stores the result under `owner`
    ///
    /// A cancelled request stores nothing.
    pub async fn analyze_and_store(
        &self,
        cancel: &CancellationToken,
        url: &str,
        owner: Option<&str>,
    ) -> Result<AnalysisResult> {
        let mut result = self.analyzer.analyze_url(cancel, url).await?;
        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        result.owner_id = owner.map(str::to_string);
        let id = self.with_storage(|s| s.save_analysis(&result))?;
        result.id = Some(id);

        tracing::info!(id, url = %result.url, "Analysis stored");
        Ok(result)
    }

    /// Analyzes many pages and stores every success
    ///
    /// Failures stay in the returned report. Successes are stored in one
    /// transaction, so a storage error stores none of them. Nothing is stored
    /// when the batch was cancelled.
    pub async fn analyze_batch_and_store(
        &self,
        cancel: &CancellationToken,
        urls: Vec<String>,
        owner: Option<&str>,
    ) -> Result<BatchReport> {
        let mut report = self.analyzer.analyze_urls(cancel, urls).await?;
        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        for result in report.results.iter_mut() {
            result.owner_id = owner.map(str::to_string);
        }
        let ids = self.with_storage(|s| s.save_analyses(&report.results))?;
        for (result, id) in report.results.iter_mut().zip(ids) {
            result.id = Some(id);
        }

        tracing::info!(
            stored = report.succeeded(),
            failed = report.failed(),
            "Batch stored"
        );
        Ok(report)
    }

    pub fn get_analysis(&self, id: i64) -> Result<Option<AnalysisResult>> {
        Ok(self.with_storage(|s| s.get_analysis(id))?)
    }

    /// Deep analysis of a stored analysis
    ///
    /// Returns `Ok(None)` for an unknown id. A stored deep analysis younger
    /// than the freshness window is returned as is; otherwise the page is
    /// analyzed again and the stored row replaced.
    pub async fn deep_analysis(
        &self,
        cancel: &CancellationToken,
        id: i64,
    ) -> Result<Option<DeepAnalysisResult>> {
        let (analysis, cached) = self.with_storage(|s| {
            let analysis = s.get_analysis(id)?;
            let cached = match analysis {
                Some(_) => s.get_deep(id)?,
                None => None,
            };
            Ok((analysis, cached))
        })?;

        let Some(analysis) = analysis else {
            return Ok(None);
        };

        if let Some(cached) = cached {
            if !cached.is_stale(Utc::now(), self.freshness_window) {
                tracing::debug!(id, "Serving cached deep analysis");
                return Ok(Some(cached));
            }
        }

        let mut deep = self.analyzer.fetch_deep(cancel, &analysis.url).await?;
        deep.analysis_id = Some(id);

        if let Err(e) = self.with_storage(|s| s.save_deep(&deep)) {
            tracing::warn!(id, error = %e, "Failed to store deep analysis");
        }

        Ok(Some(deep))
    }

    /// Most recent analyses; `limit` clamps to 1..=100, 10 when absent
    pub fn recent(&self, limit: Option<usize>) -> Result<Vec<AnalysisResult>> {
        let limit = clamp_limit(limit);
        Ok(self.with_storage(|s| s.recent_analyses(limit))?)
    }

    pub fn owner_analyses(&self, owner: &str, limit: Option<usize>) -> Result<Vec<AnalysisResult>> {
        let limit = clamp_limit(limit);
        Ok(self.with_storage(|s| s.owner_analyses(owner, limit))?)
    }

    pub fn stats(&self) -> Result<Stats> {
        Ok(self.with_storage(|s| s.stats())?)
    }

    fn with_storage<T>(&self, f: impl FnOnce(&mut S) -> StorageResult<T>) -> StorageResult<T> {
        let mut guard = self.storage.lock().map_err(|_| StorageError::Poisoned)?;
        f(&mut guard)
    }
}
