//! Analyzer engine
//!
//! This module contains the analysis pipeline, including:
//! - HTTP fetching with time-to-first-byte
//! - A single iterative walk of the parsed document
//! - Link checking through a pluggable [`LinkChecker`]
//! - Rate and memory governors shared by every analysis
//! - Batch orchestration over a fixed worker pool
//!
//! One [`Analyzer`] serves single-page, batch and deep requests. It holds two
//! checkers with different policies; the pipeline itself is shared.

mod batch;
mod checker;
mod content;
mod deep;
mod extractor;
mod fetcher;
mod governor;
mod login;

pub use batch::{BatchFailure, BatchOrchestrator, BatchReport, MAX_REPORTED_ERRORS};
pub use checker::{CheckerPolicy, DisabledLinkChecker, LinkChecker, LinkTally, PooledLinkChecker};
pub use content::{count_words, keyword_density, readability_score, text_to_html_ratio};
pub use deep::cookie_profile;
pub use extractor::{doctype_version, extract, json_ld_types, PageFeatures, HTML5_ASSUMED};
pub use fetcher::{build_http_client, fetch_page, probe, CookieInfo, FetchedPage, ProbeResponse};
pub use governor::{Admission, AdmissionController, RateLimiter};
pub use login::is_login_form;

use crate::config::Config;
use crate::models::{AnalysisResult, DeepAnalysisResult};
use crate::url::normalize_target;
use crate::{AnalyzerError, Result};
use chrono::Utc;
use reqwest::Client;
use scraper::Html;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// The analysis engine
///
/// Cloning is cheap and every clone shares the same HTTP client, governors
/// and checkers.
#[derive(Clone)]
pub struct Analyzer {
    config: Arc<Config>,
    client: Client,
    rate: Arc<RateLimiter>,
    admission: Arc<AdmissionController>,
    single_checker: Arc<dyn LinkChecker>,
    batch_checker: Arc<dyn LinkChecker>,
}

/// A fetched and walked page, before link checking
struct WalkedPage {
    target: Url,
    page: FetchedPage,
    features: PageFeatures,
}

impl Analyzer {
    /// Creates an engine with pooled link checkers for single and batch use
    pub fn new(config: Config) -> Result<Self> {
        let client = build_http_client(&config.analyzer)?;
        let rate = Arc::new(RateLimiter::from_config(&config.limits));
        let admission = Arc::new(AdmissionController::from_config(&config.limits));

        let pooled = |policy: CheckerPolicy| -> Arc<dyn LinkChecker> {
            Arc::new(PooledLinkChecker::new(
                client.clone(),
                Arc::clone(&rate),
                Arc::clone(&admission),
                policy,
                config.limits.probe_cost_bytes,
            ))
        };
        let single_checker = pooled(CheckerPolicy::single(&config));
        let batch_checker = pooled(CheckerPolicy::batch(&config));

        Ok(Self {
            config: Arc::new(config),
            client,
            rate,
            admission,
            single_checker,
            batch_checker,
        })
    }

    /// Creates an engine that never probes links
    pub fn without_link_checks(config: Config) -> Result<Self> {
        let disabled: Arc<dyn LinkChecker> = Arc::new(DisabledLinkChecker);
        Ok(Self::new(config)?.with_checkers(Arc::clone(&disabled), disabled))
    }

    /// Replaces the single-page and batch checkers
    pub fn with_checkers(
        mut self,
        single: Arc<dyn LinkChecker>,
        batch: Arc<dyn LinkChecker>,
    ) -> Self {
        self.single_checker = single;
        self.batch_checker = batch;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// Analyzes one page
    ///
    /// # Errors
    ///
    /// * `InvalidUrl` - The input could not be normalized
    /// * `Fetch` / `Timeout` / `HttpStatus` - The page fetch failed
    /// * `ResourceExhausted` - The page does not fit the memory budget
    /// * `Cancelled` - The token fired
    pub async fn analyze_url(&self, cancel: &CancellationToken, url: &str) -> Result<AnalysisResult> {
        self.analyze_with(self.single_checker.as_ref(), cancel, url)
            .await
    }

    /// Analyzes many pages through the batch orchestrator
    pub async fn analyze_urls(
        &self,
        cancel: &CancellationToken,
        urls: Vec<String>,
    ) -> Result<BatchReport> {
        BatchOrchestrator::new(self.clone(), &self.config.batch)
            .run(urls, cancel)
            .await
    }

    /// Fetches a page and computes every deep signal
    ///
    /// Links are probed with the single-page checker when
    /// `probe-links-in-deep` is enabled, to count broken links.
    pub async fn fetch_deep(
        &self,
        cancel: &CancellationToken,
        url: &str,
    ) -> Result<DeepAnalysisResult> {
        let mut walked = self.fetch_and_walk(cancel, url).await?;

        let tally = if self.config.analyzer.probe_links_in_deep {
            let links = std::mem::take(&mut walked.features.links);
            Some(self.single_checker.check(links, cancel).await?)
        } else {
            None
        };

        let result = deep::assemble(&walked.target, &walked.page, walked.features, tally.as_ref());
        tracing::info!(url = %walked.target, "Deep analysis complete");
        Ok(result)
    }

    /// Single-page pipeline with the batch checker
    pub(crate) async fn analyze_batch_entry(
        &self,
        cancel: &CancellationToken,
        url: &str,
    ) -> Result<AnalysisResult> {
        self.analyze_with(self.batch_checker.as_ref(), cancel, url)
            .await
    }

    async fn analyze_with(
        &self,
        checker: &dyn LinkChecker,
        cancel: &CancellationToken,
        url: &str,
    ) -> Result<AnalysisResult> {
        tracing::info!(url = %url, "Analyzing page");
        let mut walked = self.fetch_and_walk(cancel, url).await?;

        let links = std::mem::take(&mut walked.features.links);
        let tally = checker.check(links, cancel).await?;

        let features = walked.features;
        let result = AnalysisResult {
            id: None,
            url: walked.target.to_string(),
            html_version: features.html_version,
            title: features.title,
            headings: features.headings,
            internal_links: tally.internal,
            external_links: tally.external,
            has_login_form: features.has_login_form,
            owner_id: None,
            created_at: Utc::now(),
        };

        tracing::info!(
            url = %result.url,
            internal = result.internal_links.count,
            external = result.external_links.count,
            inaccessible = tally.broken(),
            "Analysis complete"
        );

        Ok(result)
    }

    /// Normalize, fetch under admission, walk
    ///
    /// The page's admission is taken before its body is read and held until
    /// the document has been parsed and walked.
    async fn fetch_and_walk(&self, cancel: &CancellationToken, url: &str) -> Result<WalkedPage> {
        let target = normalize_target(url).map_err(|e| AnalyzerError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        let (page, admission) = fetch_page(
            &self.client,
            &target,
            &self.admission,
            self.config.limits.assumed_content_length,
            cancel,
        )
        .await?;

        let features = walk_document(&page.body, &page.final_url);
        drop(admission);

        Ok(WalkedPage {
            target,
            page,
            features,
        })
    }
}

/// Parses and walks synchronously; `Html` never lives across an await
fn walk_document(body: &str, base: &Url) -> PageFeatures {
    let html = Html::parse_document(body);
    extract(&html, base)
}
