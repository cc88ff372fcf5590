//! Link accessibility checking
//!
//! A [`LinkChecker`] takes the unique links of one page and reports how many
//! of each class could not be reached. [`PooledLinkChecker`] drains a
//! bounded queue with a fixed number of workers under the shared governors;
//! [`DisabledLinkChecker`] reports every link as unchecked.
//!
//! Each worker keeps a private tally and hands it back through its
//! `JoinHandle`; the coordinator merges them once every worker is done.

use crate::analyzer::fetcher::{self, ProbeResponse};
use crate::analyzer::governor::{AdmissionController, RateLimiter};
use crate::config::Config;
use crate::models::LinkStatus;
use crate::state::{ProbeOutcome, ProbeState};
use crate::url::{DiscoveredLink, LinkClass};
use crate::{AnalyzerError, Result};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Concurrency settings for one checker instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerPolicy {
    /// Probe workers per page
    pub workers: usize,
    /// Links that may wait in the queue before the producer blocks
    pub queue_capacity: usize,
    pub probe_timeout: Duration,
}

impl CheckerPolicy {
    /// Policy for single-page analysis
    pub fn single(config: &Config) -> Self {
        Self {
            workers: config.single.probe_workers,
            queue_capacity: config.single.probe_queue_capacity,
            probe_timeout: config.analyzer.probe_timeout(),
        }
    }

    /// Policy for pages analyzed as part of a batch
    pub fn batch(config: &Config) -> Self {
        Self {
            workers: config.batch.probe_workers,
            queue_capacity: config.batch.probe_queue_capacity,
            probe_timeout: config.batch.probe_timeout(),
        }
    }
}

/// Per-class link counts for one page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkTally {
    pub internal: LinkStatus,
    pub external: LinkStatus,
}

impl LinkTally {
    /// Counts one link and its outcome
    pub fn record(&mut self, class: LinkClass, outcome: &ProbeOutcome) {
        let status = match class {
            LinkClass::Internal => &mut self.internal,
            LinkClass::External => &mut self.external,
        };

        status.count += 1;
        match outcome {
            ProbeOutcome::Accessible { .. } => {}
            ProbeOutcome::Inaccessible { .. } => status.inaccessible += 1,
            ProbeOutcome::Skipped { .. } => status.unchecked += 1,
        }
    }

    /// Adds another tally into this one
    pub fn merge(&mut self, other: &LinkTally) {
        for (mine, theirs) in [
            (&mut self.internal, &other.internal),
            (&mut self.external, &other.external),
        ] {
            mine.count += theirs.count;
            mine.inaccessible += theirs.inaccessible;
            mine.unchecked += theirs.unchecked;
        }
    }

    /// Inaccessible links of both classes
    pub fn broken(&self) -> usize {
        self.internal.inaccessible + self.external.inaccessible
    }
}

/// Strategy for checking the links of one page
#[async_trait]
pub trait LinkChecker: Send + Sync {
    /// Checks every link exactly once
    ///
    /// Individual probe failures are absorbed into the tally. The only error
    /// is cancellation.
    async fn check(&self, links: Vec<DiscoveredLink>, cancel: &CancellationToken)
        -> Result<LinkTally>;
}

/// Worker-pool checker sharing the process-wide governors
pub struct PooledLinkChecker {
    client: Client,
    rate: Arc<RateLimiter>,
    admission: Arc<AdmissionController>,
    policy: CheckerPolicy,
    probe_cost_bytes: u64,
}

impl PooledLinkChecker {
    pub fn new(
        client: Client,
        rate: Arc<RateLimiter>,
        admission: Arc<AdmissionController>,
        policy: CheckerPolicy,
        probe_cost_bytes: u64,
    ) -> Self {
        Self {
            client,
            rate,
            admission,
            policy,
            probe_cost_bytes,
        }
    }
}

#[async_trait]
impl LinkChecker for PooledLinkChecker {
    async fn check(
        &self,
        links: Vec<DiscoveredLink>,
        cancel: &CancellationToken,
    ) -> Result<LinkTally> {
        if links.is_empty() {
            return Ok(LinkTally::default());
        }
        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        let worker_count = self.policy.workers.clamp(1, links.len());
        let (tx, rx) = mpsc::channel::<DiscoveredLink>(self.policy.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let probe = Probe {
                client: self.client.clone(),
                rate: Arc::clone(&self.rate),
                admission: Arc::clone(&self.admission),
                timeout: self.policy.probe_timeout,
                cost_bytes: self.probe_cost_bytes,
                cancel: cancel.clone(),
            };
            let rx = Arc::clone(&rx);
            handles.push(tokio::spawn(async move {
                probe_worker(worker_id, probe, rx).await
            }));
        }

        // send() waits while the queue is full
        let mut producer_cancelled = false;
        for link in links {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    producer_cancelled = true;
                    break;
                }
                sent = tx.send(link) => {
                    if sent.is_err() {
                        // every worker has exited, which only happens on cancellation
                        break;
                    }
                }
            }
        }
        drop(tx);

        let mut tally = LinkTally::default();
        let mut cancelled = producer_cancelled;
        for joined in join_all(handles).await {
            match joined {
                Ok(Ok(local)) => tally.merge(&local),
                Ok(Err(AnalyzerError::Cancelled)) => cancelled = true,
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(AnalyzerError::Worker(e.to_string())),
            }
        }

        if cancelled || cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        tracing::debug!(
            internal = tally.internal.count,
            external = tally.external.count,
            broken = tally.broken(),
            "Link check complete"
        );

        Ok(tally)
    }
}

/// Everything a worker needs to probe one link
struct Probe {
    client: Client,
    rate: Arc<RateLimiter>,
    admission: Arc<AdmissionController>,
    timeout: Duration,
    cost_bytes: u64,
    cancel: CancellationToken,
}

async fn probe_worker(
    worker_id: usize,
    probe: Probe,
    rx: Arc<Mutex<mpsc::Receiver<DiscoveredLink>>>,
) -> Result<LinkTally> {
    let mut tally = LinkTally::default();

    loop {
        let next = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                _ = probe.cancel.cancelled() => return Err(AnalyzerError::Cancelled),
                link = rx.recv() => link,
            }
        };
        let Some(link) = next else {
            break;
        };

        let outcome = probe.run(&link).await?;
        tracing::debug!(
            worker = worker_id,
            url = %link.url,
            state = %outcome.state(),
            "Probed link"
        );
        tally.record(link.class, &outcome);
    }

    Ok(tally)
}

impl Probe {
    /// Walks one link from Queued to a terminal state
    async fn run(&self, link: &DiscoveredLink) -> Result<ProbeOutcome> {
        let mut state = ProbeState::Queued;

        self.rate.acquire(&self.cancel).await?;

        let _admission = match self.admission.admit(self.cost_bytes, &self.cancel).await {
            Ok(admission) => admission,
            Err(_) if self.cancel.is_cancelled() => return Err(AnalyzerError::Cancelled),
            Err(e) => {
                advance(&mut state, ProbeState::Skipped);
                tracing::warn!(url = %link.url, error = %e, "Probe skipped");
                return Ok(ProbeOutcome::Skipped {
                    reason: e.to_string(),
                });
            }
        };

        advance(&mut state, ProbeState::Probed);
        let response = fetcher::probe(&self.client, &link.url, self.timeout, &self.cancel).await?;

        let outcome = match response {
            ProbeResponse::Status(status) => match ProbeState::from_status(status) {
                ProbeState::Accessible => ProbeOutcome::Accessible { status },
                _ => ProbeOutcome::Inaccessible {
                    reason: format!("status {}", status),
                },
            },
            ProbeResponse::Failed(reason) => ProbeOutcome::Inaccessible { reason },
        };
        advance(&mut state, outcome.state());

        Ok(outcome)
    }
}

fn advance(state: &mut ProbeState, next: ProbeState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal probe transition {} -> {}",
        state,
        next
    );
    *state = next;
}

/// Checker that never probes; every link is reported as unchecked
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledLinkChecker;

#[async_trait]
impl LinkChecker for DisabledLinkChecker {
    async fn check(
        &self,
        links: Vec<DiscoveredLink>,
        cancel: &CancellationToken,
    ) -> Result<LinkTally> {
        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        let skipped = ProbeOutcome::Skipped {
            reason: "link checking disabled".to_string(),
        };
        let mut tally = LinkTally::default();
        for link in &links {
            tally.record(link.class, &skipped);
        }
        Ok(tally)
    }
}
