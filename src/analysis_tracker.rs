//! Client-side cache and poll loop for the credit analyses of one proposal.
//!
//! The server owns every status transition. The tracker only applies records
//! the server returned, polls unfinished analyses at a fixed interval and
//! stops its timer as soon as nothing is left to wait for.
//!
//! ## Staleness
//!
//! Each poll cycle captures the tracker generation before issuing its status
//! checks. Reloading the history or closing the tracker bumps the generation,
//! and untracking removes the record, so a response that resolves afterwards
//! finds nothing to update and is dropped.

use futures::stream::{FuturesUnordered, StreamExt};
use moka::future::Cache;
use moka::notification::RemovalCause;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::analysis_client::AnalysisApi;
use crate::analysis_models::{
    AnalysisFilter, AnalysisId, AnalysisResult, CreditAnalysis, ProposalId, StatusCheck,
};
use crate::errors::{AppError, ResultExt};

/// What happened to one status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The cached record was replaced by the server's.
    Updated { finished: bool },
    /// Nothing changed, or the cached record is already terminal.
    Unchanged,
    /// The request is no longer tracked under this generation; response dropped.
    Discarded,
}

/// Tally of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollReport {
    pub checked: usize,
    pub updated: usize,
    pub finished: usize,
    pub failed: usize,
    pub discarded: usize,
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerSnapshot {
    pub proposal_id: ProposalId,
    /// Most recent first.
    pub analyses: Vec<CreditAnalysis>,
    pub selected: Option<CreditAnalysis>,
    pub pending: usize,
    pub polling: bool,
}

#[derive(Default)]
struct TrackerState {
    history: Vec<CreditAnalysis>,
    selected: Option<AnalysisId>,
    generation: u64,
    polling: bool,
}

impl TrackerState {
    fn pending_ids(&self) -> Vec<AnalysisId> {
        self.history
            .iter()
            .filter(|a| !a.is_terminal())
            .map(|a| a.id)
            .collect()
    }

    fn sort_history(&mut self) {
        self.history
            .sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    }

    fn select_most_recent(&mut self) {
        self.selected = self.history.first().map(|a| a.id);
    }
}

/// Tracks every credit analysis requested for one proposal.
pub struct AnalysisTracker {
    proposal_id: ProposalId,
    api: Arc<dyn AnalysisApi>,
    poll_interval: Duration,
    state: Mutex<TrackerState>,
    closed: AtomicBool,
    wake: Notify,
    shutdown: watch::Sender<bool>,
}

impl std::fmt::Debug for AnalysisTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisTracker")
            .field("proposal_id", &self.proposal_id)
            .field("poll_interval", &self.poll_interval)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl AnalysisTracker {
    pub fn new(
        proposal_id: ProposalId,
        api: Arc<dyn AnalysisApi>,
        poll_interval: Duration,
    ) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            proposal_id,
            api,
            poll_interval,
            state: Mutex::new(TrackerState::default()),
            closed: AtomicBool::new(false),
            wake: Notify::new(),
            shutdown,
        })
    }

    pub fn proposal_id(&self) -> ProposalId {
        self.proposal_id
    }

    /// Starts the poll loop on the runtime. It ends when [`close`](Self::close) is called.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run())
    }

    /// Poll loop: idle while nothing is pending, tick every `poll_interval`
    /// otherwise. The interval is dropped the moment the last pending analysis
    /// turns terminal and recreated when a new one shows up.
    pub async fn run(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();

        'outer: loop {
            if *shutdown.borrow() {
                break;
            }

            if !self.has_pending().await {
                self.set_polling(false).await;
                tokio::select! {
                    _ = self.wake.notified() => continue 'outer,
                    _ = shutdown.changed() => break 'outer,
                }
            }

            self.set_polling(true).await;
            tracing::debug!(
                "Polling analyses of proposal {} every {:?}",
                self.proposal_id,
                self.poll_interval
            );

            let start = Instant::now() + self.poll_interval;
            let mut ticker = time::interval_at(start, self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = self.poll_once().await;
                        tracing::debug!(
                            "Poll cycle for proposal {}: {:?}",
                            self.proposal_id,
                            report
                        );
                        if !self.has_pending().await {
                            tracing::info!(
                                "No unfinished analyses left for proposal {}, polling stopped",
                                self.proposal_id
                            );
                            continue 'outer;
                        }
                    }
                    _ = self.wake.notified() => {
                        if !self.has_pending().await {
                            tracing::debug!(
                                "Nothing left to poll for proposal {}, timer dropped",
                                self.proposal_id
                            );
                            continue 'outer;
                        }
                    }
                    _ = shutdown.changed() => break 'outer,
                }
            }
        }

        self.set_polling(false).await;
        tracing::debug!("Tracker for proposal {} stopped", self.proposal_id);
    }

    /// Replaces the history with the server's list and selects the most recent analysis.
    pub async fn load(&self) -> Result<usize, AppError> {
        let mut analyses = self
            .api
            .list_analyses(&AnalysisFilter::for_proposal(self.proposal_id))
            .await
            .with_context(|| format!("loading analyses of proposal {}", self.proposal_id))?;
        analyses.retain(|a| a.proposal.id == self.proposal_id);

        let loaded = analyses.len();
        {
            let mut state = self.state.lock().await;
            if self.is_closed() {
                tracing::debug!(
                    "Discarding analysis list for closed tracker of proposal {}",
                    self.proposal_id
                );
                return Ok(0);
            }
            state.history = analyses;
            state.sort_history();
            state.generation += 1;
            state.select_most_recent();
        }

        tracing::info!(
            "Loaded {} analyses for proposal {}",
            loaded,
            self.proposal_id
        );
        self.wake.notify_one();
        Ok(loaded)
    }

    /// Requests a new analysis and prepends it to the history without waiting
    /// for its result. A failed request leaves the history untouched.
    pub async fn submit(&self) -> Result<CreditAnalysis, AppError> {
        if self.is_closed() {
            return Err(AppError::BadRequest(format!(
                "tracker for proposal {} is closed",
                self.proposal_id
            )));
        }

        let analysis = match self.api.submit_analysis(self.proposal_id).await {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::error!(
                    "Failed to request credit analysis for proposal {}: {}",
                    self.proposal_id,
                    e
                );
                return Err(e);
            }
        };

        {
            let mut state = self.state.lock().await;
            if self.is_closed() {
                tracing::debug!(
                    "Analysis {} accepted after tracker of proposal {} closed, not tracked",
                    analysis.id,
                    self.proposal_id
                );
                return Ok(analysis);
            }
            if !state.history.iter().any(|a| a.id == analysis.id) {
                state.history.insert(0, analysis.clone());
                state.sort_history();
            }
            state.selected = Some(analysis.id);
        }

        if !analysis.is_terminal() {
            self.wake.notify_one();
        }
        Ok(analysis)
    }

    /// Issues one status check per unfinished analysis, concurrently, and
    /// applies each response as it arrives. Failed checks are logged and left
    /// for the next cycle.
    pub async fn poll_once(&self) -> PollReport {
        let (generation, pending) = {
            let state = self.state.lock().await;
            if self.is_closed() {
                return PollReport::default();
            }
            (state.generation, state.pending_ids())
        };

        let mut checks: FuturesUnordered<_> = pending
            .into_iter()
            .map(|id| {
                let api = Arc::clone(&self.api);
                async move { (id, api.get_analysis_status(id).await) }
            })
            .collect();

        let mut report = PollReport::default();
        while let Some((id, outcome)) = checks.next().await {
            report.checked += 1;
            match outcome {
                Ok(check) => match self.apply_status(generation, id, check).await {
                    ApplyOutcome::Updated { finished } => {
                        report.updated += 1;
                        if finished {
                            report.finished += 1;
                        }
                    }
                    ApplyOutcome::Unchanged => {}
                    ApplyOutcome::Discarded => report.discarded += 1,
                },
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        "Status check of analysis {} failed, retrying next cycle: {}",
                        id,
                        e
                    );
                }
            }
        }

        report
    }

    pub(crate) async fn apply_status(
        &self,
        generation: u64,
        requested: AnalysisId,
        check: StatusCheck,
    ) -> ApplyOutcome {
        let mut state = self.state.lock().await;
        if self.is_closed() || state.generation != generation {
            tracing::debug!("Dropping superseded status of analysis {}", requested);
            return ApplyOutcome::Discarded;
        }

        let mut analysis = check.analysis;
        if analysis.id != requested || analysis.proposal.id != self.proposal_id {
            tracing::warn!(
                "Status response for analysis {} carried analysis {} of proposal {}, ignored",
                requested,
                analysis.id,
                analysis.proposal.id
            );
            return ApplyOutcome::Discarded;
        }
        analysis.status = check.status;

        let Some(slot) = state.history.iter_mut().find(|a| a.id == requested) else {
            tracing::debug!("Analysis {} no longer tracked, status dropped", requested);
            return ApplyOutcome::Discarded;
        };

        if slot.is_terminal() || *slot == analysis {
            return ApplyOutcome::Unchanged;
        }

        let finished = analysis.is_terminal();
        if finished {
            tracing::info!(
                "Analysis {} finished as {} (result: {:?})",
                analysis.id,
                analysis.status.as_str(),
                analysis.outcome().map(|r| r.as_str())
            );
        }
        *slot = analysis;
        ApplyOutcome::Updated { finished }
    }

    /// Stops tracking one analysis; an in-flight check for it will be dropped.
    pub async fn untrack(&self, analysis_id: AnalysisId) -> bool {
        let mut state = self.state.lock().await;
        let before = state.history.len();
        state.history.retain(|a| a.id != analysis_id);
        let removed = state.history.len() != before;
        if removed && state.selected == Some(analysis_id) {
            state.select_most_recent();
        }
        drop(state);

        if removed {
            self.wake.notify_one();
        }
        removed
    }

    pub async fn select(&self, analysis_id: AnalysisId) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        if !state.history.iter().any(|a| a.id == analysis_id) {
            return Err(AppError::NotFound(format!(
                "analysis {} is not tracked for proposal {}",
                analysis_id, self.proposal_id
            )));
        }
        state.selected = Some(analysis_id);
        Ok(())
    }

    /// Manual override through the privileged endpoint. The server's returned
    /// record replaces the cached one, terminal or not.
    pub async fn override_result(
        &self,
        analysis_id: AnalysisId,
        result: AnalysisResult,
    ) -> Result<CreditAnalysis, AppError> {
        if !self
            .state
            .lock()
            .await
            .history
            .iter()
            .any(|a| a.id == analysis_id)
        {
            return Err(AppError::NotFound(format!(
                "analysis {} is not tracked for proposal {}",
                analysis_id, self.proposal_id
            )));
        }

        let updated = self
            .api
            .update_analysis_result(analysis_id, result)
            .await
            .with_context(|| format!("overriding result of analysis {}", analysis_id))?;

        let mut state = self.state.lock().await;
        if !self.is_closed() {
            if let Some(slot) = state.history.iter_mut().find(|a| a.id == analysis_id) {
                *slot = updated.clone();
            }
        }
        drop(state);

        self.wake.notify_one();
        Ok(updated)
    }

    /// Stops the poll loop and drops any response still in flight. Idempotent.
    pub async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::info!("Closing analysis tracker for proposal {}", self.proposal_id);
        }
        self.state.lock().await.generation += 1;
        self.shutdown.send_replace(true);
    }

    /// Marks the tracker closed and stops the poll loop without taking the
    /// state lock, for synchronous callers such as the registry's eviction
    /// listener. Submissions are refused and in-flight responses dropped
    /// from here on.
    pub fn signal_shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.shutdown.send_replace(true);
    }

    pub async fn snapshot(&self) -> TrackerSnapshot {
        let state = self.state.lock().await;
        let selected = state
            .selected
            .and_then(|id| state.history.iter().find(|a| a.id == id).cloned());
        TrackerSnapshot {
            proposal_id: self.proposal_id,
            analyses: state.history.clone(),
            selected,
            pending: state.pending_ids().len(),
            polling: state.polling,
        }
    }

    pub async fn history(&self) -> Vec<CreditAnalysis> {
        self.state.lock().await.history.clone()
    }

    pub async fn selected_id(&self) -> Option<AnalysisId> {
        self.state.lock().await.selected
    }

    pub async fn is_polling(&self) -> bool {
        self.state.lock().await.polling
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn has_pending(&self) -> bool {
        let state = self.state.lock().await;
        !self.is_closed() && state.history.iter().any(|a| !a.is_terminal())
    }

    async fn set_polling(&self, polling: bool) {
        self.state.lock().await.polling = polling;
    }
}

/// One tracker per proposal, closed once idle for the configured time.
#[derive(Clone)]
pub struct TrackerRegistry {
    api: Arc<dyn AnalysisApi>,
    poll_interval: Duration,
    trackers: Cache<ProposalId, Arc<AnalysisTracker>>,
}

impl TrackerRegistry {
    pub fn new(api: Arc<dyn AnalysisApi>, poll_interval: Duration, idle: Duration) -> Self {
        let trackers = Cache::builder()
            .time_to_idle(idle)
            .max_capacity(10_000)
            .eviction_listener(
                |proposal_id: Arc<ProposalId>, tracker: Arc<AnalysisTracker>, cause: RemovalCause| {
                    tracing::info!(
                        "Analysis tracker for proposal {} evicted ({:?})",
                        proposal_id,
                        cause
                    );
                    tracker.signal_shutdown();
                },
            )
            .build();

        Self {
            api,
            poll_interval,
            trackers,
        }
    }

    /// Returns the proposal's tracker, creating, loading and starting it on first use.
    pub async fn open(&self, proposal_id: ProposalId) -> Result<Arc<AnalysisTracker>, AppError> {
        let api = Arc::clone(&self.api);
        let poll_interval = self.poll_interval;

        self.trackers
            .try_get_with(proposal_id, async move {
                let tracker = AnalysisTracker::new(proposal_id, api, poll_interval);
                tracker.load().await?;
                tracker.spawn();
                Ok::<_, AppError>(tracker)
            })
            .await
            .map_err(|e| (*e).clone())
    }

    pub async fn get(&self, proposal_id: ProposalId) -> Option<Arc<AnalysisTracker>> {
        self.trackers.get(&proposal_id).await
    }

    /// Runs pending cache maintenance so trackers past their idle time are
    /// evicted and shut down now rather than on the next cache write.
    pub async fn evict_idle(&self) {
        self.trackers.run_pending_tasks().await;
    }

    /// Closes and forgets the proposal's tracker. Returns false when none was open.
    pub async fn close(&self, proposal_id: ProposalId) -> bool {
        match self.trackers.remove(&proposal_id).await {
            Some(tracker) => {
                tracker.close().await;
                true
            }
            None => false,
        }
    }
}
