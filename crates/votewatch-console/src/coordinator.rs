//! Refresh cycles: concurrent fetch of every data source, all-or-nothing
//! commit of the rendered views.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::render::{render_poll, render_status};
use crate::{ClientError, MonitorBackend, SharedUiState};

/// Result of one refresh cycle.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// Both sources fetched and their views are on screen.
    Committed { cycle: u64 },
    /// A fetch failed; the previous views stay on screen.
    Failed { cycle: u64, error: ClientError },
    /// A newer cycle committed first; this one was dropped.
    Superseded { cycle: u64 },
}

impl CycleOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CycleOutcome::Committed { .. })
    }

    pub fn cycle(&self) -> u64 {
        match self {
            CycleOutcome::Committed { cycle }
            | CycleOutcome::Failed { cycle, .. }
            | CycleOutcome::Superseded { cycle } => *cycle,
        }
    }
}

/// Drives refresh cycles against a backend and commits their results into
/// the shared display state.
pub struct RefreshCoordinator {
    backend: Arc<dyn MonitorBackend>,
    state: SharedUiState,
    next_cycle: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(backend: Arc<dyn MonitorBackend>, state: SharedUiState) -> Self {
        Self {
            backend,
            state,
            next_cycle: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &Arc<dyn MonitorBackend> {
        &self.backend
    }

    pub fn state(&self) -> &SharedUiState {
        &self.state
    }

    /// Run one cycle.
    ///
    /// Clears the error region, fetches the tally and the membership view
    /// concurrently and renders only once both have settled. If either
    /// fetch fails nothing is rendered: the failure text is shown and the
    /// previous tables stay as they were. Cycles are numbered at start; a
    /// cycle that finishes after a newer one has committed is dropped.
    pub async fn refresh_all(&self) -> CycleOutcome {
        let cycle = self.next_cycle.fetch_add(1, Ordering::SeqCst) + 1;

        let poll_id = {
            let mut state = self.state.write().await;
            state.clear_error();
            state.form.poll_id.trim().to_string()
        };

        tracing::trace!(cycle, poll_id = %poll_id, "refresh cycle started");

        let (poll, status) = tokio::join!(
            self.backend.fetch_poll(&poll_id),
            self.backend.fetch_status()
        );

        let (poll, status) = match (poll, status) {
            (Ok(poll), Ok(status)) => (poll, status),
            (Err(error), _) | (_, Err(error)) => {
                let shown = self.state.write().await.fail_cycle(cycle, error.to_string());
                if shown {
                    tracing::warn!(cycle, error = %error, "refresh cycle failed");
                    return CycleOutcome::Failed { cycle, error };
                }
                tracing::debug!(cycle, error = %error, "dropping failure of superseded cycle");
                return CycleOutcome::Superseded { cycle };
            }
        };

        let poll_view = render_poll(&poll);
        let status_view = render_status(&status);

        let committed = self
            .state
            .write()
            .await
            .commit_cycle(cycle, poll_view, status_view, Local::now());

        if committed {
            tracing::debug!(
                cycle,
                options = poll.counts.len(),
                peers = status.peers.len(),
                "refresh cycle committed"
            );
            CycleOutcome::Committed { cycle }
        } else {
            tracing::debug!(cycle, "dropping superseded refresh cycle");
            CycleOutcome::Superseded { cycle }
        }
    }

    /// Run [`refresh_all`](Self::refresh_all) now and then every `period`.
    ///
    /// Each cycle runs on its own task, so a slow cycle never delays the
    /// next tick.
    pub fn spawn_refresh_loop(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(period_ms = period.as_millis() as u64, "refresh loop started");
            loop {
                ticker.tick().await;
                let coordinator = Arc::clone(&coordinator);
                tokio::spawn(async move {
                    coordinator.refresh_all().await;
                });
            }
        })
    }
}
