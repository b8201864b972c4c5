//! Display state shared by the refresh loop, the vote submitter and the
//! console.

use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore};

use crate::render::{PollView, StatusView};

pub type SharedUiState = Arc<RwLock<UiState>>;

/// Contents of the two input fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteForm {
    pub poll_id: String,
    pub option: String,
}

/// Single-permit gate around the submit control.
///
/// Holding a [`SubmitGuard`] means a vote is in flight and the control is
/// disabled; dropping the guard re-enables it.
#[derive(Debug, Clone)]
pub struct SubmitGate {
    permits: Arc<Semaphore>,
}

impl SubmitGate {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// Take the permit, or `None` if a submission already holds it.
    pub fn try_acquire(&self) -> Option<SubmitGuard> {
        self.permits
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| SubmitGuard { _permit: permit })
    }

    pub fn is_held(&self) -> bool {
        self.permits.available_permits() == 0
    }
}

impl Default for SubmitGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof that the holder owns the submit control.
#[derive(Debug)]
pub struct SubmitGuard {
    _permit: OwnedSemaphorePermit,
}

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        tracing::debug!("submit control released");
    }
}

/// Transient monitor state. Never persisted.
#[derive(Debug)]
pub struct UiState {
    /// Origin all requests go to, echoed in the header.
    pub origin: String,
    /// Current error text; empty means no error.
    pub error: String,
    /// Time of the last fully successful refresh.
    pub last_update: Option<DateTime<Local>>,
    /// Last committed tally view.
    pub poll: Option<PollView>,
    /// Last committed membership view.
    pub status: Option<StatusView>,
    pub form: VoteForm,
    pub submit_gate: SubmitGate,
    /// Sequence number of the cycle whose views are on screen.
    applied_cycle: u64,
}

impl UiState {
    pub fn new(origin: impl Into<String>, poll_id: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            error: String::new(),
            last_update: None,
            poll: None,
            status: None,
            form: VoteForm {
                poll_id: poll_id.into(),
                option: String::new(),
            },
            submit_gate: SubmitGate::new(),
            applied_cycle: 0,
        }
    }

    pub fn shared(self) -> SharedUiState {
        Arc::new(RwLock::new(self))
    }

    pub fn clear_error(&mut self) {
        self.error.clear();
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = message.into();
    }

    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }

    pub fn vote_in_flight(&self) -> bool {
        self.submit_gate.is_held()
    }

    pub fn applied_cycle(&self) -> u64 {
        self.applied_cycle
    }

    /// Install the views of `cycle` together. Returns `false`, leaving
    /// the state untouched, when a newer cycle is already on screen.
    pub fn commit_cycle(
        &mut self,
        cycle: u64,
        poll: PollView,
        status: StatusView,
        at: DateTime<Local>,
    ) -> bool {
        if cycle <= self.applied_cycle {
            return false;
        }
        self.applied_cycle = cycle;
        self.poll = Some(poll);
        self.status = Some(status);
        self.last_update = Some(at);
        true
    }

    /// Report the failure of `cycle`. Ignored when a newer cycle has
    /// already committed.
    pub fn fail_cycle(&mut self, cycle: u64, message: impl Into<String>) -> bool {
        if cycle <= self.applied_cycle {
            return false;
        }
        self.set_error(message);
        true
    }
}
