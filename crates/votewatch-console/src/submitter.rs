//! Vote submission, serialized by the submit gate and followed by an
//! immediate refresh on success.

use std::sync::Arc;

use votewatch_protocol::{VoteReceipt, VoteRequest};

use crate::coordinator::{CycleOutcome, RefreshCoordinator};
use crate::state::SubmitGate;
use crate::ClientError;

/// What happened to a submission attempt.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The backend accepted the vote; `refresh` is the cycle run right after.
    Accepted {
        receipt: VoteReceipt,
        refresh: CycleOutcome,
    },
    /// The backend or the transport rejected the vote. No refresh was run.
    Rejected(ClientError),
    /// Another submission holds the control; nothing was sent.
    Busy,
}

pub struct VoteSubmitter {
    coordinator: Arc<RefreshCoordinator>,
    gate: SubmitGate,
}

impl VoteSubmitter {
    pub fn new(coordinator: Arc<RefreshCoordinator>, gate: SubmitGate) -> Self {
        Self { coordinator, gate }
    }

    pub fn is_submitting(&self) -> bool {
        self.gate.is_held()
    }

    /// Submit a vote for `option` in `poll_id`.
    ///
    /// The submit control stays disabled from the moment the permit is
    /// taken until this returns, including the follow-up refresh. Inputs
    /// are trimmed and otherwise sent as typed.
    pub async fn submit_vote(&self, poll_id: &str, option: &str) -> SubmitOutcome {
        let Some(_guard) = self.gate.try_acquire() else {
            tracing::debug!("vote submission already in flight, ignoring");
            return SubmitOutcome::Busy;
        };

        let vote = VoteRequest::new(poll_id, option);
        self.coordinator.state().write().await.clear_error();

        match self.coordinator.backend().submit_vote(&vote).await {
            Ok(receipt) => {
                tracing::info!(
                    poll_id = %vote.poll_id,
                    option = %vote.option,
                    node = receipt.node.as_deref().unwrap_or("-"),
                    "vote accepted"
                );
                let refresh = self.coordinator.refresh_all().await;
                SubmitOutcome::Accepted { receipt, refresh }
            }
            Err(error) => {
                tracing::warn!(
                    poll_id = %vote.poll_id,
                    option = %vote.option,
                    error = %error,
                    "vote rejected"
                );
                self.coordinator
                    .state()
                    .write()
                    .await
                    .set_error(error.to_string());
                SubmitOutcome::Rejected(error)
            }
        }
    }

    /// Submit whatever the input fields currently hold.
    pub async fn submit_from_form(&self) -> SubmitOutcome {
        let form = self.coordinator.state().read().await.form.clone();
        self.submit_vote(&form.poll_id, &form.option).await
    }
}
