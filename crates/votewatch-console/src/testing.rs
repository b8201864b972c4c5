//! Scripted in-memory backend for engine tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use votewatch_protocol::{MembershipSnapshot, PollSnapshot, VoteReceipt, VoteRequest};

use crate::{ClientError, MonitorBackend};

type Scripted = (Duration, Result<Value, ClientError>);

#[derive(Default)]
struct Calls {
    poll: usize,
    status: usize,
    votes: Vec<VoteRequest>,
}

/// Answers from a fixed default per endpoint, or from a per-call script
/// when one is queued. A successful vote bumps the default tally.
pub struct FakeBackend {
    poll: Mutex<Result<Value, ClientError>>,
    status: Mutex<Result<Value, ClientError>>,
    vote: Mutex<Result<Value, ClientError>>,
    poll_script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Calls>,
}

impl FakeBackend {
    pub fn new(poll: Value, status: Value) -> Self {
        Self {
            poll: Mutex::new(Ok(poll)),
            status: Mutex::new(Ok(status)),
            vote: Mutex::new(Ok(json!({"ok": true, "node": "fake"}))),
            poll_script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Calls::default()),
        }
    }

    pub fn set_poll(&self, result: Result<Value, ClientError>) {
        *self.poll.lock().unwrap() = result;
    }

    pub fn set_status(&self, result: Result<Value, ClientError>) {
        *self.status.lock().unwrap() = result;
    }

    pub fn set_vote(&self, result: Result<Value, ClientError>) {
        *self.vote.lock().unwrap() = result;
    }

    /// Queue the answer for the next poll fetch.
    pub fn push_poll(&self, delay: Duration, result: Result<Value, ClientError>) {
        self.poll_script.lock().unwrap().push_back((delay, result));
    }

    pub fn poll_calls(&self) -> usize {
        self.calls.lock().unwrap().poll
    }

    pub fn status_calls(&self) -> usize {
        self.calls.lock().unwrap().status
    }

    pub fn votes(&self) -> Vec<VoteRequest> {
        self.calls.lock().unwrap().votes.clone()
    }
}

pub fn http_error(status: u16, status_text: &str, body: &str) -> ClientError {
    ClientError::Http {
        status,
        status_text: status_text.to_string(),
        body: body.to_string(),
    }
}

#[async_trait]
impl MonitorBackend for FakeBackend {
    async fn fetch_poll(&self, poll_id: &str) -> Result<PollSnapshot, ClientError> {
        self.calls.lock().unwrap().poll += 1;
        let scripted = self.poll_script.lock().unwrap().pop_front();
        let result = match scripted {
            Some((delay, result)) => {
                tokio::time::sleep(delay).await;
                result
            }
            None => self.poll.lock().unwrap().clone(),
        };
        Ok(PollSnapshot::from_json(poll_id, result?)?)
    }

    async fn fetch_status(&self) -> Result<MembershipSnapshot, ClientError> {
        self.calls.lock().unwrap().status += 1;
        let result = self.status.lock().unwrap().clone();
        Ok(MembershipSnapshot::from_json(result?)?)
    }

    async fn submit_vote(&self, vote: &VoteRequest) -> Result<VoteReceipt, ClientError> {
        self.calls.lock().unwrap().votes.push(vote.clone());
        let body = self.vote.lock().unwrap().clone()?;

        if let Ok(poll) = self.poll.lock().unwrap().as_mut() {
            let counts = poll
                .as_object_mut()
                .map(|o| o.entry("counts").or_insert_with(|| json!({})));
            if let Some(Value::Object(counts)) = counts {
                let current = counts.get(&vote.option).and_then(Value::as_u64).unwrap_or(0);
                counts.insert(vote.option.clone(), json!(current + 1));
            }
        }

        Ok(VoteReceipt::from_json(&body))
    }

    fn origin(&self) -> String {
        "http://fake.invalid".to_string()
    }
}
