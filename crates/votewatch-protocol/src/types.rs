use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtocolError;

/// One fetched tally for a single poll.
#[derive(Debug, Clone, PartialEq)]
pub struct PollSnapshot {
    /// The poll id the monitor asked for (trimmed).
    pub poll_id: String,
    /// Option label -> vote count. Unordered; renderers impose an order.
    pub counts: HashMap<String, u64>,
    /// Full response body, kept for the raw diagnostic view.
    pub raw: Value,
}

impl PollSnapshot {
    /// Decode a `GET /poll/{id}` response.
    ///
    /// A missing `counts` field is an empty tally. A `counts` that is not an
    /// object, a count that is not a non-negative integer, or counts whose
    /// total does not fit in a `u64`, is rejected.
    pub fn from_json(poll_id: &str, raw: Value) -> Result<Self, ProtocolError> {
        let counts = match raw.get("counts") {
            None | Some(Value::Null) => HashMap::new(),
            Some(Value::Object(map)) => {
                let mut counts = HashMap::with_capacity(map.len());
                for (option, count) in map {
                    let count = count.as_u64().ok_or_else(|| {
                        ProtocolError::MalformedPoll(format!(
                            "count for option '{option}' is not a non-negative integer: {count}"
                        ))
                    })?;
                    counts.insert(option.clone(), count);
                }
                counts
            }
            Some(other) => {
                return Err(ProtocolError::MalformedPoll(format!(
                    "'counts' must be an object, got {other}"
                )))
            }
        };

        if counts
            .values()
            .try_fold(0u64, |total, &count| total.checked_add(count))
            .is_none()
        {
            return Err(ProtocolError::MalformedPoll(
                "vote total overflows a 64-bit counter".to_string(),
            ));
        }

        Ok(Self {
            poll_id: poll_id.trim().to_string(),
            counts,
            raw,
        })
    }

    /// Sum of all counts, saturating at `u64::MAX`.
    pub fn total_votes(&self) -> u64 {
        self.counts
            .values()
            .fold(0u64, |total, &count| total.saturating_add(count))
    }
}

/// One member of the cluster as reported by `/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerEntry {
    /// Peer address or identifier.
    pub peer: String,
    /// Raw membership state as the backend labels it (e.g. `ALIVE`).
    #[serde(default, deserialize_with = "null_as_empty")]
    pub state: String,
    /// Seconds since the last heartbeat from this peer, if ever seen.
    #[serde(default, rename = "last_seen_seconds_ago")]
    pub last_seen_secs: Option<f64>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// One fetched membership view.
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipSnapshot {
    /// Node that answered the request, if reported.
    pub node: Option<String>,
    /// Peers in the order the backend listed them.
    pub peers: Vec<PeerEntry>,
    /// Full response body, kept for the raw diagnostic view.
    pub raw: Value,
}

impl MembershipSnapshot {
    /// Decode a `GET /status` response. A missing `peers` field is an
    /// empty membership; the listed order is preserved.
    pub fn from_json(raw: Value) -> Result<Self, ProtocolError> {
        let peers = match raw.get("peers") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(idx, item)| {
                    PeerEntry::deserialize(item).map_err(|e| {
                        ProtocolError::MalformedStatus(format!("peer #{idx}: {e}"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(ProtocolError::MalformedStatus(format!(
                    "'peers' must be an array, got {other}"
                )))
            }
        };

        let node = raw.get("node").and_then(Value::as_str).map(str::to_string);

        Ok(Self { node, peers, raw })
    }
}

/// Body of `POST /vote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub poll_id: String,
    pub option: String,
}

impl VoteRequest {
    /// Build a request from user input. Values are trimmed and nothing else;
    /// empty values go through and the backend decides.
    pub fn new(poll_id: &str, option: &str) -> Self {
        Self {
            poll_id: poll_id.trim().to_string(),
            option: option.trim().to_string(),
        }
    }

    /// JSON body for `POST /vote`.
    pub fn to_json(&self) -> Result<Value, ProtocolError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Acknowledgement returned by `POST /vote`. Every field is optional; only
/// the status code decides success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub node: Option<String>,
}

impl VoteReceipt {
    pub fn from_json(raw: &Value) -> Self {
        Self::deserialize(raw).unwrap_or_default()
    }
}
