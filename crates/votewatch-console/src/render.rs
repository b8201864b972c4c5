//! Snapshot → view projection.
//!
//! Each data source has its own entry point and its own view type; a view
//! is a pure function of the snapshot it came from, so rendering the same
//! snapshot twice yields equal views.

use votewatch_protocol::{
    classify, MembershipSnapshot, PollSnapshot, PresentationCategory, NO_PEERS_PLACEHOLDER,
    NO_VOTES_PLACEHOLDER,
};

/// A row of the tally table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TallyRow {
    Entry { option: String, count: u64 },
    /// Shown instead of an empty table when the poll has no options.
    Placeholder(String),
}

/// Rendered tally for one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollView {
    pub poll_id: String,
    pub rows: Vec<TallyRow>,
    pub total_votes: u64,
    /// Pretty-printed response body.
    pub raw_json: String,
}

/// A row of the membership table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerRow {
    Entry {
        peer: String,
        /// State text exactly as the backend sent it.
        state: String,
        category: PresentationCategory,
        last_seen: Option<String>,
    },
    Placeholder(String),
}

/// Rendered membership view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub node: Option<String>,
    pub rows: Vec<PeerRow>,
    pub raw_json: String,
}

/// Rebuild the tally table for `snapshot`, options in lexicographic order.
pub fn render_poll(snapshot: &PollSnapshot) -> PollView {
    let mut options: Vec<(&String, &u64)> = snapshot.counts.iter().collect();
    options.sort_by(|a, b| a.0.cmp(b.0));

    let rows = if options.is_empty() {
        vec![TallyRow::Placeholder(NO_VOTES_PLACEHOLDER.to_string())]
    } else {
        options
            .into_iter()
            .map(|(option, count)| TallyRow::Entry {
                option: option.clone(),
                count: *count,
            })
            .collect()
    };

    PollView {
        poll_id: snapshot.poll_id.clone(),
        rows,
        total_votes: snapshot.total_votes(),
        raw_json: pretty(&snapshot.raw),
    }
}

/// Rebuild the membership table for `snapshot` in source order.
pub fn render_status(snapshot: &MembershipSnapshot) -> StatusView {
    let rows = if snapshot.peers.is_empty() {
        vec![PeerRow::Placeholder(NO_PEERS_PLACEHOLDER.to_string())]
    } else {
        snapshot
            .peers
            .iter()
            .map(|p| PeerRow::Entry {
                peer: p.peer.clone(),
                state: p.state.clone(),
                category: classify(&p.state),
                last_seen: p.last_seen_secs.map(|s| format!("{s:.1}s ago")),
            })
            .collect()
    };

    StatusView {
        node: snapshot.node.clone(),
        rows,
        raw_json: pretty(&snapshot.raw),
    }
}

fn pretty(raw: &serde_json::Value) -> String {
    serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string())
}

/// Plain-text projections used by the non-interactive commands.
pub mod text {
    use super::{PeerRow, PollView, StatusView, TallyRow};

    pub fn format_poll(view: &PollView) -> String {
        let mut out = format!("Poll {} ({} votes)\n", view.poll_id, view.total_votes);
        for row in &view.rows {
            match row {
                TallyRow::Entry { option, count } => {
                    out.push_str(&format!("  {option:<24} {count:>8}\n"));
                }
                TallyRow::Placeholder(msg) => {
                    out.push_str(&format!("  {msg}\n"));
                }
            }
        }
        out
    }

    pub fn format_status(view: &StatusView) -> String {
        let mut out = match &view.node {
            Some(node) => format!("Cluster status (via {node})\n"),
            None => "Cluster status\n".to_string(),
        };
        for row in &view.rows {
            match row {
                PeerRow::Entry {
                    peer,
                    state,
                    category,
                    last_seen,
                } => {
                    out.push_str(&format!(
                        "  {peer:<28} {state:<10} [{category}]{}\n",
                        last_seen
                            .as_deref()
                            .map(|s| format!(" {s}"))
                            .unwrap_or_default()
                    ));
                }
                PeerRow::Placeholder(msg) => {
                    out.push_str(&format!("  {msg}\n"));
                }
            }
        }
        out
    }
}
