use std::time::Duration;

/// Path of the membership view.
pub const STATUS_PATH: &str = "/status";

/// Path of the vote action.
pub const VOTE_PATH: &str = "/vote";

/// Path prefix of the keyed tally; the poll id is appended as one segment.
pub const POLL_PATH_PREFIX: &str = "/poll";

/// Period between automatic refresh cycles.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(2000);

/// Poll shown when nothing else is configured.
pub const DEFAULT_POLL_ID: &str = "poll1";

/// Placeholder row for a tally with no options.
pub const NO_VOTES_PLACEHOLDER: &str = "(no votes yet)";

/// Placeholder row for a membership view with no peers.
pub const NO_PEERS_PLACEHOLDER: &str = "(no peers configured)";
