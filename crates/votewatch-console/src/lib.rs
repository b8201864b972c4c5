//! votewatch console - monitor engine and terminal UI for a voting cluster.
//!
//! The engine polls the tally and membership endpoints on a fixed cadence,
//! renders each source into a display-ready view, and coordinates vote
//! submission with the refresh loop. The [`console`] module projects the
//! resulting [`state::UiState`] onto a terminal.

pub mod config;
pub mod console;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod render;
pub mod state;
pub mod submitter;

#[cfg(test)]
mod testing;

pub use config::MonitorConfig;
pub use coordinator::RefreshCoordinator;
pub use error::{ClientError, ConfigError};
pub use http::{HttpClient, MonitorBackend, RequestOptions};
pub use state::{SharedUiState, UiState};
pub use submitter::{SubmitOutcome, VoteSubmitter};
