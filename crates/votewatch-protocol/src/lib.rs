//! votewatch protocol - wire types for the voting cluster HTTP API.
//!
//! Covers the three endpoints a monitor consumes: the keyed vote tally
//! (`GET /poll/{id}`), the membership view (`GET /status`) and the vote
//! action (`POST /vote`), plus the presentation categories derived from
//! raw membership states.

pub mod category;
pub mod constants;
pub mod error;
pub mod types;

pub use category::*;
pub use constants::*;
pub use error::*;
pub use types::*;
