use serde::{Deserialize, Serialize};

/// Visual classification of a peer's raw membership state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationCategory {
    Alive,
    Suspect,
    Dead,
    Unknown,
}

impl PresentationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresentationCategory::Alive => "alive",
            PresentationCategory::Suspect => "suspect",
            PresentationCategory::Dead => "dead",
            PresentationCategory::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PresentationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a raw membership state to its presentation category.
///
/// Case-insensitive exact match against `alive`, `suspect` and `dead`.
/// Anything else, including the empty string, is `Unknown`.
pub fn classify(raw_state: &str) -> PresentationCategory {
    if raw_state.eq_ignore_ascii_case("alive") {
        PresentationCategory::Alive
    } else if raw_state.eq_ignore_ascii_case("suspect") {
        PresentationCategory::Suspect
    } else if raw_state.eq_ignore_ascii_case("dead") {
        PresentationCategory::Dead
    } else {
        PresentationCategory::Unknown
    }
}
