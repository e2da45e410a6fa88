//! Per-section pipeline run state.

use serde::{Deserialize, Serialize};

/// Where a section is in its lifecycle.
///
/// `Finalized` and `Failed` are terminal. A failed section is reported and
/// excluded from the merge.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SectionState {
    /// Source exists but has not been rendered
    CodeGenerated,
    /// A render is in flight
    Rendering,
    /// The last render failed and a repair is pending
    RenderFailed,
    /// The current code has a valid video
    RenderSucceeded,
    /// Waiting on critique of the current video
    CritiquePending,
    /// A revision attempt is in progress
    Revising,
    /// A revision failed and the section was restored
    RolledBack,
    /// Done, with a valid video
    Finalized,
    /// Every budget exhausted without a valid video
    Failed,
}

impl SectionState {
    /// Whether no further transitions happen from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SectionState::Finalized | SectionState::Failed)
    }

    /// Whether the section contributes to the merge.
    pub fn has_video(&self) -> bool {
        matches!(
            self,
            SectionState::RenderSucceeded | SectionState::RolledBack | SectionState::Finalized
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_exactly_two_terminal_states() {
        let terminal: Vec<_> = SectionState::iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![SectionState::Finalized, SectionState::Failed]);
    }

    #[test]
    fn test_display_snake_case() {
        assert_eq!(SectionState::RenderFailed.to_string(), "render_failed");
        assert_eq!("rolled_back".parse::<SectionState>().unwrap(), SectionState::RolledBack);
    }
}
