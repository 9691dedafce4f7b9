//! Pipeline stages and the per-pair state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four fixed stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Docking,
    PoseExtraction,
    AffinityEstimation,
    InteractionProfiling,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Docking,
        Stage::PoseExtraction,
        Stage::AffinityEstimation,
        Stage::InteractionProfiling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Docking => "docking",
            Stage::PoseExtraction => "pose_extraction",
            Stage::AffinityEstimation => "affinity_estimation",
            Stage::InteractionProfiling => "interaction_profiling",
        }
    }

    /// The state a pair is in while this stage runs.
    pub fn state(&self) -> PairState {
        match self {
            Stage::Docking => PairState::Docking,
            Stage::PoseExtraction => PairState::PoseExtraction,
            Stage::AffinityEstimation => PairState::AffinityEstimation,
            Stage::InteractionProfiling => PairState::InteractionProfiling,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Pending → Docking → PoseExtraction → AffinityEstimation → InteractionProfiling → Done`,
/// with `Failed` reachable from any running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairState {
    Pending,
    Docking,
    PoseExtraction,
    AffinityEstimation,
    InteractionProfiling,
    Done,
    Failed,
}

impl PairState {
    /// The stage running in this state, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PairState::Docking => Some(Stage::Docking),
            PairState::PoseExtraction => Some(Stage::PoseExtraction),
            PairState::AffinityEstimation => Some(Stage::AffinityEstimation),
            PairState::InteractionProfiling => Some(Stage::InteractionProfiling),
            PairState::Pending | PairState::Done | PairState::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PairState::Done | PairState::Failed)
    }

    /// Next state on success. Terminal states stay where they are.
    pub fn advance(&self) -> PairState {
        match self {
            PairState::Pending => PairState::Docking,
            PairState::Docking => PairState::PoseExtraction,
            PairState::PoseExtraction => PairState::AffinityEstimation,
            PairState::AffinityEstimation => PairState::InteractionProfiling,
            PairState::InteractionProfiling => PairState::Done,
            PairState::Done => PairState::Done,
            PairState::Failed => PairState::Failed,
        }
    }
}

impl fmt::Display for PairState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PairState::Pending => "pending",
            PairState::Docking => "docking",
            PairState::PoseExtraction => "pose_extraction",
            PairState::AffinityEstimation => "affinity_estimation",
            PairState::InteractionProfiling => "interaction_profiling",
            PairState::Done => "done",
            PairState::Failed => "failed",
        };
        f.write_str(s)
    }
}
