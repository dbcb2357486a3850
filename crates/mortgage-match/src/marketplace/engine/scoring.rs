use serde::{Deserialize, Serialize};

use super::eligibility::{EligibilityResult, FactorKind};

const DEFAULT_POINTS_PER_CRITERION: u8 = 25;
const WEIGHTED_CRITERIA: u8 = 4;
const MAX_SCORE: u8 = 100;

/// Additive rubric: every satisfied weighted criterion contributes the same share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    points_per_criterion: u8,
}

impl ScoringConfig {
    /// Shares that are zero or would push a perfect match past 100 fall back to 25.
    pub fn new(points_per_criterion: u8) -> Self {
        let sanitized = if points_per_criterion > 0
            && u16::from(points_per_criterion) * u16::from(WEIGHTED_CRITERIA)
                <= u16::from(MAX_SCORE)
        {
            points_per_criterion
        } else {
            DEFAULT_POINTS_PER_CRITERION
        };

        Self {
            points_per_criterion: sanitized,
        }
    }

    pub fn points_per_criterion(&self) -> u8 {
        self.points_per_criterion
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POINTS_PER_CRITERION)
    }
}

/// Returns `None` when the offer fails its hard gate: no match is created in that case.
pub fn score(config: &ScoringConfig, evaluation: &EligibilityResult) -> Option<u8> {
    if FactorKind::ordered()
        .into_iter()
        .filter(|factor| factor.is_gate())
        .any(|gate| !evaluation.passed(gate))
    {
        return None;
    }

    let satisfied = evaluation
        .satisfied_criteria()
        .min(usize::from(WEIGHTED_CRITERIA)) as u8;
    Some(satisfied * config.points_per_criterion)
}
