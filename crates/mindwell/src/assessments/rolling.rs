//! Rolling average projection over the most recent scores of a user and type.
//!
//! The projection is always rebuilt from the newest stored rows rather than
//! patched incrementally, which keeps it correct after deletes and
//! out-of-order inserts.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::domain::{Assessment, AssessmentType, RollingAverage, UserId};

/// Number of most recent scores folded into the rolling average.
pub const ROLLING_WINDOW: usize = 5;

/// Scores (newest first) and their mean.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingWindow {
    pub scores: Vec<u32>,
    pub average: f64,
}

impl RollingWindow {
    /// Builds the window from assessments already sorted newest first.
    ///
    /// Anything past [`ROLLING_WINDOW`] entries is ignored.
    pub fn from_recent(recent: &[Assessment]) -> Self {
        let scores: Vec<u32> = recent
            .iter()
            .take(ROLLING_WINDOW)
            .map(|assessment| assessment.score)
            .collect();
        let average = mean(&scores);
        Self { scores, average }
    }

    pub fn into_average(
        self,
        id: Uuid,
        user_id: UserId,
        assessment_type: AssessmentType,
        last_updated: DateTime<Utc>,
    ) -> RollingAverage {
        RollingAverage {
            id,
            user_id,
            assessment_type,
            five_day_average: self.average,
            last_five_scores: self.scores,
            last_updated,
        }
    }
}

/// Arithmetic mean, defined as `0.0` for an empty slice.
pub fn mean(scores: &[u32]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let total: u64 = scores.iter().map(|&score| u64::from(score)).sum();
    total as f64 / scores.len() as f64
}
