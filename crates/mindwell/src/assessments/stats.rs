use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Assessment, AssessmentType};
use super::rolling::mean;

/// Count and score spread over a set of assessments. All zero when empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSummary {
    pub count: usize,
    pub average_score: f64,
    pub max_score: u32,
    pub min_score: u32,
}

impl ScoreSummary {
    pub fn from_scores(scores: &[u32]) -> Self {
        Self {
            count: scores.len(),
            average_score: mean(scores),
            max_score: scores.iter().copied().max().unwrap_or(0),
            min_score: scores.iter().copied().min().unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentStats {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub assessment_type: Option<AssessmentType>,
    pub period_days: i64,
    pub since: DateTime<Utc>,
    #[serde(flatten)]
    pub overall: ScoreSummary,
    /// Present only when no type filter was applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_type: Option<BTreeMap<AssessmentType, ScoreSummary>>,
}

/// Aggregates assessments that were already filtered to the period.
pub fn summarize(
    assessments: &[Assessment],
    assessment_type: Option<AssessmentType>,
    period_days: i64,
    since: DateTime<Utc>,
) -> AssessmentStats {
    let scores_for = |kind: Option<AssessmentType>| -> Vec<u32> {
        assessments
            .iter()
            .filter(|assessment| kind.map_or(true, |kind| assessment.assessment_type == kind))
            .map(|assessment| assessment.score)
            .collect()
    };

    let overall = ScoreSummary::from_scores(&scores_for(assessment_type));
    let by_type = match assessment_type {
        Some(_) => None,
        None => Some(
            AssessmentType::ordered()
                .into_iter()
                .map(|kind| (kind, ScoreSummary::from_scores(&scores_for(Some(kind)))))
                .collect(),
        ),
    };

    AssessmentStats {
        assessment_type,
        period_days,
        since,
        overall,
        by_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_of_nothing_is_all_zero() {
        let summary = ScoreSummary::from_scores(&[]);
        assert_eq!(summary, ScoreSummary::default());
        assert_eq!(summary.average_score, 0.0);
    }

    #[test]
    fn summary_tracks_spread() {
        let summary = ScoreSummary::from_scores(&[12, 3, 9]);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average_score, 8.0);
        assert_eq!(summary.max_score, 12);
        assert_eq!(summary.min_score, 3);
    }

    #[test]
    fn breakdown_serializes_with_type_codes() {
        let since = DateTime::from_timestamp(0, 0).expect("epoch");
        let stats = summarize(&[], None, 30, since);
        let value = serde_json::to_value(&stats).expect("serializes");

        assert_eq!(value["count"], 0);
        assert_eq!(value["averageScore"], 0.0);
        assert_eq!(value["byType"]["PHQ-9"]["count"], 0);
        assert_eq!(value["byType"]["GAD-7"]["maxScore"], 0);
        assert!(value.get("type").is_none());
    }
}
