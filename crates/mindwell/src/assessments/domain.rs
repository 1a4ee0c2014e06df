use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for stored assessments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssessmentId(pub Uuid);

impl AssessmentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for AssessmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque user identifier handed over by the identity layer and trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Screening questionnaires accepted by the assessment engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssessmentType {
    #[serde(rename = "PHQ-9")]
    Phq9,
    #[serde(rename = "GAD-7")]
    Gad7,
}

impl AssessmentType {
    pub fn ordered() -> [Self; 2] {
        [Self::Phq9, Self::Gad7]
    }

    /// Parses a caller supplied code, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_uppercase();
        Self::ordered()
            .into_iter()
            .find(|kind| kind.code() == normalized)
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Phq9 => "PHQ-9",
            Self::Gad7 => "GAD-7",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Phq9 => "Patient Health Questionnaire (depression)",
            Self::Gad7 => "Generalized Anxiety Disorder scale",
        }
    }

    pub fn max_score(self) -> u32 {
        match self {
            Self::Phq9 => 27,
            Self::Gad7 => 21,
        }
    }
}

impl fmt::Display for AssessmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Standard severity bands published alongside PHQ-9 and GAD-7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minimal,
    Mild,
    Moderate,
    ModeratelySevere,
    Severe,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::ModeratelySevere => "moderately severe",
            Self::Severe => "severe",
        }
    }
}

/// Raw questionnaire answers as received from a caller, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentSubmission {
    pub user_id: UserId,
    pub assessment_type: String,
    pub responses: Vec<i64>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl AssessmentSubmission {
    pub fn new(
        user_id: UserId,
        assessment_type: impl Into<String>,
        responses: impl Into<Vec<i64>>,
    ) -> Self {
        Self {
            user_id,
            assessment_type: assessment_type.into(),
            responses: responses.into(),
            submitted_at: None,
        }
    }

    pub fn at(mut self, submitted_at: DateTime<Utc>) -> Self {
        self.submitted_at = Some(submitted_at);
        self
    }
}

/// A scored questionnaire owned by a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: AssessmentId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub assessment_type: AssessmentType,
    pub score: u32,
    pub responses: Vec<u8>,
    pub severity: Severity,
    pub date: DateTime<Utc>,
}

/// Engine-owned projection of the five most recent scores for a user and type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingAverage {
    pub id: Uuid,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub assessment_type: AssessmentType,
    pub five_day_average: f64,
    pub last_five_scores: Vec<u32>,
    pub last_updated: DateTime<Utc>,
}
