use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Assessment, AssessmentId, AssessmentType, RollingAverage, Severity, UserId};

/// Document store seam covering the assessment and rolling-average collections.
pub trait AssessmentRepository: Send + Sync {
    /// Stores a new assessment under its calendar day.
    ///
    /// Fails with [`RepositoryError::Conflict`] when the user already has an
    /// assessment of the same type on that day.
    fn insert(&self, assessment: Assessment, day: NaiveDate) -> Result<Assessment, RepositoryError>;

    fn fetch(&self, id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError>;

    /// First assessment of the type whose date lies in `[start, end)`.
    fn find_in_window(
        &self,
        user_id: &UserId,
        assessment_type: AssessmentType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<Assessment>, RepositoryError>;

    /// Removes and returns the assessment, if it existed.
    fn delete(&self, id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError>;

    /// Newest-first assessments for the user, optionally of a single type.
    fn recent(
        &self,
        user_id: &UserId,
        assessment_type: Option<AssessmentType>,
        limit: usize,
    ) -> Result<Vec<Assessment>, RepositoryError>;

    /// Newest-first assessments dated at or after `since`.
    fn since(
        &self,
        user_id: &UserId,
        assessment_type: Option<AssessmentType>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Assessment>, RepositoryError>;

    /// Creates or replaces the average keyed by user and type, keeping the
    /// stored id when one exists.
    fn upsert_average(&self, average: RollingAverage) -> Result<RollingAverage, RepositoryError>;

    fn fetch_average(
        &self,
        user_id: &UserId,
        assessment_type: AssessmentType,
    ) -> Result<Option<RollingAverage>, RepositoryError>;

    fn averages_for(&self, user_id: &UserId) -> Result<Vec<RollingAverage>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for counselor escalation (pager, e-mail, dashboard feed).
pub trait AlertPublisher: Send + Sync {
    fn publish(&self, alert: CrisisAlert) -> Result<(), AlertError>;
}

/// Payload raised when a submission indicates elevated risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrisisAlert {
    pub assessment_id: AssessmentId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub assessment_type: AssessmentType,
    pub score: u32,
    pub severity: Severity,
    pub reasons: Vec<String>,
}

/// Alert dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
}
