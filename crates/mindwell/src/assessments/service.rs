use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::calendar::{Clock, DayBoundary, SystemClock};
use super::catalog::{Question, QuestionCatalog};
use super::domain::{
    Assessment, AssessmentId, AssessmentSubmission, AssessmentType, RollingAverage, UserId,
};
use super::repository::{AlertPublisher, AssessmentRepository, CrisisAlert, RepositoryError};
use super::rolling::{RollingWindow, ROLLING_WINDOW};
use super::scoring::{self, ResponseViolation};
use super::stats::{self, AssessmentStats};

/// Tunables for the engine, normally derived from `AssessmentConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub day_boundary: DayBoundary,
    pub history_limit: usize,
    pub stats_period_days: i64,
    pub enforce_question_count: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            day_boundary: DayBoundary::utc(),
            history_limit: 10,
            stats_period_days: 30,
            enforce_question_count: true,
        }
    }
}

/// Assessment engine: validation, scoring, one-per-day enforcement and the
/// rolling average projection.
pub struct AssessmentService<R, A> {
    repository: Arc<R>,
    alerts: Arc<A>,
    catalog: Arc<QuestionCatalog>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl<R, A> AssessmentService<R, A>
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    pub fn new(
        repository: Arc<R>,
        alerts: Arc<A>,
        catalog: QuestionCatalog,
        settings: EngineSettings,
    ) -> Self {
        Self {
            repository,
            alerts,
            catalog: Arc::new(catalog),
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    /// Validate, score and store a questionnaire, then refresh the projection.
    pub fn submit(
        &self,
        submission: AssessmentSubmission,
    ) -> Result<Assessment, AssessmentServiceError> {
        let AssessmentSubmission {
            user_id,
            assessment_type,
            responses,
            submitted_at,
        } = submission;

        let assessment_type = parse_assessment_type(&assessment_type)?;
        let responses = scoring::validate_responses(&responses)?;

        let expected = self
            .catalog
            .question_count(assessment_type)
            .ok_or_else(|| AssessmentServiceError::QuestionsNotFound(assessment_type.to_string()))?;
        if self.settings.enforce_question_count {
            scoring::check_question_count(expected, responses.len())?;
        }

        let date = submitted_at.unwrap_or_else(|| self.clock.now());
        let window = self.settings.day_boundary.window(date);
        if self
            .repository
            .find_in_window(&user_id, assessment_type, window.start, window.end)?
            .is_some()
        {
            return Err(AssessmentServiceError::DuplicateSubmission { assessment_type });
        }

        let score = scoring::total_score(&responses);
        let severity = scoring::severity_for(assessment_type, score);
        let assessment = Assessment {
            id: AssessmentId::generate(),
            user_id,
            assessment_type,
            score,
            responses,
            severity,
            date,
        };

        let stored = match self.repository.insert(assessment, window.day) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => {
                return Err(AssessmentServiceError::DuplicateSubmission { assessment_type })
            }
            Err(err) => return Err(err.into()),
        };

        info!(
            assessment_id = %stored.id,
            user_id = %stored.user_id,
            assessment_type = %stored.assessment_type,
            score = stored.score,
            "assessment recorded"
        );

        self.refresh_projection(&stored.user_id, stored.assessment_type);
        self.raise_crisis_alert(&stored);

        Ok(stored)
    }

    /// Rebuild the rolling average for a pair from its newest stored rows.
    pub fn recompute_rolling_average(
        &self,
        user_id: &UserId,
        assessment_type: AssessmentType,
    ) -> Result<RollingAverage, AssessmentServiceError> {
        let recent = self
            .repository
            .recent(user_id, Some(assessment_type), ROLLING_WINDOW)?;
        let window = RollingWindow::from_recent(&recent);
        debug!(
            user_id = %user_id,
            assessment_type = %assessment_type,
            samples = window.scores.len(),
            average = window.average,
            "rolling average recomputed"
        );

        let average =
            window.into_average(Uuid::new_v4(), user_id.clone(), assessment_type, self.clock.now());
        Ok(self.repository.upsert_average(average)?)
    }

    /// Delete an assessment the caller owns.
    ///
    /// Missing and foreign records are reported identically.
    pub fn delete(
        &self,
        user_id: &UserId,
        assessment_id: &AssessmentId,
    ) -> Result<Assessment, AssessmentServiceError> {
        let owned = self
            .repository
            .fetch(assessment_id)?
            .filter(|assessment| &assessment.user_id == user_id)
            .ok_or(AssessmentServiceError::NotFoundOrForbidden)?;

        let deleted = self
            .repository
            .delete(&owned.id)?
            .ok_or(AssessmentServiceError::NotFoundOrForbidden)?;

        info!(
            assessment_id = %deleted.id,
            user_id = %deleted.user_id,
            assessment_type = %deleted.assessment_type,
            "assessment deleted"
        );

        self.refresh_projection(&deleted.user_id, deleted.assessment_type);
        Ok(deleted)
    }

    pub fn history(
        &self,
        user_id: &UserId,
        assessment_type: Option<AssessmentType>,
        limit: Option<usize>,
    ) -> Result<Vec<Assessment>, AssessmentServiceError> {
        let limit = limit.unwrap_or(self.settings.history_limit);
        Ok(self.repository.recent(user_id, assessment_type, limit)?)
    }

    pub fn averages(&self, user_id: &UserId) -> Result<Vec<RollingAverage>, AssessmentServiceError> {
        Ok(self.repository.averages_for(user_id)?)
    }

    /// The assessment of `assessment_type` completed in the current calendar day.
    pub fn today(
        &self,
        user_id: &UserId,
        assessment_type: AssessmentType,
    ) -> Result<Option<Assessment>, AssessmentServiceError> {
        let window = self.settings.day_boundary.window(self.clock.now());
        Ok(self
            .repository
            .find_in_window(user_id, assessment_type, window.start, window.end)?)
    }

    pub fn stats(
        &self,
        user_id: &UserId,
        assessment_type: Option<AssessmentType>,
        period_days: Option<i64>,
    ) -> Result<AssessmentStats, AssessmentServiceError> {
        let period_days = period_days.unwrap_or(self.settings.stats_period_days);
        let since = Some(period_days)
            .filter(|days| *days > 0)
            .and_then(Duration::try_days)
            .and_then(|period| self.clock.now().checked_sub_signed(period))
            .ok_or(AssessmentServiceError::InvalidPeriod(period_days))?;

        let assessments = self.repository.since(user_id, assessment_type, since)?;
        Ok(stats::summarize(
            &assessments,
            assessment_type,
            period_days,
            since,
        ))
    }

    /// Recompute every rolling average of the user, surfacing failures.
    pub fn rebuild_rolling_averages(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<RollingAverage>, AssessmentServiceError> {
        let rebuilt = AssessmentType::ordered()
            .into_iter()
            .map(|kind| self.recompute_rolling_average(user_id, kind))
            .collect::<Result<Vec<_>, _>>()?;
        info!(user_id = %user_id, pairs = rebuilt.len(), "rolling averages rebuilt");
        Ok(rebuilt)
    }

    pub fn questions(&self, code: &str) -> Result<&[Question], AssessmentServiceError> {
        self.catalog
            .questions(code)
            .ok_or_else(|| AssessmentServiceError::QuestionsNotFound(code.trim().to_string()))
    }

    fn refresh_projection(&self, user_id: &UserId, assessment_type: AssessmentType) {
        if let Err(err) = self.recompute_rolling_average(user_id, assessment_type) {
            warn!(
                user_id = %user_id,
                assessment_type = %assessment_type,
                error = %err,
                "rolling average update failed; stored assessment kept"
            );
        }
    }

    fn raise_crisis_alert(&self, assessment: &Assessment) {
        let reasons = scoring::risk_indicators(
            assessment.assessment_type,
            &assessment.responses,
            assessment.severity,
        );
        if reasons.is_empty() {
            return;
        }

        let alert = CrisisAlert {
            assessment_id: assessment.id,
            user_id: assessment.user_id.clone(),
            assessment_type: assessment.assessment_type,
            score: assessment.score,
            severity: assessment.severity,
            reasons,
        };
        if let Err(err) = self.alerts.publish(alert) {
            warn!(
                assessment_id = %assessment.id,
                error = %err,
                "crisis alert could not be published"
            );
        }
    }
}

/// Strict parse of a questionnaire code into one the engine scores.
pub fn parse_assessment_type(raw: &str) -> Result<AssessmentType, AssessmentServiceError> {
    AssessmentType::parse(raw)
        .ok_or_else(|| AssessmentServiceError::InvalidAssessmentType(raw.trim().to_string()))
}

/// Error raised by the assessment service.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentServiceError {
    #[error("invalid assessment type '{0}': expected PHQ-9 or GAD-7")]
    InvalidAssessmentType(String),
    #[error("responses are required")]
    MissingResponses,
    #[error("invalid response at question {position}: {value} is not an integer from 0 to 3")]
    InvalidResponseValue { position: usize, value: String },
    #[error("expected {expected} responses but received {actual}")]
    ResponseCountMismatch { expected: usize, actual: usize },
    #[error("{assessment_type} assessment already completed today")]
    DuplicateSubmission { assessment_type: AssessmentType },
    #[error("assessment not found")]
    NotFoundOrForbidden,
    #[error("no questions found for assessment type '{0}'")]
    QuestionsNotFound(String),
    #[error("period must be a positive number of days, received {0}")]
    InvalidPeriod(i64),
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<ResponseViolation> for AssessmentServiceError {
    fn from(violation: ResponseViolation) -> Self {
        match violation {
            ResponseViolation::Missing => Self::MissingResponses,
            ResponseViolation::OutOfRange { position, value } => Self::InvalidResponseValue {
                position,
                value: value.to_string(),
            },
            ResponseViolation::CountMismatch { expected, actual } => {
                Self::ResponseCountMismatch { expected, actual }
            }
        }
    }
}
