//! Periodic self-assessment engine: PHQ-9 / GAD-7 scoring, one-per-day
//! submission, and rolling-average trend tracking.

pub mod calendar;
pub mod catalog;
pub mod domain;
pub mod import;
pub mod memory;
pub mod repository;
pub mod rolling;
pub mod router;
pub mod scoring;
pub mod service;
pub mod stats;

#[cfg(test)]
mod tests;

pub use calendar::{Clock, DayBoundary, DayWindow, ManualClock, SystemClock};
pub use catalog::{Question, QuestionCatalog, ResponseOption, RESPONSE_OPTIONS};
pub use domain::{
    Assessment, AssessmentId, AssessmentSubmission, AssessmentType, RollingAverage, Severity,
    UserId,
};
pub use import::{AssessmentCsvImporter, AssessmentImportError, ImportSummary, RejectedRow};
pub use memory::InMemoryAssessmentRepository;
pub use repository::{
    AlertError, AlertPublisher, AssessmentRepository, CrisisAlert, RepositoryError,
};
pub use router::{assessment_router, AuthenticatedUser, SubmitAssessmentRequest, USER_ID_HEADER};
pub use service::{
    parse_assessment_type, AssessmentService, AssessmentServiceError, EngineSettings,
};
pub use stats::{AssessmentStats, ScoreSummary};
