use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::assessments::calendar::ManualClock;
use crate::assessments::catalog::QuestionCatalog;
use crate::assessments::domain::{
    Assessment, AssessmentId, AssessmentSubmission, AssessmentType, RollingAverage, UserId,
};
use crate::assessments::memory::InMemoryAssessmentRepository;
use crate::assessments::repository::{
    AlertError, AlertPublisher, AssessmentRepository, CrisisAlert, RepositoryError,
};
use crate::assessments::router::{assessment_router, USER_ID_HEADER};
use crate::assessments::service::{AssessmentService, EngineSettings};

pub(super) type MemoryService = AssessmentService<InMemoryAssessmentRepository, MemoryAlerts>;

pub(super) fn at(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

pub(super) fn user(id: &str) -> UserId {
    UserId::new(id)
}

/// PHQ-9 answers from the worked example; scores 15.
pub(super) fn phq9_example() -> Vec<i64> {
    vec![3, 2, 1, 0, 2, 3, 1, 2, 1]
}

/// Spreads `score` over `count` answers, front-loading 3s.
pub(super) fn answers_scoring(count: usize, score: u32) -> Vec<i64> {
    let mut remaining = score;
    (0..count)
        .map(|_| {
            let value = remaining.min(3);
            remaining -= value;
            i64::from(value)
        })
        .collect()
}

pub(super) fn submission(
    user_id: &str,
    assessment_type: &str,
    responses: Vec<i64>,
) -> AssessmentSubmission {
    AssessmentSubmission::new(user(user_id), assessment_type, responses)
}

pub(super) struct Harness {
    pub(super) service: MemoryService,
    pub(super) repository: Arc<InMemoryAssessmentRepository>,
    pub(super) alerts: Arc<MemoryAlerts>,
    pub(super) clock: Arc<ManualClock>,
}

pub(super) fn build_service_at(now: DateTime<Utc>, settings: EngineSettings) -> Harness {
    let repository = Arc::new(InMemoryAssessmentRepository::default());
    let alerts = Arc::new(MemoryAlerts::default());
    let clock = Arc::new(ManualClock::new(now));
    let service = AssessmentService::new(
        repository.clone(),
        alerts.clone(),
        QuestionCatalog::standard(),
        settings,
    )
    .with_clock(clock.clone());

    Harness {
        service,
        repository,
        alerts,
        clock,
    }
}

pub(super) fn build_service() -> Harness {
    build_service_at(at("2025-03-14T08:00:00Z"), EngineSettings::default())
}

pub(super) fn service_with<R, A>(repository: R, alerts: A) -> AssessmentService<R, A>
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    AssessmentService::new(
        Arc::new(repository),
        Arc::new(alerts),
        QuestionCatalog::standard(),
        EngineSettings::default(),
    )
    .with_clock(Arc::new(ManualClock::new(at("2025-03-14T08:00:00Z"))))
}

#[derive(Default, Clone)]
pub(super) struct MemoryAlerts {
    events: Arc<Mutex<Vec<CrisisAlert>>>,
}

impl MemoryAlerts {
    pub(super) fn events(&self) -> Vec<CrisisAlert> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

impl AlertPublisher for MemoryAlerts {
    fn publish(&self, alert: CrisisAlert) -> Result<(), AlertError> {
        self.events
            .lock()
            .expect("alert mutex poisoned")
            .push(alert);
        Ok(())
    }
}

pub(super) struct OfflineAlerts;

impl AlertPublisher for OfflineAlerts {
    fn publish(&self, _alert: CrisisAlert) -> Result<(), AlertError> {
        Err(AlertError::Transport("pager offline".to_string()))
    }
}

/// Stores assessments normally but refuses every rolling-average write.
#[derive(Default, Clone)]
pub(super) struct ReadOnlyAveragesRepository {
    pub(super) inner: InMemoryAssessmentRepository,
}

impl AssessmentRepository for ReadOnlyAveragesRepository {
    fn insert(&self, assessment: Assessment, day: NaiveDate) -> Result<Assessment, RepositoryError> {
        self.inner.insert(assessment, day)
    }

    fn fetch(&self, id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn find_in_window(
        &self,
        user_id: &UserId,
        assessment_type: AssessmentType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<Assessment>, RepositoryError> {
        self.inner
            .find_in_window(user_id, assessment_type, start, end)
    }

    fn delete(&self, id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError> {
        self.inner.delete(id)
    }

    fn recent(
        &self,
        user_id: &UserId,
        assessment_type: Option<AssessmentType>,
        limit: usize,
    ) -> Result<Vec<Assessment>, RepositoryError> {
        self.inner.recent(user_id, assessment_type, limit)
    }

    fn since(
        &self,
        user_id: &UserId,
        assessment_type: Option<AssessmentType>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Assessment>, RepositoryError> {
        self.inner.since(user_id, assessment_type, since)
    }

    fn upsert_average(&self, _average: RollingAverage) -> Result<RollingAverage, RepositoryError> {
        Err(RepositoryError::Unavailable("averages collection read only".to_string()))
    }

    fn fetch_average(
        &self,
        user_id: &UserId,
        assessment_type: AssessmentType,
    ) -> Result<Option<RollingAverage>, RepositoryError> {
        self.inner.fetch_average(user_id, assessment_type)
    }

    fn averages_for(&self, user_id: &UserId) -> Result<Vec<RollingAverage>, RepositoryError> {
        self.inner.averages_for(user_id)
    }
}

pub(super) struct UnavailableRepository;

impl AssessmentRepository for UnavailableRepository {
    fn insert(&self, _assessment: Assessment, _day: NaiveDate) -> Result<Assessment, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_in_window(
        &self,
        _user_id: &UserId,
        _assessment_type: AssessmentType,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Option<Assessment>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn recent(
        &self,
        _user_id: &UserId,
        _assessment_type: Option<AssessmentType>,
        _limit: usize,
    ) -> Result<Vec<Assessment>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn since(
        &self,
        _user_id: &UserId,
        _assessment_type: Option<AssessmentType>,
        _since: DateTime<Utc>,
    ) -> Result<Vec<Assessment>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn upsert_average(&self, _average: RollingAverage) -> Result<RollingAverage, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_average(
        &self,
        _user_id: &UserId,
        _assessment_type: AssessmentType,
    ) -> Result<Option<RollingAverage>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn averages_for(&self, _user_id: &UserId) -> Result<Vec<RollingAverage>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn router_for(service: MemoryService) -> axum::Router {
    assessment_router(Arc::new(service))
}

pub(super) fn get_as(user_id: &str, uri: &str) -> Request<Body> {
    Request::get(uri)
        .header(USER_ID_HEADER, user_id)
        .body(Body::empty())
        .expect("request builds")
}

pub(super) fn post_json_as(user_id: &str, uri: &str, payload: &Value) -> Request<Body> {
    Request::post(uri)
        .header(USER_ID_HEADER, user_id)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).expect("json encodes")))
        .expect("request builds")
}

pub(super) fn delete_as(user_id: &str, uri: &str) -> Request<Body> {
    Request::delete(uri)
        .header(USER_ID_HEADER, user_id)
        .body(Body::empty())
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
