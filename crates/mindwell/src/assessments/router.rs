use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequestParts, Path, Query, State,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;
use uuid::Uuid;

use super::catalog::{Question, ResponseOption, RESPONSE_OPTIONS};
use super::domain::{AssessmentId, AssessmentSubmission, AssessmentType, UserId};
use super::repository::{AlertPublisher, AssessmentRepository};
use super::service::{parse_assessment_type, AssessmentService, AssessmentServiceError};

/// Header carrying the caller id resolved by the upstream identity layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Router builder exposing the assessment endpoints.
pub fn assessment_router<R, A>(service: Arc<AssessmentService<R, A>>) -> Router
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    Router::new()
        .route("/api/v1/assessments/submit", post(submit_handler::<R, A>))
        .route("/api/v1/assessments/history", get(history_handler::<R, A>))
        .route("/api/v1/assessments/averages", get(averages_handler::<R, A>))
        .route(
            "/api/v1/assessments/averages/rebuild",
            post(rebuild_handler::<R, A>),
        )
        .route(
            "/api/v1/assessments/today/:assessment_type",
            get(today_handler::<R, A>),
        )
        .route("/api/v1/assessments/stats", get(stats_handler::<R, A>))
        .route(
            "/api/v1/assessments/questions/:assessment_type",
            get(questions_handler::<R, A>),
        )
        .route(
            "/api/v1/assessments/:assessment_id",
            delete(delete_handler::<R, A>),
        )
        .with_state(service)
}

/// Caller identity taken from [`USER_ID_HEADER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| AuthenticatedUser(UserId::new(value)))
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "authentication required" })),
                )
                    .into_response()
            })
    }
}

/// Submission body. Fields stay loosely typed so wrongly shaped values are
/// reported as assessment errors rather than as a body rejection.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SubmitAssessmentRequest {
    #[serde(rename = "type", default)]
    pub assessment_type: Option<Value>,
    #[serde(default)]
    pub responses: Option<Value>,
}

impl SubmitAssessmentRequest {
    pub fn into_submission(
        self,
        user_id: UserId,
    ) -> Result<AssessmentSubmission, AssessmentServiceError> {
        let assessment_type = match self.assessment_type {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(code)) => code,
            Some(other) => other.to_string(),
        };
        parse_assessment_type(&assessment_type)?;

        let values = match self.responses {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(values)) => values,
            // A lone value is read as the first answer of a one-item list.
            Some(other) => vec![other],
        };
        let responses = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                value
                    .as_i64()
                    .ok_or_else(|| AssessmentServiceError::InvalidResponseValue {
                        position: index + 1,
                        value: value.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AssessmentSubmission::new(
            user_id,
            assessment_type,
            responses,
        ))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(rename = "type")]
    pub assessment_type: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    #[serde(rename = "type")]
    pub assessment_type: Option<String>,
    pub period: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSetView {
    #[serde(rename = "type")]
    pub assessment_type: String,
    pub questions: Vec<Question>,
    pub options: &'static [ResponseOption],
}

fn malformed_body(rejection: JsonRejection) -> AssessmentServiceError {
    AssessmentServiceError::MalformedRequest(rejection.body_text())
}

fn malformed_query(rejection: QueryRejection) -> AssessmentServiceError {
    AssessmentServiceError::MalformedRequest(rejection.body_text())
}

fn optional_type(raw: Option<String>) -> Result<Option<AssessmentType>, AssessmentServiceError> {
    raw.filter(|value| !value.trim().is_empty())
        .map(|value| parse_assessment_type(&value))
        .transpose()
}

pub(crate) async fn submit_handler<R, A>(
    State(service): State<Arc<AssessmentService<R, A>>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    request: Result<Json<SubmitAssessmentRequest>, JsonRejection>,
) -> Result<Response, AssessmentServiceError>
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    let Json(request) = request.map_err(malformed_body)?;
    let submission = request.into_submission(user_id)?;
    let assessment = service.submit(submission)?;
    Ok((StatusCode::CREATED, Json(assessment)).into_response())
}

pub(crate) async fn history_handler<R, A>(
    State(service): State<Arc<AssessmentService<R, A>>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Response, AssessmentServiceError>
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    let Query(query) = query.map_err(malformed_query)?;
    let assessment_type = optional_type(query.assessment_type)?;
    let history = service.history(&user_id, assessment_type, query.limit)?;
    Ok(Json(history).into_response())
}

pub(crate) async fn averages_handler<R, A>(
    State(service): State<Arc<AssessmentService<R, A>>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Response, AssessmentServiceError>
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    Ok(Json(service.averages(&user_id)?).into_response())
}

pub(crate) async fn rebuild_handler<R, A>(
    State(service): State<Arc<AssessmentService<R, A>>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Response, AssessmentServiceError>
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    Ok(Json(service.rebuild_rolling_averages(&user_id)?).into_response())
}

pub(crate) async fn today_handler<R, A>(
    State(service): State<Arc<AssessmentService<R, A>>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(assessment_type): Path<String>,
) -> Result<Response, AssessmentServiceError>
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    let assessment_type = parse_assessment_type(&assessment_type)?;
    let response = match service.today(&user_id, assessment_type)? {
        Some(assessment) => Json(assessment).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": format!("no {assessment_type} assessment completed today"),
                "completed": false,
            })),
        )
            .into_response(),
    };
    Ok(response)
}

pub(crate) async fn stats_handler<R, A>(
    State(service): State<Arc<AssessmentService<R, A>>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> Result<Response, AssessmentServiceError>
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    let Query(query) = query.map_err(malformed_query)?;
    let assessment_type = optional_type(query.assessment_type)?;
    let stats = service.stats(&user_id, assessment_type, query.period)?;
    Ok(Json(stats).into_response())
}

pub(crate) async fn delete_handler<R, A>(
    State(service): State<Arc<AssessmentService<R, A>>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(assessment_id): Path<String>,
) -> Result<Response, AssessmentServiceError>
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    // Ids that do not parse cannot belong to the caller either.
    let assessment_id = Uuid::parse_str(assessment_id.trim())
        .map(AssessmentId)
        .map_err(|_| AssessmentServiceError::NotFoundOrForbidden)?;
    service.delete(&user_id, &assessment_id)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub(crate) async fn questions_handler<R, A>(
    State(service): State<Arc<AssessmentService<R, A>>>,
    Path(assessment_type): Path<String>,
) -> Result<Response, AssessmentServiceError>
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    let questions = service.questions(&assessment_type)?.to_vec();
    Ok(Json(QuestionSetView {
        assessment_type: assessment_type.trim().to_ascii_uppercase(),
        questions,
        options: &RESPONSE_OPTIONS,
    })
    .into_response())
}

impl AssessmentServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidAssessmentType(_)
            | Self::MissingResponses
            | Self::InvalidResponseValue { .. }
            | Self::ResponseCountMismatch { .. }
            | Self::InvalidPeriod(_)
            | Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            Self::QuestionsNotFound(_) | Self::NotFoundOrForbidden => StatusCode::NOT_FOUND,
            Self::DuplicateSubmission { .. } => StatusCode::CONFLICT,
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AssessmentServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Repository(err) => {
                error!(error = %err, "assessment storage failure");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
