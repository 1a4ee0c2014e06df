use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryAlertPublisher};
use crate::routes::with_assessment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use mindwell::assessments::{
    AssessmentCsvImporter, AssessmentService, InMemoryAssessmentRepository, QuestionCatalog,
};
use mindwell::config::AppConfig;
use mindwell::error::AppError;
use mindwell::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryAssessmentRepository::default());
    let alerts = Arc::new(InMemoryAlertPublisher::default());
    let assessment_service = Arc::new(AssessmentService::new(
        repository,
        alerts,
        QuestionCatalog::standard(),
        config.assessments.engine_settings(),
    ));

    if let Some(path) = config.assessments.seed_csv.as_ref() {
        let summary = AssessmentCsvImporter::from_path(path, &*assessment_service)?;
        info!(
            path = %path.display(),
            imported = summary.imported,
            duplicates = summary.duplicates,
            rejected = summary.rejected.len(),
            "seeded assessment store"
        );
    }

    let app = with_assessment_routes(assessment_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "mindwell assessment service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
