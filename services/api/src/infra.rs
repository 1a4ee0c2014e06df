use metrics_exporter_prometheus::PrometheusHandle;
use mindwell::assessments::{AlertError, AlertPublisher, AssessmentType, CrisisAlert};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Logs crisis alerts and keeps them for inspection. Stands in for the
/// counselor paging integration.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAlertPublisher {
    events: Arc<Mutex<Vec<CrisisAlert>>>,
}

impl AlertPublisher for InMemoryAlertPublisher {
    fn publish(&self, alert: CrisisAlert) -> Result<(), AlertError> {
        warn!(
            assessment_id = %alert.assessment_id,
            user_id = %alert.user_id,
            assessment_type = %alert.assessment_type,
            score = alert.score,
            reasons = ?alert.reasons,
            "crisis alert raised"
        );
        let mut guard = self
            .events
            .lock()
            .map_err(|_| AlertError::Transport("alert log lock poisoned".to_string()))?;
        guard.push(alert);
        Ok(())
    }
}

impl InMemoryAlertPublisher {
    pub(crate) fn events(&self) -> Vec<CrisisAlert> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub(crate) fn parse_assessment_type(raw: &str) -> Result<AssessmentType, String> {
    AssessmentType::parse(raw).ok_or_else(|| format!("'{raw}' is not PHQ-9 or GAD-7"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindwell::assessments::{AssessmentId, Severity, UserId};

    #[test]
    fn published_alerts_are_retained() {
        let publisher = InMemoryAlertPublisher::default();
        publisher
            .publish(CrisisAlert {
                assessment_id: AssessmentId::generate(),
                user_id: UserId::new("student-1"),
                assessment_type: AssessmentType::Phq9,
                score: 22,
                severity: Severity::Severe,
                reasons: vec!["PHQ-9 score in the severe range".to_string()],
            })
            .expect("publish succeeds");
        assert_eq!(publisher.events().len(), 1);
    }
}
