use crate::infra::InMemoryAlertPublisher;
use chrono::{Duration, Utc};
use clap::Args;
use mindwell::assessments::{
    scoring, AlertPublisher, AssessmentCsvImporter, AssessmentRepository, AssessmentService,
    AssessmentServiceError, AssessmentSubmission, AssessmentType, Clock,
    InMemoryAssessmentRepository, ManualClock, QuestionCatalog, UserId,
};
use mindwell::config::AppConfig;
use mindwell::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;

const MAX_DEMO_DAYS: i64 = 3650;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Questionnaire code: PHQ-9 or GAD-7
    #[arg(long = "type", value_parser = crate::infra::parse_assessment_type)]
    pub(crate) assessment_type: AssessmentType,
    /// Answers in question order, e.g. 3,2,1,0,2,3,1,2,1
    #[arg(
        long,
        value_delimiter = ',',
        num_args = 1..,
        allow_negative_numbers = true,
        required = true
    )]
    pub(crate) responses: Vec<i64>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of consecutive days of check-ins to simulate
    #[arg(
        long,
        default_value_t = 7,
        value_parser = clap::value_parser!(u32).range(1..=MAX_DEMO_DAYS)
    )]
    pub(crate) days: u32,
    /// Optional CSV export replayed into the store before the simulation
    #[arg(long)]
    pub(crate) history_csv: Option<PathBuf>,
    /// Pseudonymous user id for the simulated check-ins
    #[arg(long, default_value = "demo-student")]
    pub(crate) user: String,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    for line in score_report(args.assessment_type, &args.responses)? {
        println!("{line}");
    }
    Ok(())
}

fn score_report(assessment_type: AssessmentType, raw: &[i64]) -> Result<Vec<String>, AppError> {
    let catalog = QuestionCatalog::standard();
    let responses = scoring::validate_responses(raw).map_err(AssessmentServiceError::from)?;
    let expected = catalog
        .question_count(assessment_type)
        .ok_or_else(|| AssessmentServiceError::QuestionsNotFound(assessment_type.to_string()))?;
    scoring::check_question_count(expected, responses.len())
        .map_err(AssessmentServiceError::from)?;

    let score = scoring::total_score(&responses);
    let severity = scoring::severity_for(assessment_type, score);
    let mut lines = vec![format!(
        "{} ({}) score: {}/{} ({})",
        assessment_type,
        assessment_type.label(),
        score,
        assessment_type.max_score(),
        severity.label()
    )];
    lines.extend(
        scoring::risk_indicators(assessment_type, &responses, severity)
            .into_iter()
            .map(|reason| format!("- follow-up: {reason}")),
    );
    Ok(lines)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        days,
        history_csv,
        user,
    } = args;

    let settings = AppConfig::load()?.assessments.engine_settings();
    let start = Utc::now()
        .checked_sub_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| {
            AppError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cannot simulate {days} days back from now"),
            ))
        })?;
    let clock = Arc::new(ManualClock::new(start));
    let repository = Arc::new(InMemoryAssessmentRepository::default());
    let alerts = Arc::new(InMemoryAlertPublisher::default());
    let service = AssessmentService::new(
        repository.clone(),
        alerts.clone(),
        QuestionCatalog::standard(),
        settings,
    )
    .with_clock(clock.clone());
    let user_id = UserId::new(user);

    println!("MindWell assessment demo");
    if let Some(path) = history_csv {
        let summary = AssessmentCsvImporter::from_path(&path, &service)?;
        println!(
            "Imported {} rows from {} ({} duplicates, {} rejected)",
            summary.imported,
            path.display(),
            summary.duplicates,
            summary.rejected.len()
        );
        for row in &summary.rejected {
            println!("  - line {}: {}", row.line, row.reason);
        }
    }

    println!("\nDaily check-ins for {user_id}");
    for day in 0..days {
        let mut line = format!("- {}", settings.day_boundary.calendar_day(clock.now()));
        for assessment_type in AssessmentType::ordered() {
            let submission = AssessmentSubmission::new(
                user_id.clone(),
                assessment_type.code(),
                demo_answers(&service, assessment_type, day),
            );
            match service.submit(submission) {
                Ok(stored) => line.push_str(&format!(
                    " | {} {} ({})",
                    stored.assessment_type,
                    stored.score,
                    stored.severity.label()
                )),
                Err(err) => line.push_str(&format!(" | {assessment_type} skipped: {err}")),
            }
        }
        println!("{line}");

        if day == 0 {
            let retry = AssessmentSubmission::new(
                user_id.clone(),
                AssessmentType::Gad7.code(),
                demo_answers(&service, AssessmentType::Gad7, day),
            );
            if let Err(err) = service.submit(retry) {
                println!("  second GAD-7 the same day rejected: {err}");
            }
        }

        clock.advance(Duration::days(1));
    }

    println!("\nRolling averages");
    for average in service.averages(&user_id)? {
        println!(
            "- {}: {:.1} over {:?}",
            average.assessment_type, average.five_day_average, average.last_five_scores
        );
    }

    let stats = service.stats(&user_id, None, None)?;
    println!(
        "\nLast {} days: {} assessments, average {:.1}, range {}-{}",
        stats.period_days,
        stats.overall.count,
        stats.overall.average_score,
        stats.overall.min_score,
        stats.overall.max_score
    );

    let events = alerts.events();
    if events.is_empty() {
        println!("Crisis alerts: none raised");
    } else {
        println!("Crisis alerts:");
        for alert in events {
            println!(
                "- {} {} score {}: {}",
                alert.assessment_type,
                alert.assessment_id,
                alert.score,
                alert.reasons.join("; ")
            );
        }
    }

    Ok(())
}

/// Deterministic answers that drift upward over the simulated period. The
/// PHQ-9 self-harm item is answered once mid-way so the alert path shows up.
fn demo_answers<R, A>(
    service: &AssessmentService<R, A>,
    assessment_type: AssessmentType,
    day: u32,
) -> Vec<i64>
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    let count = service
        .catalog()
        .question_count(assessment_type)
        .unwrap_or_default();
    let drift = i64::from(day / 2);
    (0..count)
        .map(|item| {
            let last = item + 1 == count;
            match (assessment_type, last) {
                (AssessmentType::Phq9, true) => i64::from(day == 3),
                _ => (item as i64 + drift) % 4,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_report_names_the_questionnaire() {
        let lines = score_report(AssessmentType::Gad7, &[0, 1, 2, 3, 0, 1, 2]).expect("scores");
        assert_eq!(
            lines,
            vec!["GAD-7 (Generalized Anxiety Disorder scale) score: 9/21 (mild)".to_string()]
        );
    }

    #[test]
    fn score_report_lists_follow_up_reasons() {
        let lines =
            score_report(AssessmentType::Phq9, &[0, 0, 0, 0, 0, 0, 0, 0, 1]).expect("scores");
        assert!(lines[0]
            .starts_with("PHQ-9 (Patient Health Questionnaire (depression)) score: 1/27"));
        assert!(lines.len() > 1);
        assert!(lines[1..].iter().all(|line| line.starts_with("- follow-up: ")));
    }

    #[test]
    fn score_report_rejects_bad_answers() {
        assert!(score_report(AssessmentType::Gad7, &[0, 1, 4, 0, 0, 0, 0]).is_err());
        assert!(score_report(AssessmentType::Gad7, &[0, 1]).is_err());
    }
}
