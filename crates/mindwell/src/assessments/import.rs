use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::calendar::DayBoundary;
use super::domain::{AssessmentSubmission, UserId};
use super::repository::{AlertPublisher, AssessmentRepository, RepositoryError};
use super::service::{AssessmentService, AssessmentServiceError};

#[derive(Debug, thiserror::Error)]
pub enum AssessmentImportError {
    #[error("failed to read assessment export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid assessment CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("assessment store failed during import: {0}")]
    Repository(#[from] RepositoryError),
}

/// Row that could not be submitted, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub duplicates: usize,
    pub rejected: Vec<RejectedRow>,
}

/// Replays a historical CSV export through the regular submission path, so
/// imported rows obey the same validation and one-per-day rule as live ones.
pub struct AssessmentCsvImporter;

impl AssessmentCsvImporter {
    pub fn from_path<P, R, A>(
        path: P,
        service: &AssessmentService<R, A>,
    ) -> Result<ImportSummary, AssessmentImportError>
    where
        P: AsRef<Path>,
        R: AssessmentRepository + 'static,
        A: AlertPublisher + 'static,
    {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, service)
    }

    pub fn from_reader<T, R, A>(
        reader: T,
        service: &AssessmentService<R, A>,
    ) -> Result<ImportSummary, AssessmentImportError>
    where
        T: Read,
        R: AssessmentRepository + 'static,
        A: AlertPublisher + 'static,
    {
        let boundary = service.settings().day_boundary;
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let mut summary = ImportSummary::default();

        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            let line = record
                .position()
                .map(|position| position.line())
                .unwrap_or(index as u64 + 2);
            let row: AssessmentRow = record.deserialize(Some(&headers))?;

            let submission = match row.into_submission(&boundary) {
                Ok(submission) => submission,
                Err(reason) => {
                    summary.rejected.push(RejectedRow { line, reason });
                    continue;
                }
            };

            match service.submit(submission) {
                Ok(_) => summary.imported += 1,
                Err(AssessmentServiceError::DuplicateSubmission { .. }) => {
                    summary.duplicates += 1
                }
                Err(AssessmentServiceError::Repository(err)) => return Err(err.into()),
                Err(err) => {
                    debug!(line, error = %err, "assessment row rejected");
                    summary.rejected.push(RejectedRow {
                        line,
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            imported = summary.imported,
            duplicates = summary.duplicates,
            rejected = summary.rejected.len(),
            "assessment history imported"
        );
        Ok(summary)
    }
}

#[derive(Debug, Deserialize)]
struct AssessmentRow {
    #[serde(rename = "User ID")]
    user_id: String,
    #[serde(rename = "Assessment")]
    assessment: String,
    #[serde(rename = "Submitted At")]
    submitted_at: String,
    #[serde(rename = "Responses", default)]
    responses: String,
}

impl AssessmentRow {
    fn into_submission(self, boundary: &DayBoundary) -> Result<AssessmentSubmission, String> {
        if self.user_id.trim().is_empty() {
            return Err("missing user id".to_string());
        }

        let submitted_at = parse_timestamp(&self.submitted_at, boundary)
            .ok_or_else(|| format!("unrecognized timestamp '{}'", self.submitted_at))?;
        let responses = parse_responses(&self.responses)?;

        Ok(
            AssessmentSubmission::new(UserId::new(self.user_id.trim()), self.assessment, responses)
                .at(submitted_at),
        )
    }
}

fn parse_responses(raw: &str) -> Result<Vec<i64>, String> {
    raw.split(|c: char| c.is_whitespace() || c == ';' || c == '|' || c == ',')
        .filter(|token| !token.is_empty())
        .enumerate()
        .map(|(index, token)| {
            token
                .parse::<i64>()
                .map_err(|_| format!("answer {} '{}' is not an integer", index + 1, token))
        })
        .collect()
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC), or a bare date placed at local noon.
fn parse_timestamp(value: &str, boundary: &DayBoundary) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .map(|date| boundary.window_for_day(date).start + Duration::hours(12))
}
