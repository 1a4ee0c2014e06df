use super::domain::{AssessmentType, Severity};

/// Lowest answer on the PHQ-9/GAD-7 Likert scale.
pub const MIN_RESPONSE: i64 = 0;
/// Highest answer on the PHQ-9/GAD-7 Likert scale.
pub const MAX_RESPONSE: i64 = 3;

/// PHQ-9 item 9 asks about thoughts of self-harm.
const PHQ9_SELF_HARM_ITEM: usize = 8;

/// Reasons a response list cannot be scored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseViolation {
    #[error("responses are required")]
    Missing,
    #[error("answer {position} is {value}, expected an integer from 0 to 3")]
    OutOfRange { position: usize, value: i64 },
    #[error("expected {expected} responses, received {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

/// Checks every answer against the fixed 0..=3 scale and narrows it.
///
/// Positions in errors are 1-based so they line up with question numbers.
pub fn validate_responses(raw: &[i64]) -> Result<Vec<u8>, ResponseViolation> {
    if raw.is_empty() {
        return Err(ResponseViolation::Missing);
    }

    raw.iter()
        .enumerate()
        .map(|(index, &value)| {
            u8::try_from(value)
                .ok()
                .filter(|_| (MIN_RESPONSE..=MAX_RESPONSE).contains(&value))
                .ok_or(ResponseViolation::OutOfRange {
                    position: index + 1,
                    value,
                })
        })
        .collect()
}

pub fn check_question_count(expected: usize, actual: usize) -> Result<(), ResponseViolation> {
    if expected == actual {
        Ok(())
    } else {
        Err(ResponseViolation::CountMismatch { expected, actual })
    }
}

/// Plain sum of the answers: no weighting and no normalization.
pub fn total_score(responses: &[u8]) -> u32 {
    responses.iter().map(|&value| u32::from(value)).sum()
}

pub fn severity_for(assessment_type: AssessmentType, score: u32) -> Severity {
    match (assessment_type, score) {
        (_, 0..=4) => Severity::Minimal,
        (_, 5..=9) => Severity::Mild,
        (_, 10..=14) => Severity::Moderate,
        (AssessmentType::Phq9, 15..=19) => Severity::ModeratelySevere,
        _ => Severity::Severe,
    }
}

/// Human readable reasons a result warrants an immediate counselor follow-up.
///
/// Empty when no follow-up is needed.
pub fn risk_indicators(
    assessment_type: AssessmentType,
    responses: &[u8],
    severity: Severity,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if severity >= Severity::ModeratelySevere {
        reasons.push(format!(
            "{} score in the {} range",
            assessment_type,
            severity.label()
        ));
    }

    if assessment_type == AssessmentType::Phq9 {
        if let Some(&answer) = responses.get(PHQ9_SELF_HARM_ITEM) {
            if answer > 0 {
                reasons.push(format!("self-harm item answered {answer}"));
            }
        }
    }

    reasons
}
