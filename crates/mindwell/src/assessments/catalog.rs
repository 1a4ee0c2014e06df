use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::AssessmentType;

/// Single prompt within a questionnaire, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub order: usize,
    pub prompt: String,
}

/// Likert option shared by PHQ-9 and GAD-7 items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResponseOption {
    pub value: u8,
    pub label: &'static str,
}

pub const RESPONSE_OPTIONS: [ResponseOption; 4] = [
    ResponseOption {
        value: 0,
        label: "Not at all",
    },
    ResponseOption {
        value: 1,
        label: "Several days",
    },
    ResponseOption {
        value: 2,
        label: "More than half the days",
    },
    ResponseOption {
        value: 3,
        label: "Nearly every day",
    },
];

const PHQ9_PROMPTS: [&str; 9] = [
    "Little interest or pleasure in doing things",
    "Feeling down, depressed, or hopeless",
    "Trouble falling or staying asleep, or sleeping too much",
    "Feeling tired or having little energy",
    "Poor appetite or overeating",
    "Feeling bad about yourself, or that you are a failure or have let yourself or your family down",
    "Trouble concentrating on things, such as reading or watching television",
    "Moving or speaking so slowly that other people could have noticed, or being so fidgety or restless that you have been moving around a lot more than usual",
    "Thoughts that you would be better off dead, or of hurting yourself in some way",
];

const GAD7_PROMPTS: [&str; 7] = [
    "Feeling nervous, anxious, or on edge",
    "Not being able to stop or control worrying",
    "Worrying too much about different things",
    "Trouble relaxing",
    "Being so restless that it is hard to sit still",
    "Becoming easily annoyed or irritable",
    "Feeling afraid, as if something awful might happen",
];

/// Read-only store of ordered prompts keyed by questionnaire code.
///
/// Codes are normalized to upper case, so lookups are case-insensitive. The
/// catalog may carry questionnaires the engine does not score.
#[derive(Debug, Clone, Default)]
pub struct QuestionCatalog {
    entries: BTreeMap<String, Vec<Question>>,
}

impl QuestionCatalog {
    pub fn standard() -> Self {
        Self::default()
            .with_entry(AssessmentType::Phq9.code(), PHQ9_PROMPTS)
            .with_entry(AssessmentType::Gad7.code(), GAD7_PROMPTS)
    }

    pub fn with_entry<I, S>(mut self, code: &str, prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let questions = prompts
            .into_iter()
            .zip(1usize..)
            .map(|(prompt, order)| Question {
                order,
                prompt: prompt.into(),
            })
            .collect();
        self.entries.insert(normalize_code(code), questions);
        self
    }

    /// Ordered prompts for `code`, or `None` when the entry is missing or empty.
    pub fn questions(&self, code: &str) -> Option<&[Question]> {
        self.entries
            .get(&normalize_code(code))
            .map(Vec::as_slice)
            .filter(|questions| !questions.is_empty())
    }

    pub fn question_count(&self, assessment_type: AssessmentType) -> Option<usize> {
        self.questions(assessment_type.code()).map(<[Question]>::len)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
