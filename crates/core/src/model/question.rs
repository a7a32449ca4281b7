use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single quiz question with its normalized expected answer.
///
/// The answer is stored trimmed and lowercased; user input goes through the
/// same normalization before the byte-for-byte comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub answer: String,
}

impl Question {
    #[must_use]
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into().trim().to_owned(),
            answer: answer.into().trim().to_lowercase(),
        }
    }
}

/// An ordered, never-empty question set for one session.
///
/// Order is significant: it defines navigation and the indices the answer
/// maps are keyed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Attempts to parse a raw JSON-array question source.
    ///
    /// Returns `None` on any failure: invalid JSON, a non-array document, or
    /// an array that is empty after dropping entries missing either field.
    /// Field values are coerced to strings the way the declarative inputs
    /// supply them (strings, numbers, booleans).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Vec<Question>> {
        if raw.trim().is_empty() {
            return None;
        }
        let entries: Vec<Value> = serde_json::from_str(raw).ok()?;
        let questions: Vec<Question> = entries
            .iter()
            .filter_map(|entry| {
                let question = entry.get("question").and_then(coerce)?;
                let answer = entry.get("answer").and_then(coerce)?;
                let parsed = Question::new(question, answer);
                (!parsed.question.is_empty() && !parsed.answer.is_empty()).then_some(parsed)
            })
            .collect();
        if questions.is_empty() {
            None
        } else {
            Some(questions)
        }
    }

    /// Builds a bank from the primary question source and its legacy alias.
    ///
    /// The primary source wins when both parse to non-empty sets; when
    /// neither yields usable data the built-in default question is used, so
    /// the bank is never empty.
    #[must_use]
    pub fn from_sources(primary: Option<&str>, alias: Option<&str>) -> Self {
        let parsed = primary
            .and_then(Self::parse)
            .or_else(|| alias.and_then(Self::parse));
        match parsed {
            Some(questions) => Self { questions },
            None => Self::default(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        // A bank is constructed non-empty; this exists for the len/is_empty pair.
        self.questions.is_empty()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn into_questions(self) -> Vec<Question> {
        self.questions
    }
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self {
            questions: vec![Question::new("What is the capital of Indonesia?", "Jakarta")],
        }
    }
}

fn coerce(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
