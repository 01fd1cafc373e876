//! Prompts and their canonical answers, plus normalisation of the loosely
//! shaped question payloads returned by the practice backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const MISSING_QUESTION_TEXT: &str = "Question not available";
const PLACEHOLDER_OPTIONS: [&str; 4] = ["Option A", "Option B", "Option C", "Option D"];

/// The canonical answer of a multiple-choice prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKey {
    /// Zero-based index into the prompt's options.
    ByIndex(usize),
    /// Literal option text, matched exactly.
    ByText(String),
}

/// An immutable catalog or quiz item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    /// `None` only for speaking topics and for leniently loaded questions.
    pub answer: Option<AnswerKey>,
}

impl Prompt {
    /// A free-response prompt such as a speaking topic.
    pub fn topic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            options: Vec::new(),
            answer: None,
        }
    }

    pub fn question(text: impl Into<String>, options: Vec<String>, answer: AnswerKey) -> Self {
        Self {
            text: text.into(),
            options,
            answer: Some(answer),
        }
    }

    /// The option text that counts as correct, if it can be resolved.
    pub fn correct_option(&self) -> Option<&str> {
        match self.answer.as_ref()? {
            AnswerKey::ByIndex(i) => self.options.get(*i).map(String::as_str),
            AnswerKey::ByText(text) => Some(text.as_str()),
        }
    }

    /// Option label as shown to the user: `A`, `B`, ...
    pub fn option_label(index: usize) -> char {
        (b'A' + (index % 26) as u8) as char
    }
}

/// What to do with a question that has no usable answer key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnswerKeyPolicy {
    /// Reject the whole payload.
    #[default]
    Strict,
    /// Keep the question; the scorer will leave it out of the percentage.
    Lenient,
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("question payload is not an object or list")]
    UnexpectedShape,

    #[error("question payload contained no questions")]
    Empty,

    #[error("question {index} has no answer key")]
    MissingAnswer { index: usize },

    #[error("question {index} answer index {answer} is outside its {options} options")]
    IndexOutOfRange {
        index: usize,
        answer: usize,
        options: usize,
    },

    #[error("question {index}: {source}")]
    Malformed {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Question as the backend sends it. Every field is optional.
#[derive(Debug, Default, Deserialize)]
struct RawQuestion {
    question: Option<String>,
    text: Option<String>,
    options: Option<Vec<String>>,
    correct_answer: Option<String>,
    answer: Option<String>,
    correct_index: Option<Value>,
}

/// Accepts a list of questions, `{ "questions": [...] }`, or a single question.
pub fn normalize_questions(
    payload: Value,
    policy: AnswerKeyPolicy,
) -> Result<Vec<Prompt>, PayloadError> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("questions") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                map.insert("questions".to_string(), other);
                vec![Value::Object(map)]
            }
            None => vec![Value::Object(map)],
        },
        _ => return Err(PayloadError::UnexpectedShape),
    };

    if items.is_empty() {
        return Err(PayloadError::Empty);
    }

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let raw: RawQuestion = serde_json::from_value(item)
                .map_err(|source| PayloadError::Malformed { index, source })?;
            normalize_one(index, raw, policy)
        })
        .collect()
}

fn normalize_one(
    index: usize,
    raw: RawQuestion,
    policy: AnswerKeyPolicy,
) -> Result<Prompt, PayloadError> {
    let text = raw
        .question
        .or(raw.text)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| MISSING_QUESTION_TEXT.to_string());

    let options = raw
        .options
        .filter(|o| !o.is_empty())
        .unwrap_or_else(|| PLACEHOLDER_OPTIONS.iter().map(|o| o.to_string()).collect());

    let answer = match raw.correct_index.as_ref().and_then(parse_index) {
        Some(i) => Some(AnswerKey::ByIndex(i)),
        None => raw
            .correct_answer
            .filter(|a| !a.is_empty())
            .or(raw.answer.filter(|a| !a.is_empty()))
            .map(AnswerKey::ByText),
    };

    if policy == AnswerKeyPolicy::Strict {
        match &answer {
            None => return Err(PayloadError::MissingAnswer { index }),
            Some(AnswerKey::ByIndex(i)) if *i >= options.len() => {
                return Err(PayloadError::IndexOutOfRange {
                    index,
                    answer: *i,
                    options: options.len(),
                })
            }
            _ => {}
        }
    }

    Ok(Prompt {
        text,
        options,
        answer,
    })
}

/// `correct_index` arrives as a number or, from some generators, a numeric string.
fn parse_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accepts_wrapped_list() {
        let payload = json!({
            "questions": [
                { "question": "2 + 2?", "options": ["3", "4"], "correct_index": 1 },
                { "question": "Capital of France?", "options": ["Paris", "Rome"], "correct_answer": "Paris" }
            ]
        });
        let prompts = normalize_questions(payload, AnswerKeyPolicy::Strict).unwrap();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].answer, Some(AnswerKey::ByIndex(1)));
        assert_eq!(prompts[1].correct_option(), Some("Paris"));
    }

    #[test]
    fn test_accepts_bare_list_and_single_object() {
        let list = json!([{ "text": "Q1", "options": ["a", "b"], "answer": "b" }]);
        let prompts = normalize_questions(list, AnswerKeyPolicy::Strict).unwrap();
        assert_eq!(prompts[0].text, "Q1");
        assert_eq!(prompts[0].answer, Some(AnswerKey::ByText("b".to_string())));

        let single = json!({ "question": "Q", "options": ["x", "y"], "correct_index": 0 });
        let prompts = normalize_questions(single, AnswerKeyPolicy::Strict).unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].correct_option(), Some("x"));
    }

    #[test]
    fn test_index_takes_precedence_over_text() {
        let payload = json!([{
            "question": "Q",
            "options": ["A", "B", "C", "D"],
            "correct_index": "2",
            "correct_answer": "A"
        }]);
        let prompts = normalize_questions(payload, AnswerKeyPolicy::Strict).unwrap();
        assert_eq!(prompts[0].answer, Some(AnswerKey::ByIndex(2)));
    }

    #[test]
    fn test_correct_answer_preferred_over_answer() {
        let payload = json!([{ "question": "Q", "options": ["A", "B"], "correct_answer": "A", "answer": "B" }]);
        let prompts = normalize_questions(payload, AnswerKeyPolicy::Strict).unwrap();
        assert_eq!(prompts[0].correct_option(), Some("A"));
    }

    #[test]
    fn test_missing_fields_get_placeholders() {
        let payload = json!([{ "correct_index": 3 }]);
        let prompts = normalize_questions(payload, AnswerKeyPolicy::Strict).unwrap();
        assert_eq!(prompts[0].text, "Question not available");
        assert_eq!(prompts[0].options.len(), 4);
        assert_eq!(prompts[0].correct_option(), Some("Option D"));
    }

    #[test]
    fn test_strict_rejects_unkeyed_question() {
        let payload = json!([{ "question": "Q", "options": ["A"], "correct_answer": "" }]);
        let err = normalize_questions(payload, AnswerKeyPolicy::Strict).unwrap_err();
        assert!(matches!(err, PayloadError::MissingAnswer { index: 0 }));
    }

    #[test]
    fn test_strict_rejects_out_of_range_index() {
        let payload = json!([{ "question": "Q", "options": ["A", "B"], "correct_index": 5 }]);
        let err = normalize_questions(payload, AnswerKeyPolicy::Strict).unwrap_err();
        assert!(matches!(err, PayloadError::IndexOutOfRange { answer: 5, .. }));
    }

    #[test]
    fn test_lenient_keeps_unkeyed_question() {
        let payload = json!([{ "question": "Q", "options": ["A"], "correct_index": null }]);
        let prompts = normalize_questions(payload, AnswerKeyPolicy::Lenient).unwrap();
        assert_eq!(prompts[0].answer, None);
    }

    #[test]
    fn test_empty_payload_is_an_error() {
        let err = normalize_questions(json!({ "questions": [] }), AnswerKeyPolicy::Lenient).unwrap_err();
        assert!(matches!(err, PayloadError::Empty));
        let err = normalize_questions(json!("nope"), AnswerKeyPolicy::Lenient).unwrap_err();
        assert!(matches!(err, PayloadError::UnexpectedShape));
    }

    #[test]
    fn test_index_parsing_never_truncates() {
        assert_eq!(parse_index(&json!(2)), Some(2));
        assert_eq!(parse_index(&json!(" 3 ")), Some(3));
        assert_eq!(parse_index(&json!(-1)), None);
        assert_eq!(parse_index(&json!(1.5)), None);
        assert_eq!(parse_index(&json!(u64::MAX)), usize::try_from(u64::MAX).ok());
    }

    #[test]
    fn test_option_labels() {
        assert_eq!(Prompt::option_label(0), 'A');
        assert_eq!(Prompt::option_label(3), 'D');
    }
}
