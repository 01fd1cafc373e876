//! Static prompt catalogs, loaded once and shared read-only.

use std::sync::Arc;

use crate::errors::PracticeError;
use crate::models::Prompt;

pub const APTITUDE_TOPICS: &[&str] = &[
    "Data Analysis",
    "Logical Reasoning",
    "Quantitative Aptitude",
    "Verbal Ability",
    "Programming Concepts",
    "Data Structures",
    "Algorithms",
    "SQL Queries",
    "Problem Solving",
    "Critical Thinking",
];

pub const DEFAULT_APTITUDE_TOPIC: &str = "Data Analysis";
pub const DEFAULT_QUESTION_COUNT: u32 = 5;

pub const SPEAKING_TOPICS: &[&str] = &[
    "Describe a challenge you solved recently",
    "Talk about a project you are proud of",
    "Explain a concept you recently learned",
    "Describe your career goals",
    "Talk about a problem you faced and how you solved it",
    "Describe a situation where you had to learn quickly",
    "Talk about a technology you find interesting",
    "Explain a decision you made under pressure",
    "Describe a time you worked in a team",
    "Talk about a failure and what you learned from it",
    "Explain handling feedback",
    "Describe staying motivated",
    "Explain problem-solving approach",
    "Talk about continuous learning",
    "Describe adapting to change",
    "Explain leadership experience",
    "Talk about communication challenges",
    "Describe managing deadlines",
    "Explain a professional value you believe in",
    "Talk about overcoming self-doubt",
];

/// An ordered, non-empty, immutable set of prompts.
#[derive(Debug, Clone)]
pub struct Catalog {
    prompts: Arc<[Prompt]>,
}

impl Catalog {
    pub fn new(prompts: Vec<Prompt>) -> Result<Self, PracticeError> {
        if prompts.is_empty() {
            return Err(PracticeError::Validation(
                "a prompt catalog needs at least one entry".to_string(),
            ));
        }
        Ok(Self {
            prompts: prompts.into(),
        })
    }

    pub fn speaking_topics() -> Self {
        Self {
            prompts: SPEAKING_TOPICS.iter().map(|t| Prompt::topic(*t)).collect(),
        }
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

/// Picks the quiz topic: a non-blank custom topic wins over the catalog choice.
pub fn resolve_topic(selected: &str, custom: Option<&str>) -> Result<String, PracticeError> {
    let topic = match custom.map(str::trim) {
        Some(custom) if !custom.is_empty() => custom,
        _ => selected.trim(),
    };
    if topic.is_empty() {
        return Err(PracticeError::Validation(
            "Please select or enter a topic".to_string(),
        ));
    }
    Ok(topic.to_string())
}
