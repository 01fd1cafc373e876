use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::models::AnswerKeyPolicy;
use crate::session::SessionConfig;

/// Which speech evaluator the binary wires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatorChoice {
    Placeholder,
    Remote,
}

impl FromStr for EvaluatorChoice {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "placeholder" => Ok(EvaluatorChoice::Placeholder),
            "remote" => Ok(EvaluatorChoice::Remote),
            other => bail!("unknown speech evaluator '{other}' (expected placeholder or remote)"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Every variable has a default, so an empty environment is valid.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub question_count: u32,
    pub think_seconds: u32,
    pub speak_seconds: u32,
    pub topic_changes: u32,
    pub tick_millis: u64,
    pub request_timeout_secs: u64,
    pub token_path: PathBuf,
    pub strict_answer_keys: bool,
    pub speech_evaluator: EvaluatorChoice,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            api_url: std::env::var("PRACTICE_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            question_count: env_or("PRACTICE_QUESTION_COUNT", 5)?,
            think_seconds: env_or("PRACTICE_THINK_SECONDS", 15)?,
            speak_seconds: env_or("PRACTICE_SPEAK_SECONDS", 20)?,
            topic_changes: env_or("PRACTICE_TOPIC_CHANGES", 3)?,
            tick_millis: env_or("PRACTICE_TICK_MILLIS", 1000)?,
            request_timeout_secs: env_or("PRACTICE_REQUEST_TIMEOUT_SECS", 120)?,
            token_path: std::env::var("PRACTICE_TOKEN_PATH")
                .unwrap_or_else(|_| ".practice_token".to_string())
                .into(),
            strict_answer_keys: env_or("PRACTICE_STRICT_ANSWER_KEYS", true)?,
            speech_evaluator: env_or("PRACTICE_SPEECH_EVALUATOR", EvaluatorChoice::Placeholder)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        };

        if config.question_count == 0 {
            bail!("PRACTICE_QUESTION_COUNT must be at least 1");
        }
        if config.tick_millis == 0 {
            bail!("PRACTICE_TICK_MILLIS must be at least 1");
        }
        Ok(config)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn answer_policy(&self) -> AnswerKeyPolicy {
        if self.strict_answer_keys {
            AnswerKeyPolicy::Strict
        } else {
            AnswerKeyPolicy::Lenient
        }
    }

    pub fn speech_session(&self) -> SessionConfig {
        SessionConfig::speech(self.think_seconds, self.speak_seconds, self.topic_changes)
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_or(key, std::env::var(key).ok(), default)
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("{key} has an invalid value '{value}'")),
    }
}
