//! Practice backend client, the single point of entry for every call to the
//! remote question, evaluation, self-introduction, resume and auth endpoints.
//!
//! Sessions only see the two narrow traits below; `PracticeClient` is the
//! HTTP implementation of both, and `placeholder` offers a local stand-in for
//! speech evaluation.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::forms::{Credentials, ResumeUpload, SelfIntroRequest};
use crate::models::{normalize_questions, AnswerKeyPolicy, PayloadError, Prompt, SpeechEvaluation};

pub mod placeholder;

pub use placeholder::PlaceholderEvaluator;

const MAX_RETRIES: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const RECORDING_FILE_NAME: &str = "speech.webm";
const RECORDING_MIME: &str = "audio/webm";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid question payload: {0}")]
    InvalidPayload(#[from] PayloadError),

    #[error("Service unavailable after {retries} retries")]
    RetriesExhausted { retries: u32 },

    #[error("Service returned an empty response")]
    EmptyPayload,
}

/// Source of quiz questions.
#[async_trait]
pub trait QuestionService: Send + Sync {
    async fn fetch_questions(&self, topic: &str, count: u32) -> Result<Vec<Prompt>, ServiceError>;
}

/// Evaluates a recorded spoken answer.
#[async_trait]
pub trait SpeechEvaluator: Send + Sync {
    async fn evaluate(&self, topic: &str, recording: Bytes) -> Result<SpeechEvaluation, ServiceError>;
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
}

#[derive(Debug, Deserialize)]
struct SelfIntroResponse {
    result: Option<String>,
}

/// FastAPI error body: `{"detail": "..."}` or a list of validation issues.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    detail: Value,
}

#[derive(Clone)]
pub struct PracticeClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    answer_policy: AnswerKeyPolicy,
    backoff: Duration,
}

impl PracticeClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            answer_policy: AnswerKeyPolicy::default(),
            backoff: BACKOFF_BASE,
        })
    }

    /// Sends `Authorization: Bearer <token>` on every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_answer_policy(mut self, policy: AnswerKeyPolicy) -> Self {
        self.answer_policy = policy;
        self
    }

    /// First retry delay; each further retry doubles it.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /selfintro/generate
    pub async fn generate_self_intro(&self, request: &SelfIntroRequest) -> Result<String, ServiceError> {
        let response: SelfIntroResponse = self
            .post_form("/selfintro/generate", || {
                Ok(Form::new()
                    .text("name", request.name.clone())
                    .text("role", request.role.clone())
                    .text("length", request.length.as_str())
                    .text("tone", request.tone.as_str()))
            })
            .await?;
        response
            .result
            .filter(|r| !r.trim().is_empty())
            .ok_or(ServiceError::EmptyPayload)
    }

    /// POST /analyze/resume/analyze. The analysis shape belongs to the backend.
    pub async fn analyze_resume(&self, upload: &ResumeUpload) -> Result<Value, ServiceError> {
        self.post_form("/analyze/resume/analyze", || {
            let file = Part::bytes(upload.contents.to_vec()).file_name(upload.file_name.clone());
            Ok(Form::new()
                .part("file", file)
                .text("job_description", upload.job_description.clone()))
        })
        .await
    }

    /// POST /auth/login
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenResponse, ServiceError> {
        self.post_form("/auth/login", || Ok(credentials_form(credentials)))
            .await
    }

    /// POST /auth/signup
    pub async fn signup(
        &self,
        credentials: &Credentials,
        name: Option<&str>,
    ) -> Result<TokenResponse, ServiceError> {
        self.post_form("/auth/signup", || {
            let form = credentials_form(credentials);
            Ok(match name {
                Some(name) => form.text("name", name.to_string()),
                None => form,
            })
        })
        .await
    }

    /// Posts a multipart form, retrying 429 and 5xx responses with exponential
    /// backoff. Forms are single-use, so `build` is called once per attempt.
    async fn post_form<T, F>(&self, path: &str, build: F) -> Result<T, ServiceError>
    where
        T: DeserializeOwned,
        F: Fn() -> Result<Form, ServiceError>,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error: Option<ServiceError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = self.backoff * (1 << (attempt - 1));
                warn!(
                    "POST {} attempt {} failed, retrying after {}ms...",
                    path,
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(&url).multipart(build()?);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(ServiceError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("POST {} returned {}: {}", path, status, body);
                last_error = Some(ServiceError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            let body = response.text().await?;

            if !status.is_success() {
                return Err(ServiceError::Api {
                    status: status.as_u16(),
                    message: error_message(&body),
                });
            }

            if body.trim().is_empty() {
                return Err(ServiceError::EmptyPayload);
            }

            debug!("POST {} succeeded ({} bytes)", path, body.len());
            return serde_json::from_str(&body).map_err(ServiceError::Parse);
        }

        if let Some(err) = last_error {
            warn!("POST {} giving up after {} attempts: {}", path, MAX_RETRIES, err);
        }
        Err(ServiceError::RetriesExhausted {
            retries: MAX_RETRIES,
        })
    }
}

#[async_trait]
impl QuestionService for PracticeClient {
    /// POST /aptitude/questions
    async fn fetch_questions(&self, topic: &str, count: u32) -> Result<Vec<Prompt>, ServiceError> {
        let payload: Value = self
            .post_form("/aptitude/questions", || {
                Ok(Form::new()
                    .text("topic", topic.to_string())
                    .text("count", count.to_string()))
            })
            .await?;
        let prompts = normalize_questions(payload, self.answer_policy)?;
        debug!(topic, fetched = prompts.len(), "Questions loaded");
        Ok(prompts)
    }
}

#[async_trait]
impl SpeechEvaluator for PracticeClient {
    /// POST /vocab/evaluate
    async fn evaluate(&self, topic: &str, recording: Bytes) -> Result<SpeechEvaluation, ServiceError> {
        self.post_form("/vocab/evaluate", || {
            let file = Part::bytes(recording.to_vec())
                .file_name(RECORDING_FILE_NAME)
                .mime_str(RECORDING_MIME)?;
            Ok(Form::new().part("file", file).text("topic", topic.to_string()))
        })
        .await
    }
}

fn credentials_form(credentials: &Credentials) -> Form {
    Form::new()
        .text("email", credentials.email.clone())
        .text("password", credentials.password.clone())
}

/// Pulls a readable message out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(ApiErrorBody {
            detail: Value::String(detail),
        }) => detail,
        Ok(ApiErrorBody { detail }) => detail.to_string(),
        Err(_) => body.to_string(),
    }
}
