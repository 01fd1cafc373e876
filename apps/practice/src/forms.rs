//! Client-side checks applied before a form is posted to the backend.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::errors::PracticeError;

const MIN_PASSWORD_LEN: usize = 6;
const MAX_RESUME_BYTES: usize = 10 * 1024 * 1024;
const RESUME_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt"];

pub const JOB_ROLES: &[&str] = &[
    "Data Analyst",
    "Data Scientist",
    "Business Analyst",
    "Machine Learning Engineer",
    "Software Engineer",
    "Full Stack Developer",
    "Backend Developer",
    "Frontend Developer",
    "Product Analyst",
    "AI Engineer",
];

// ────────────────────────────────────────────────────────────────────────────
// Credentials
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Result<Self, PracticeError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(PracticeError::Validation("Email is required".to_string()));
        }
        if !looks_like_email(email) {
            return Err(PracticeError::Validation(
                "Please enter a valid email".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(PracticeError::Validation("Password is required".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PracticeError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(Self {
            email: email.to_string(),
            password: password.to_string(),
        })
    }
}

/// `something@something.something` with no whitespace around the separators.
fn looks_like_email(email: &str) -> bool {
    email.split_whitespace().any(|word| {
        let Some((local, domain)) = word.split_once('@') else {
            return false;
        };
        let Some(dot) = domain.rfind('.') else {
            return false;
        };
        !local.is_empty() && dot > 0 && dot + 1 < domain.len()
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Self introduction
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntroLength {
    #[default]
    #[serde(rename = "15s")]
    Short,
    #[serde(rename = "30s")]
    Standard,
    #[serde(rename = "60s")]
    Detailed,
}

impl IntroLength {
    pub fn as_str(self) -> &'static str {
        match self {
            IntroLength::Short => "15s",
            IntroLength::Standard => "30s",
            IntroLength::Detailed => "60s",
        }
    }

    pub fn parse(value: &str) -> Result<Self, PracticeError> {
        match value.trim() {
            "15s" => Ok(IntroLength::Short),
            "30s" => Ok(IntroLength::Standard),
            "60s" => Ok(IntroLength::Detailed),
            other => Err(PracticeError::Validation(format!(
                "Unsupported introduction length: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tone {
    #[default]
    Formal,
    Neutral,
    Confident,
    Friendly,
}

impl Tone {
    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Formal => "Formal",
            Tone::Neutral => "Neutral",
            Tone::Confident => "Confident",
            Tone::Friendly => "Friendly",
        }
    }

    pub fn parse(value: &str) -> Result<Self, PracticeError> {
        match value.trim() {
            "Formal" => Ok(Tone::Formal),
            "Neutral" => Ok(Tone::Neutral),
            "Confident" => Ok(Tone::Confident),
            "Friendly" => Ok(Tone::Friendly),
            other => Err(PracticeError::Validation(format!("Unsupported tone: {other}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelfIntroRequest {
    pub name: String,
    pub role: String,
    pub length: IntroLength,
    pub tone: Tone,
}

impl SelfIntroRequest {
    /// An empty role falls back to the first catalog role.
    pub fn new(
        name: &str,
        role: &str,
        length: IntroLength,
        tone: Tone,
    ) -> Result<Self, PracticeError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PracticeError::Validation(
                "Please enter your name".to_string(),
            ));
        }
        let role = match role.trim() {
            "" => JOB_ROLES[0],
            role => role,
        };
        Ok(Self {
            name: name.to_string(),
            role: role.to_string(),
            length,
            tone,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Resume upload
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub file_name: String,
    pub contents: Bytes,
    pub job_description: String,
}

impl ResumeUpload {
    pub fn new(
        file_name: &str,
        contents: Bytes,
        job_description: &str,
    ) -> Result<Self, PracticeError> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if !RESUME_EXTENSIONS.contains(&extension.as_str()) {
            return Err(PracticeError::Validation(format!(
                "Unsupported file type: {file_name}. Please upload PDF, DOC, DOCX, or TXT files."
            )));
        }
        if contents.len() > MAX_RESUME_BYTES {
            return Err(PracticeError::Validation(
                "File size should be less than 10MB".to_string(),
            ));
        }
        if job_description.trim().is_empty() {
            return Err(PracticeError::Validation(
                "Please paste a job description".to_string(),
            ));
        }
        Ok(Self {
            file_name: file_name.to_string(),
            contents,
            job_description: job_description.to_string(),
        })
    }
}
