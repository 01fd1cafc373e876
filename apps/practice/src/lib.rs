//! Career-readiness practice sessions: timed aptitude quizzes and spoken
//! vocabulary drills, with local scoring and a client for the practice backend.

pub mod auth;
pub mod capture;
pub mod catalog;
pub mod client;
pub mod config;
pub mod errors;
pub mod forms;
pub mod models;
pub mod scoring;
pub mod session;

pub use errors::{ErrorKind, PracticeError, Report};
pub use session::{Phase, Session, SessionConfig, SessionRunner};
