pub mod collector;
pub mod countdown;
pub mod machine;
pub mod phase;
pub mod runner;
pub mod selector;

pub use collector::{ResponseCollector, ResponseValue};
pub use countdown::{Countdown, Tick, Ticker};
pub use machine::{Flow, Outcome, Session, SessionConfig, SessionEvent};
pub use phase::Phase;
pub use runner::{Backend, Command, SessionHandle, SessionRunner, SessionUpdate};
pub use selector::{PromptSelector, RerollBudget, DEFAULT_REROLL_BUDGET};
