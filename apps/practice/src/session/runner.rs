//! Async driver for a `Session`.
//!
//! One task owns the session and serialises caller commands, countdown ticks
//! and the completion of remote calls through a single `select!` loop. Remote
//! calls are kept as pending futures on the loop rather than awaited inline,
//! so a cancel that arrives mid-request simply drops the request.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::catalog::resolve_topic;
use crate::client::{QuestionService, ServiceError, SpeechEvaluator};
use crate::errors::{PracticeError, Report};
use crate::models::{Prompt, SpeechEvaluation};
use crate::session::collector::ResponseValue;
use crate::session::countdown::Ticker;
use crate::session::machine::{Flow, Session, SessionEvent};
use crate::session::phase::Phase;
use crate::session::selector::PromptSelector;

const COMMAND_BUFFER: usize = 32;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

#[derive(Debug)]
pub enum Command {
    /// Quiz: fetch questions for `topic`. Speech: use `topic` as the speaking
    /// prompt, or draw one from the catalog when `None`.
    Start { topic: Option<String> },
    Reroll,
    Record { slot: usize, value: ResponseValue },
    Submit,
    Cancel,
    Reset,
    Shutdown,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Start { .. } => "start",
            Command::Reroll => "reroll",
            Command::Record { .. } => "record",
            Command::Submit => "submit",
            Command::Cancel => "cancel",
            Command::Reset => "reset",
            Command::Shutdown => "shutdown",
        }
    }
}

/// Everything an observer of the runner gets to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    Event(SessionEvent),
    /// Questions were requested from the remote service.
    Loading { topic: String },
    /// Questions arrived and the quiz is open for answers.
    Prompts(Vec<Prompt>),
    /// A command was refused; the session is unchanged.
    Rejected { command: &'static str, report: Report },
    /// The attempt was abandoned and the session is back in `idle`.
    Failed(Report),
}

/// Where prompts come from and where finished answers go.
pub enum Backend {
    Quiz {
        questions: Arc<dyn QuestionService>,
        count: u32,
    },
    Speech {
        selector: PromptSelector,
        evaluator: Arc<dyn SpeechEvaluator>,
    },
}

impl Backend {
    fn flow(&self) -> Flow {
        match self {
            Backend::Quiz { .. } => Flow::Quiz,
            Backend::Speech { .. } => Flow::Speech,
        }
    }
}

enum Pending {
    Questions(BoxFuture<Result<Vec<Prompt>, ServiceError>>),
    Evaluation(BoxFuture<Result<SpeechEvaluation, ServiceError>>),
}

enum Settled {
    Questions(Result<Vec<Prompt>, ServiceError>),
    Evaluation(Result<SpeechEvaluation, ServiceError>),
}

/// Resolves when the in-flight remote call does; never resolves when idle.
async fn settle(pending: &mut Option<Pending>) -> Settled {
    match pending {
        Some(Pending::Questions(fut)) => Settled::Questions(fut.await),
        Some(Pending::Evaluation(fut)) => Settled::Evaluation(fut.await),
        None => std::future::pending().await,
    }
}

/// Cloneable sender side of a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    pub async fn send(&self, command: Command) -> Result<(), PracticeError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PracticeError::Internal(anyhow!("session runner has stopped")))
    }

    pub async fn start(&self, topic: Option<String>) -> Result<(), PracticeError> {
        self.send(Command::Start { topic }).await
    }

    pub async fn reroll(&self) -> Result<(), PracticeError> {
        self.send(Command::Reroll).await
    }

    pub async fn record(&self, slot: usize, value: ResponseValue) -> Result<(), PracticeError> {
        self.send(Command::Record { slot, value }).await
    }

    pub async fn submit(&self) -> Result<(), PracticeError> {
        self.send(Command::Submit).await
    }

    pub async fn cancel(&self) -> Result<(), PracticeError> {
        self.send(Command::Cancel).await
    }

    pub async fn reset(&self) -> Result<(), PracticeError> {
        self.send(Command::Reset).await
    }

    pub async fn shutdown(&self) -> Result<(), PracticeError> {
        self.send(Command::Shutdown).await
    }
}

pub struct SessionRunner {
    session: Session,
    backend: Backend,
    ticker: Ticker,
    pending: Option<Pending>,
    commands: mpsc::Receiver<Command>,
    updates: mpsc::UnboundedSender<SessionUpdate>,
}

impl SessionRunner {
    pub fn new(
        session: Session,
        backend: Backend,
        tick_period: Duration,
    ) -> Result<(Self, SessionHandle, mpsc::UnboundedReceiver<SessionUpdate>), PracticeError> {
        if session.config().flow != backend.flow() {
            return Err(PracticeError::Internal(anyhow!(
                "session flow {:?} does not match its backend",
                session.config().flow
            )));
        }
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let runner = Self {
            session,
            backend,
            ticker: Ticker::new(tick_period),
            pending: None,
            commands: command_rx,
            updates: update_tx,
        };
        let handle = SessionHandle {
            commands: command_tx,
        };
        Ok((runner, handle, update_rx))
    }

    /// Builds the runner and spawns it on the current runtime.
    pub fn spawn(
        session: Session,
        backend: Backend,
        tick_period: Duration,
    ) -> Result<(SessionHandle, mpsc::UnboundedReceiver<SessionUpdate>, JoinHandle<()>), PracticeError>
    {
        let (runner, handle, updates) = Self::new(session, backend, tick_period)?;
        let task = tokio::spawn(runner.run());
        Ok((handle, updates, task))
    }

    pub async fn run(mut self) {
        info!(session_id = %self.session.id(), "Session runner started");

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(Command::Shutdown) | None => break,
                        Some(command) => self.handle_command(command),
                    }
                }
                _ = self.ticker.tick() => self.handle_tick(),
                settled = settle(&mut self.pending) => {
                    self.pending = None;
                    self.handle_settled(settled);
                }
            }
            self.flush_events();
            self.sync_ticker();
        }

        self.pending = None;
        self.ticker.cancel();
        self.session.cancel();
        self.flush_events();
        info!(session_id = %self.session.id(), "Session runner stopped");
    }

    // ── Commands ────────────────────────────────────────────────────────────

    fn handle_command(&mut self, command: Command) {
        let name = command.name();
        debug!(command = name, phase = %self.session.phase(), "Command received");

        let result = match command {
            Command::Start { topic } => self.start(topic),
            Command::Reroll => match &mut self.backend {
                Backend::Speech { selector, .. } => self.session.reroll(selector).map(|_| ()),
                Backend::Quiz { .. } => Err(PracticeError::NotPermitted(
                    "quiz questions cannot be re-rolled".to_string(),
                )),
            },
            Command::Record { slot, value } => self.session.record(slot, value),
            Command::Submit => self.session.submit().map(|_| ()),
            Command::Cancel => {
                self.cancel();
                Ok(())
            }
            Command::Reset => {
                self.pending = None;
                self.session.reset();
                Ok(())
            }
            Command::Shutdown => Ok(()),
        };

        if let Err(err) = result {
            self.report_error(name, err);
        }
    }

    fn start(&mut self, topic: Option<String>) -> Result<(), PracticeError> {
        if self.pending.is_some() {
            return Err(PracticeError::NotPermitted(
                "a request for this session is still in flight".to_string(),
            ));
        }
        if self.session.phase().is_active() {
            return Err(PracticeError::AlreadyInProgress(self.session.phase()));
        }

        match &mut self.backend {
            Backend::Quiz { questions, count } => {
                let topic = resolve_topic("", topic.as_deref())?;
                let service = Arc::clone(questions);
                let count = *count;
                let request_topic = topic.clone();
                self.pending = Some(Pending::Questions(Box::pin(async move {
                    service.fetch_questions(&request_topic, count).await
                })));
                info!(%topic, count, "Requesting questions");
                self.emit(SessionUpdate::Loading { topic });
                Ok(())
            }
            Backend::Speech { selector, .. } => {
                let prompt = match topic {
                    Some(topic) if !topic.trim().is_empty() => Prompt::topic(topic.trim()),
                    _ => selector.choose(None),
                };
                self.session.start(vec![prompt])?;
                self.emit_current_prompt();
                Ok(())
            }
        }
    }

    fn cancel(&mut self) {
        let dropped_request = self.pending.take().is_some();
        let cancelled = self.session.cancel();
        if dropped_request || cancelled {
            info!(
                session_id = %self.session.id(),
                dropped_request,
                "Session cancelled"
            );
        }
    }

    // ── Ticks and remote results ────────────────────────────────────────────

    fn handle_tick(&mut self) {
        match self.session.tick() {
            Ok(Some(Phase::Scoring)) if self.session.config().flow == Flow::Speech => {
                self.begin_evaluation();
            }
            Ok(_) => {}
            Err(err) => self.report_failure(err),
        }
    }

    fn begin_evaluation(&mut self) {
        let evaluator = match &self.backend {
            Backend::Speech { evaluator, .. } => Arc::clone(evaluator),
            Backend::Quiz { .. } => return,
        };
        let topic = self.session.current_prompt().map(|p| p.text.clone());
        let (Some(recording), Some(topic)) = (self.session.recording(), topic) else {
            self.session.fail("nothing to evaluate");
            self.report_failure(PracticeError::Internal(anyhow!(
                "speech session reached scoring without a recording"
            )));
            return;
        };

        debug!(%topic, bytes = recording.len(), "Submitting recording for evaluation");
        self.pending = Some(Pending::Evaluation(Box::pin(async move {
            evaluator.evaluate(&topic, recording).await
        })));
    }

    fn handle_settled(&mut self, settled: Settled) {
        match settled {
            Settled::Questions(Ok(prompts)) => match self.session.start(prompts) {
                Ok(()) => {
                    let prompts = self.session.prompts().to_vec();
                    self.flush_events();
                    self.emit(SessionUpdate::Prompts(prompts));
                }
                Err(err) => self.report_failure(err),
            },
            Settled::Evaluation(Ok(evaluation)) => {
                if let Err(err) = self.session.complete_evaluation(evaluation) {
                    self.report_failure(err);
                }
            }
            Settled::Questions(Err(err)) | Settled::Evaluation(Err(err)) => {
                warn!(session_id = %self.session.id(), "Remote call failed: {err}");
                self.session.fail("remote service failed");
                self.report_failure(PracticeError::Remote(err));
            }
        }
    }

    // ── Plumbing ────────────────────────────────────────────────────────────

    fn sync_ticker(&mut self) {
        match (self.session.has_running_countdown(), self.ticker.is_running()) {
            (true, false) => self.ticker.start(),
            (false, true) => self.ticker.cancel(),
            _ => {}
        }
    }

    fn emit_current_prompt(&mut self) {
        if let Some(prompt) = self.session.current_prompt().cloned() {
            let rerolls_left = self.session.rerolls_left();
            self.emit(SessionUpdate::Event(SessionEvent::PromptChanged {
                prompt,
                rerolls_left,
            }));
        }
    }

    fn flush_events(&mut self) {
        for event in self.session.drain_events() {
            self.emit(SessionUpdate::Event(event));
        }
    }

    fn report_error(&mut self, command: &'static str, err: PracticeError) {
        debug!(command, code = err.code(), "Command rejected: {err}");
        self.emit(SessionUpdate::Rejected {
            command,
            report: Report::from(&err),
        });
    }

    fn report_failure(&mut self, err: PracticeError) {
        // Session events go out first so observers see the abort before the cause.
        self.flush_events();
        self.emit(SessionUpdate::Failed(Report::from(&err)));
    }

    fn emit(&self, update: SessionUpdate) {
        // Nobody listening is fine; the session still runs to completion.
        let _ = self.updates.send(update);
    }
}
