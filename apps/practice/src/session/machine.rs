//! The practice session state machine shared by the quiz and speech flows.
//!
//! `Session` is synchronous and owns everything mutable about one attempt:
//! prompts, phase, countdown, re-roll budget, responses, capture handle and
//! result. Time only moves when the driver calls `tick`, so the same machine
//! runs under a real clock, a paused test clock or a plain loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::capture::{self, CaptureDevice, CaptureError, CaptureGuard};
use crate::errors::PracticeError;
use crate::models::{Prompt, ScoreRecord, SpeechEvaluation};
use crate::scoring;
use crate::session::collector::{ResponseCollector, ResponseValue};
use crate::session::countdown::{Countdown, Tick};
use crate::session::phase::Phase;
use crate::session::selector::{PromptSelector, RerollBudget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// Fetched multiple-choice questions, scored locally.
    Quiz,
    /// One speaking topic, think timer, record timer, external evaluation.
    Speech,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub flow: Flow,
    /// Length of `preparing` in ticks. 0 skips straight to `responding`.
    pub preparation_secs: u32,
    /// Length of `responding` in ticks. 0 means open until submitted.
    pub response_secs: u32,
    pub reroll_budget: u32,
}

impl SessionConfig {
    pub fn quiz() -> Self {
        Self {
            flow: Flow::Quiz,
            preparation_secs: 0,
            response_secs: 0,
            reroll_budget: 0,
        }
    }

    pub fn speech(think_secs: u32, speak_secs: u32, topic_changes: u32) -> Self {
        Self {
            flow: Flow::Speech,
            preparation_secs: think_secs,
            response_secs: speak_secs,
            reroll_budget: topic_changes,
        }
    }
}

/// Final result of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Score(ScoreRecord),
    Evaluation(SpeechEvaluation),
}

/// Observable changes, drained by whoever drives the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged { from: Phase, to: Phase },
    PromptChanged { prompt: Prompt, rerolls_left: u32 },
    Countdown { phase: Phase, remaining: u32 },
    RecordingCaptured { bytes: usize },
    Completed(Outcome),
}

pub struct Session {
    id: Uuid,
    config: SessionConfig,
    phase: Phase,
    prompts: Vec<Prompt>,
    budget: RerollBudget,
    collector: ResponseCollector,
    submitted: bool,
    outcome: Option<Outcome>,
    completed_at: Option<DateTime<Utc>>,
    countdown: Option<Countdown>,
    // Dropping the guard stops and releases the device, so a dropped
    // session never leaks an open microphone.
    capture: Option<CaptureGuard>,
    device: Option<Box<dyn CaptureDevice>>,
    events: Vec<SessionEvent>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            budget: RerollBudget::new(config.reroll_budget),
            config,
            phase: Phase::Idle,
            prompts: Vec::new(),
            collector: ResponseCollector::default(),
            submitted: false,
            outcome: None,
            completed_at: None,
            countdown: None,
            capture: None,
            device: None,
            events: Vec::new(),
        }
    }

    pub fn with_capture_device(mut self, device: Box<dyn CaptureDevice>) -> Self {
        self.device = Some(device);
        self
    }

    // ── Operations ──────────────────────────────────────────────────────────

    /// Begins a new attempt with the given prompts.
    pub fn start(&mut self, prompts: Vec<Prompt>) -> Result<(), PracticeError> {
        if self.phase.is_active() {
            return Err(PracticeError::AlreadyInProgress(self.phase));
        }
        if prompts.is_empty() {
            return Err(PracticeError::Validation(
                "a session needs at least one prompt".to_string(),
            ));
        }
        if self.config.flow == Flow::Speech {
            match self.device.as_deref_mut() {
                Some(device) => capture::check_access(device)?,
                None => {
                    return Err(
                        CaptureError::Device("no capture device configured".to_string()).into(),
                    )
                }
            }
        }

        self.teardown();
        self.id = Uuid::new_v4();
        self.collector = ResponseCollector::new(prompts.len());
        self.prompts = prompts;
        info!(
            session_id = %self.id,
            flow = ?self.config.flow,
            prompts = self.prompts.len(),
            "Session started"
        );

        if self.config.preparation_secs > 0 {
            self.countdown = Some(Countdown::new(self.config.preparation_secs));
            self.transition(Phase::Preparing);
            Ok(())
        } else {
            self.enter_responding()
        }
    }

    /// Advances the active countdown by one unit.
    /// Returns the new phase when the tick caused a transition.
    pub fn tick(&mut self) -> Result<Option<Phase>, PracticeError> {
        let phase = self.phase;
        let Some(countdown) = self.countdown.as_mut() else {
            return Ok(None);
        };

        match countdown.tick() {
            Tick::Running { remaining } => {
                self.events.push(SessionEvent::Countdown { phase, remaining });
                Ok(None)
            }
            Tick::Spent => {
                self.countdown = None;
                Ok(None)
            }
            Tick::Expired => {
                self.countdown = None;
                self.events.push(SessionEvent::Countdown {
                    phase,
                    remaining: 0,
                });
                match phase {
                    Phase::Preparing => self.enter_responding().map(|_| Some(self.phase)),
                    Phase::Responding => self.close_responding().map(Some),
                    _ => Ok(None),
                }
            }
        }
    }

    /// Swaps the current speaking topic for another one from `selector`.
    pub fn reroll(&mut self, selector: &mut PromptSelector) -> Result<&Prompt, PracticeError> {
        if self.phase != Phase::Preparing {
            return Err(PracticeError::NotPermitted(
                "the topic can only change while preparing".to_string(),
            ));
        }
        let Some(current) = self.prompts.first() else {
            return Err(PracticeError::NotPermitted("no active topic".to_string()));
        };

        match selector.reroll(current, &mut self.budget) {
            Some(next) => {
                debug!(session_id = %self.id, topic = %next.text, "Topic changed");
                self.prompts[0] = next.clone();
                self.events.push(SessionEvent::PromptChanged {
                    prompt: next,
                    rerolls_left: self.budget.remaining(),
                });
                Ok(&self.prompts[0])
            }
            None => Err(PracticeError::NotPermitted(
                "no topic changes left".to_string(),
            )),
        }
    }

    /// Stores or overwrites the response for `slot`.
    pub fn record(&mut self, slot: usize, value: ResponseValue) -> Result<(), PracticeError> {
        if self.submitted || !self.phase.accepts_input() {
            return Err(PracticeError::NotAcceptingInput);
        }
        if self.config.flow == Flow::Speech {
            return Err(PracticeError::NotPermitted(
                "spoken answers are captured from the microphone".to_string(),
            ));
        }
        self.collector.record(slot, value)
    }

    /// Scores a quiz once every question has an answer.
    pub fn submit(&mut self) -> Result<&ScoreRecord, PracticeError> {
        if self.submitted {
            return Err(PracticeError::NotAcceptingInput);
        }
        if self.phase != Phase::Responding {
            return Err(PracticeError::NotPermitted(format!(
                "cannot submit while {}",
                self.phase
            )));
        }
        if self.config.flow == Flow::Speech {
            return Err(PracticeError::NotPermitted(
                "spoken answers are submitted when the speaking time ends".to_string(),
            ));
        }
        if !self.collector.is_complete() {
            return Err(PracticeError::Incomplete {
                answered: self.collector.completion_count(),
                total: self.collector.slots(),
            });
        }

        self.score_now();
        self.score_record().ok_or_else(|| {
            PracticeError::Internal(anyhow::anyhow!("quiz completed without a score"))
        })
    }

    /// Accepts the external evaluation of a captured recording.
    pub fn complete_evaluation(&mut self, evaluation: SpeechEvaluation) -> Result<(), PracticeError> {
        if self.phase != Phase::Scoring || self.config.flow != Flow::Speech {
            return Err(PracticeError::NotPermitted(format!(
                "no recording is awaiting evaluation ({})",
                self.phase
            )));
        }
        info!(
            session_id = %self.id,
            score = evaluation.score,
            verdict = %evaluation.verdict,
            "Speech evaluated"
        );
        self.complete(Outcome::Evaluation(evaluation));
        Ok(())
    }

    /// Stops timers, releases the microphone, discards partial state and
    /// returns to `idle`. Returns false (and does nothing) when not active.
    pub fn cancel(&mut self) -> bool {
        if !self.phase.is_active() {
            return false;
        }
        self.abort("cancelled")
    }

    /// Abandons the current attempt after a failure outside the session,
    /// such as the evaluation service being unreachable.
    pub fn fail(&mut self, reason: &str) -> bool {
        self.abort(reason)
    }

    /// Back to a fresh `idle`, from any phase.
    pub fn reset(&mut self) {
        if self.phase.is_active() {
            self.abort("reset");
            return;
        }
        self.teardown();
        if self.phase != Phase::Idle {
            self.transition(Phase::Idle);
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    pub fn current_prompt(&self) -> Option<&Prompt> {
        self.prompts.first()
    }

    /// Seconds left on the running countdown, if any.
    pub fn remaining_secs(&self) -> Option<u32> {
        self.countdown.as_ref().map(Countdown::remaining)
    }

    pub fn has_running_countdown(&self) -> bool {
        self.countdown.is_some()
    }

    pub fn rerolls_left(&self) -> u32 {
        self.budget.remaining()
    }

    pub fn completion_count(&self) -> usize {
        self.collector.completion_count()
    }

    pub fn response(&self, slot: usize) -> Option<&ResponseValue> {
        self.collector.get(slot)
    }

    /// Whether a manual quiz submission would be accepted now.
    pub fn can_submit(&self) -> bool {
        self.config.flow == Flow::Quiz
            && self.phase == Phase::Responding
            && !self.submitted
            && self.collector.is_complete()
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn is_recording(&self) -> bool {
        self.capture.as_ref().is_some_and(CaptureGuard::is_recording)
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn score_record(&self) -> Option<&ScoreRecord> {
        match &self.outcome {
            Some(Outcome::Score(record)) => Some(record),
            _ => None,
        }
    }

    pub fn evaluation(&self) -> Option<&SpeechEvaluation> {
        match &self.outcome {
            Some(Outcome::Evaluation(evaluation)) => Some(evaluation),
            _ => None,
        }
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// The captured audio of a session awaiting evaluation.
    pub fn recording(&self) -> Option<bytes::Bytes> {
        match self.collector.get(0)? {
            ResponseValue::Recording(audio) => Some(audio.clone()),
            ResponseValue::Choice(_) => None,
        }
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Internals ───────────────────────────────────────────────────────────

    fn enter_responding(&mut self) -> Result<(), PracticeError> {
        if self.config.flow == Flow::Speech {
            let started = match self.device.as_deref_mut() {
                Some(device) => CaptureGuard::start(device),
                None => Err(CaptureError::Device(
                    "no capture device configured".to_string(),
                )),
            };
            match started {
                Ok(guard) => self.capture = Some(guard),
                Err(e) => {
                    warn!(session_id = %self.id, "Could not start recording: {e}");
                    self.abort("capture unavailable");
                    return Err(e.into());
                }
            }
        }

        if self.config.response_secs > 0 {
            self.countdown = Some(Countdown::new(self.config.response_secs));
        }
        self.transition(Phase::Responding);
        Ok(())
    }

    /// Response window ran out: a quiz is scored as it stands, a recording is
    /// finalised and handed over for evaluation.
    fn close_responding(&mut self) -> Result<Phase, PracticeError> {
        if self.config.flow == Flow::Quiz {
            self.score_now();
            return Ok(self.phase);
        }

        let finished = match self.capture.take() {
            Some(guard) => guard.finish(),
            None => Err(CaptureError::Device("no active recording".to_string())),
        };
        let audio = match finished {
            Ok(audio) => audio,
            Err(e) => {
                warn!(session_id = %self.id, "Recording failed: {e}");
                self.abort("recording failed");
                return Err(e.into());
            }
        };

        let bytes = audio.len();
        self.collector.record(0, ResponseValue::Recording(audio))?;
        self.collector.seal();
        self.submitted = true;
        self.events.push(SessionEvent::RecordingCaptured { bytes });
        self.transition(Phase::Scoring);
        Ok(Phase::Scoring)
    }

    fn score_now(&mut self) {
        self.collector.seal();
        self.submitted = true;
        self.countdown = None;
        self.transition(Phase::Scoring);

        let record = scoring::score(&self.prompts, self.collector.responses());
        info!(
            session_id = %self.id,
            correct = record.correct,
            total = record.total,
            percentage = record.percentage,
            "Quiz scored"
        );
        self.complete(Outcome::Score(record));
    }

    fn complete(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome.clone());
        self.completed_at = Some(Utc::now());
        self.events.push(SessionEvent::Completed(outcome));
        self.transition(Phase::Complete);
    }

    fn abort(&mut self, reason: &str) -> bool {
        let was_active = self.phase.is_active();
        if was_active {
            info!(session_id = %self.id, phase = %self.phase, reason, "Session aborted");
            self.transition(Phase::Aborted);
        }
        self.teardown();
        if self.phase != Phase::Idle {
            self.transition(Phase::Idle);
        }
        was_active
    }

    fn teardown(&mut self) {
        self.countdown = None;
        self.capture = None;
        self.prompts.clear();
        self.collector = ResponseCollector::default();
        self.budget = RerollBudget::new(self.config.reroll_budget);
        self.submitted = false;
        self.outcome = None;
        self.completed_at = None;
    }

    fn transition(&mut self, to: Phase) {
        let from = self.phase;
        if from == to {
            return;
        }
        debug!(session_id = %self.id, %from, %to, "Phase transition");
        self.phase = to;
        self.events.push(SessionEvent::PhaseChanged { from, to });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::fake::{Counters, FakeDevice};
    use crate::catalog::Catalog;
    use crate::models::{AnswerKey, ItemResult};

    fn quiz_prompts(count: usize) -> Vec<Prompt> {
        (0..count)
            .map(|i| {
                Prompt::question(
                    format!("Question {i}"),
                    vec!["A".into(), "B".into(), "C".into(), "D".into()],
                    AnswerKey::ByIndex(1),
                )
            })
            .collect()
    }

    fn choice(s: &str) -> ResponseValue {
        ResponseValue::Choice(s.to_string())
    }

    fn speech_session() -> (Session, std::sync::Arc<Counters>) {
        let (device, counters) = FakeDevice::new();
        let session =
            Session::new(SessionConfig::speech(15, 20, 3)).with_capture_device(Box::new(device));
        (session, counters)
    }

    fn tick_n(session: &mut Session, n: u32) {
        for _ in 0..n {
            session.tick().unwrap();
        }
    }

    #[test]
    fn test_quiz_skips_preparation() {
        let mut session = Session::new(SessionConfig::quiz());
        session.start(quiz_prompts(5)).unwrap();
        assert_eq!(session.phase(), Phase::Responding);
        assert!(!session.has_running_countdown());
    }

    #[test]
    fn test_submit_gated_on_every_slot() {
        let mut session = Session::new(SessionConfig::quiz());
        session.start(quiz_prompts(5)).unwrap();

        for slot in 0..4 {
            session.record(slot, choice("B")).unwrap();
            assert!(!session.can_submit());
        }
        let err = session.submit().unwrap_err();
        assert!(matches!(
            err,
            PracticeError::Incomplete {
                answered: 4,
                total: 5
            }
        ));
        assert_eq!(session.phase(), Phase::Responding);

        session.record(4, choice("A")).unwrap();
        assert_eq!(session.completion_count(), 5);
        assert!(session.can_submit());

        let record = session.submit().unwrap().clone();
        assert_eq!(record.correct, 4);
        assert_eq!(record.percentage, 80);
        assert_eq!(record.items[4], ItemResult::Incorrect);
        assert_eq!(session.phase(), Phase::Complete);
        assert!(session.completed_at().is_some());
    }

    #[test]
    fn test_no_writes_after_submission() {
        let mut session = Session::new(SessionConfig::quiz());
        session.start(quiz_prompts(2)).unwrap();
        session.record(0, choice("B")).unwrap();
        session.record(1, choice("C")).unwrap();
        let before = session.submit().unwrap().clone();

        let err = session.record(1, choice("B")).unwrap_err();
        assert!(matches!(err, PracticeError::NotAcceptingInput));
        assert!(session.submit().is_err());
        assert_eq!(session.score_record(), Some(&before));
        assert_eq!(session.response(1), Some(&choice("C")));
    }

    #[test]
    fn test_start_while_active_rejected() {
        let mut session = Session::new(SessionConfig::quiz());
        session.start(quiz_prompts(1)).unwrap();
        let err = session.start(quiz_prompts(3)).unwrap_err();
        assert!(matches!(err, PracticeError::AlreadyInProgress(Phase::Responding)));
        assert_eq!(session.prompts().len(), 1);
    }

    #[test]
    fn test_restart_after_completion() {
        let mut session = Session::new(SessionConfig::quiz());
        session.start(quiz_prompts(1)).unwrap();
        session.record(0, choice("B")).unwrap();
        session.submit().unwrap();

        session.start(quiz_prompts(2)).unwrap();
        assert_eq!(session.phase(), Phase::Responding);
        assert!(session.outcome().is_none());
        assert!(!session.is_submitted());
        assert_eq!(session.completion_count(), 0);
    }

    #[test]
    fn test_timed_quiz_scores_on_expiry() {
        let config = SessionConfig {
            response_secs: 3,
            ..SessionConfig::quiz()
        };
        let mut session = Session::new(config);
        session.start(quiz_prompts(2)).unwrap();
        session.record(0, choice("B")).unwrap();
        tick_n(&mut session, 2);
        assert_eq!(session.phase(), Phase::Responding);
        assert_eq!(session.tick().unwrap(), Some(Phase::Complete));
        let record = session.score_record().unwrap();
        assert_eq!((record.correct, record.total, record.percentage), (1, 2, 50));
    }

    #[test]
    fn test_speech_phases_follow_countdowns() {
        let (mut session, counters) = speech_session();
        session
            .start(vec![Prompt::topic("Describe your career goals")])
            .unwrap();
        assert_eq!(session.phase(), Phase::Preparing);
        assert_eq!(session.remaining_secs(), Some(15));

        tick_n(&mut session, 14);
        assert_eq!(session.phase(), Phase::Preparing);
        assert_eq!(session.tick().unwrap(), Some(Phase::Responding));
        assert!(session.is_recording());
        assert_eq!(session.remaining_secs(), Some(20));

        tick_n(&mut session, 19);
        assert_eq!(session.phase(), Phase::Responding);
        assert_eq!(session.tick().unwrap(), Some(Phase::Scoring));
        assert!(session.is_submitted());
        assert!(!session.is_recording());
        assert_eq!(session.recording().as_deref(), Some(&b"webm-audio"[..]));
        assert!(counters.all_released());

        // The countdown handle is gone; further ticks do nothing.
        assert_eq!(session.tick().unwrap(), None);
        assert_eq!(session.phase(), Phase::Scoring);
    }

    #[test]
    fn test_evaluation_completes_speech_session() {
        let (mut session, _counters) = speech_session();
        session.start(vec![Prompt::topic("t")]).unwrap();
        tick_n(&mut session, 35);
        let evaluation: SpeechEvaluation =
            serde_json::from_value(serde_json::json!({ "score": 81, "verdict": "Good" })).unwrap();
        session.complete_evaluation(evaluation.clone()).unwrap();
        assert_eq!(session.phase(), Phase::Complete);
        assert_eq!(session.evaluation(), Some(&evaluation));
        assert!(session.complete_evaluation(evaluation).is_err());
    }

    #[test]
    fn test_speech_rejects_manual_writes() {
        let (mut session, _counters) = speech_session();
        session.start(vec![Prompt::topic("t")]).unwrap();
        tick_n(&mut session, 15);
        assert!(matches!(
            session.record(0, choice("x")),
            Err(PracticeError::NotPermitted(_))
        ));
        assert!(session.submit().is_err());
    }

    #[test]
    fn test_reroll_only_while_preparing_and_within_budget() {
        let (mut session, _counters) = speech_session();
        let mut selector = PromptSelector::seeded(Catalog::speaking_topics(), 42);
        let first = selector.choose(None);
        session.start(vec![first.clone()]).unwrap();

        let mut current = first;
        for left in [2, 1, 0] {
            let next = session.reroll(&mut selector).unwrap().clone();
            assert_ne!(next, current);
            assert_eq!(session.rerolls_left(), left);
            current = next;
        }

        let err = session.reroll(&mut selector).unwrap_err();
        assert!(matches!(err, PracticeError::NotPermitted(_)));
        assert_eq!(session.current_prompt(), Some(&current));
        assert_eq!(session.rerolls_left(), 0);
    }

    #[test]
    fn test_reroll_outside_preparing_keeps_budget() {
        let (mut session, _counters) = speech_session();
        let mut selector = PromptSelector::seeded(Catalog::speaking_topics(), 1);
        session.start(vec![selector.choose(None)]).unwrap();
        tick_n(&mut session, 15);
        assert_eq!(session.phase(), Phase::Responding);
        assert!(session.reroll(&mut selector).is_err());
        assert_eq!(session.rerolls_left(), 3);
    }

    #[test]
    fn test_cancel_while_recording_releases_capture() {
        let (mut session, counters) = speech_session();
        session.start(vec![Prompt::topic("t")]).unwrap();
        tick_n(&mut session, 20);
        assert!(session.is_recording());

        assert!(session.cancel());
        assert_eq!(session.phase(), Phase::Idle);
        assert!(counters.all_released());
        assert!(!session.has_running_countdown());
        assert!(session.outcome().is_none());
        assert!(session.prompts().is_empty());

        let events = session.drain_events();
        assert!(events.contains(&SessionEvent::PhaseChanged {
            from: Phase::Responding,
            to: Phase::Aborted
        }));
        assert!(!events
            .iter()
            .any(|e| matches!(e, SessionEvent::Completed(_))));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut session = Session::new(SessionConfig::quiz());
        assert!(!session.cancel());
        session.start(quiz_prompts(1)).unwrap();
        assert!(session.cancel());
        assert!(!session.cancel());
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn test_cancel_after_completion_is_noop() {
        let mut session = Session::new(SessionConfig::quiz());
        session.start(quiz_prompts(1)).unwrap();
        session.record(0, choice("B")).unwrap();
        session.submit().unwrap();
        assert!(!session.cancel());
        assert_eq!(session.phase(), Phase::Complete);
        assert!(session.score_record().is_some());
    }

    #[test]
    fn test_permission_denied_fails_start() {
        let (device, counters) = FakeDevice::denying();
        let mut session =
            Session::new(SessionConfig::speech(15, 20, 3)).with_capture_device(Box::new(device));

        let err = session.start(vec![Prompt::topic("t")]).unwrap_err();
        assert!(matches!(err, PracticeError::Capture(CaptureError::PermissionDenied)));
        assert_eq!(session.phase(), Phase::Idle);
        assert!(!session.has_running_countdown());
        assert!(session.prompts().is_empty());
        assert!(session.drain_events().is_empty());
        assert_eq!(Counters::get(&counters.acquired), 0);
    }

    #[test]
    fn test_access_check_holds_no_handle_while_preparing() {
        let (mut session, counters) = speech_session();
        session.start(vec![Prompt::topic("t")]).unwrap();
        assert_eq!(session.phase(), Phase::Preparing);
        assert!(!session.is_recording());
        assert!(counters.all_released());
        assert_eq!(Counters::get(&counters.started), 0);
    }

    #[test]
    fn test_dropping_session_releases_capture() {
        let (mut session, counters) = speech_session();
        session.start(vec![Prompt::topic("t")]).unwrap();
        tick_n(&mut session, 15);
        assert!(session.is_recording());
        drop(session);
        assert!(counters.all_released());
        assert_eq!(Counters::get(&counters.stopped), 1);
    }

    #[test]
    fn test_fail_during_scoring_discards_recording() {
        let (mut session, _counters) = speech_session();
        session.start(vec![Prompt::topic("t")]).unwrap();
        tick_n(&mut session, 35);
        assert_eq!(session.phase(), Phase::Scoring);
        assert!(session.fail("evaluation service unavailable"));
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.recording().is_none());
        assert!(!session.is_submitted());
    }

    #[test]
    fn test_speech_without_device_rejected() {
        let mut session = Session::new(SessionConfig::speech(15, 20, 3));
        assert!(session.start(vec![Prompt::topic("t")]).is_err());
        assert_eq!(session.phase(), Phase::Idle);
    }
}
