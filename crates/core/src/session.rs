use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::model::{ExternalResult, Identity, Question, QuestionBank, QuizResult};

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Where a session sits in the intro → questions → summary flow.
///
/// The flow is linear; the only backward transition is an explicit restart
/// from `Summary` to `IntroForm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    IntroForm,
    Answering,
    Summary,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::IntroForm => write!(f, "intro form"),
            Phase::Answering => write!(f, "answering"),
            Phase::Summary => write!(f, "summary"),
        }
    }
}

//
// ─── VIEW STATE ────────────────────────────────────────────────────────────────
//

/// Per-question message shown after a check and restored on backward
/// navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feedback {
    Correct,
    Incorrect { expected: String },
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feedback::Correct => write!(f, "Correct! Well done."),
            Feedback::Incorrect { expected } => {
                write!(f, "Wrong. The correct answer is: \"{expected}\"")
            }
        }
    }
}

/// Outcome of a single answer check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub correct: bool,
    pub score: u32,
    pub percentage: u32,
    pub feedback: Feedback,
}

/// Outcome of a successful `advance` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advanced {
    /// Moved to the question at `index`.
    Moved { index: usize },
    /// Stepped past the last question into the summary.
    Finished(QuizResult),
}

/// Aggregated progress view for hosting shells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub current_index: usize,
    pub total: usize,
    pub answered: usize,
    pub score: u32,
    pub percentage: u32,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One participant's pass through a question set.
///
/// Answers and correctness are sparse per-index maps: navigating backward and
/// forward never loses a recorded answer, and an index with no correctness
/// entry blocks advancement past it. Score and percentage are always derived
/// from the correctness map, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    questions: Vec<Question>,
    current: usize,
    user_answers: Vec<Option<String>>,
    correct: Vec<Option<bool>>,
    phase: Phase,
    identity: Option<Identity>,
    locked: bool,
    feedback: Option<Feedback>,
    external: Option<ExternalResult>,
}

impl Session {
    /// Creates a fresh session on the intro form.
    ///
    /// `prefill` seeds the identity fields the way declarative configuration
    /// can; the identity is only committed by `submit_intro`.
    #[must_use]
    pub fn new(bank: QuestionBank, prefill: Option<Identity>) -> Self {
        let questions = bank.into_questions();
        let len = questions.len();
        Self {
            questions,
            current: 0,
            user_answers: vec![None; len],
            correct: vec![None; len],
            phase: Phase::IntroForm,
            identity: prefill,
            locked: false,
            feedback: None,
            external: None,
        }
    }

    /// Rehydrates a session from a persisted snapshot.
    ///
    /// The saved index is clamped into range and the answer arrays resized to
    /// the question count. The session lands in `Summary` when the snapshot
    /// says so or when every question carries both an answer and a
    /// correctness entry; otherwise it resumes `Answering` at the saved
    /// index.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyQuestionSet` if the snapshot carries no
    /// questions.
    pub fn resume(
        questions: Vec<Question>,
        mut user_answers: Vec<Option<String>>,
        mut correct_answers: Vec<Option<bool>>,
        current_index: usize,
        show_summary: bool,
        identity: Option<Identity>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::EmptyQuestionSet);
        }
        let len = questions.len();
        user_answers.resize(len, None);
        correct_answers.resize(len, None);

        let finished = user_answers.iter().all(Option::is_some)
            && correct_answers.iter().all(Option::is_some);
        let phase = if show_summary || finished {
            Phase::Summary
        } else {
            Phase::Answering
        };
        let current = current_index.min(len - 1);
        let locked = phase == Phase::Summary || correct_answers[current] == Some(true);

        Ok(Self {
            questions,
            current,
            user_answers,
            correct: correct_answers,
            phase,
            identity,
            locked,
            feedback: None,
            external: None,
        })
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────────
    //

    /// Records the participant identity and starts answering at index 0.
    ///
    /// Any prior answer state is cleared.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NameRequired` if the name is empty, or
    /// `SessionError::InvalidPhase` outside the intro form.
    pub fn submit_intro(&mut self, identity: Identity) -> Result<(), SessionError> {
        if self.phase != Phase::IntroForm {
            return Err(SessionError::InvalidPhase(self.phase));
        }
        if !identity.has_name() {
            return Err(SessionError::NameRequired);
        }
        self.identity = Some(identity);
        self.reset_answers();
        self.phase = Phase::Answering;
        Ok(())
    }

    /// Checks the given input against the current question.
    ///
    /// The normalized input is recorded at the current index regardless of
    /// correctness, overwriting any previous answer there; empty input is a
    /// concrete incorrect answer, not an error. A correct answer locks the
    /// question until navigation moves off it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Locked` when the current question was already
    /// answered correctly, or `SessionError::InvalidPhase` outside
    /// `Answering`.
    pub fn check_answer(&mut self, raw: &str) -> Result<CheckOutcome, SessionError> {
        if self.phase != Phase::Answering {
            return Err(SessionError::InvalidPhase(self.phase));
        }
        if self.locked {
            return Err(SessionError::Locked);
        }

        let submitted = raw.trim().to_lowercase();
        let correct = submitted == self.questions[self.current].answer;
        self.user_answers[self.current] = Some(submitted);
        self.correct[self.current] = Some(correct);

        let feedback = if correct {
            self.locked = true;
            Feedback::Correct
        } else {
            Feedback::Incorrect {
                expected: self.questions[self.current].answer.clone(),
            }
        };
        self.feedback = Some(feedback.clone());

        Ok(CheckOutcome {
            correct,
            score: self.score(),
            percentage: self.percentage(),
            feedback,
        })
    }

    /// Moves to the next question, or finishes into the summary from the
    /// last one.
    ///
    /// Moving forward clears the feedback and restores the lock for an index
    /// that was already answered correctly.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Unchecked` when the current question has no
    /// correctness entry yet, or `SessionError::InvalidPhase` outside
    /// `Answering`.
    pub fn advance(&mut self) -> Result<Advanced, SessionError> {
        if self.phase != Phase::Answering {
            return Err(SessionError::InvalidPhase(self.phase));
        }
        if self.correct[self.current].is_none() {
            return Err(SessionError::Unchecked);
        }

        if self.current + 1 < self.questions.len() {
            self.current += 1;
            self.feedback = None;
            self.locked = self.correct[self.current] == Some(true);
            Ok(Advanced::Moved {
                index: self.current,
            })
        } else {
            self.phase = Phase::Summary;
            self.locked = true;
            Ok(Advanced::Finished(self.result(true)))
        }
    }

    /// Moves back one question, restoring its recorded answer, lock state,
    /// and feedback.
    ///
    /// A pure view operation: no side effects, no persistence, no events.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AtFirstQuestion` at index 0, or
    /// `SessionError::InvalidPhase` outside `Answering`.
    pub fn retreat(&mut self) -> Result<(), SessionError> {
        if self.phase != Phase::Answering {
            return Err(SessionError::InvalidPhase(self.phase));
        }
        if self.current == 0 {
            return Err(SessionError::AtFirstQuestion);
        }
        self.current -= 1;
        let correct = self.correct[self.current];
        self.locked = correct == Some(true);
        self.feedback = match correct {
            Some(true) => Some(Feedback::Correct),
            Some(false) => Some(Feedback::Incorrect {
                expected: self.questions[self.current].answer.clone(),
            }),
            None => None,
        };
        Ok(())
    }

    /// Returns to the intro form from the summary, clearing all answer state
    /// and any remote override.
    ///
    /// Identity fields are retained across a restart.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `Summary`.
    pub fn restart(&mut self) -> Result<(), SessionError> {
        if self.phase != Phase::Summary {
            return Err(SessionError::InvalidPhase(self.phase));
        }
        self.external = None;
        self.reset_answers();
        self.phase = Phase::IntroForm;
        Ok(())
    }

    /// Applies an authoritative remote result, forcing the summary view and
    /// disabling intro and answering.
    pub fn apply_remote(&mut self, remote: ExternalResult) {
        self.external = Some(remote);
        self.phase = Phase::Summary;
        self.locked = true;
    }

    fn reset_answers(&mut self) {
        let len = self.questions.len();
        self.current = 0;
        self.user_answers = vec![None; len];
        self.correct = vec![None; len];
        self.locked = false;
        self.feedback = None;
    }

    //
    // ─── DERIVED STATE ─────────────────────────────────────────────────────────
    //

    /// Count of correctly answered questions.
    #[must_use]
    pub fn score(&self) -> u32 {
        let count = self.correct.iter().flatten().filter(|c| **c).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Rounded percentage of correct answers. Safe because the question set
    /// is never empty.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn percentage(&self) -> u32 {
        let ratio = f64::from(self.score()) / self.questions.len() as f64;
        (ratio * 100.0).round() as u32
    }

    /// The running result payload; `finished` results carry the total.
    #[must_use]
    pub fn result(&self, finished: bool) -> QuizResult {
        #[allow(clippy::cast_possible_truncation)]
        let total = self.questions.len() as u32;
        QuizResult {
            score: self.score(),
            percentage: self.percentage(),
            finished,
            total: finished.then_some(total),
        }
    }

    /// The result shown on the summary, preferring a remote override.
    #[must_use]
    pub fn summary(&self) -> QuizResult {
        match self.external {
            Some(ext) => QuizResult {
                score: ext.score,
                percentage: ext.percentage,
                finished: true,
                total: Some(ext.total),
            },
            None => self.result(true),
        }
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            current_index: self.current,
            total: self.questions.len(),
            answered: self.user_answers.iter().flatten().count(),
            score: self.score(),
            percentage: self.percentage(),
        }
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn user_answers(&self) -> &[Option<String>] {
        &self.user_answers
    }

    #[must_use]
    pub fn correct_answers(&self) -> &[Option<bool>] {
        &self.correct
    }

    /// The recorded answer text for the current index, for input restoration.
    #[must_use]
    pub fn answer_text(&self) -> Option<&str> {
        self.user_answers[self.current].as_deref()
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    /// True when further input for the current question is locked.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// True when the current question has been checked at least once.
    #[must_use]
    pub fn is_checked(&self) -> bool {
        self.correct[self.current].is_some()
    }

    #[must_use]
    pub fn external(&self) -> Option<&ExternalResult> {
        self.external.as_ref()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
