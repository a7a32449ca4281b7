use thiserror::Error;

use crate::session::Phase;

/// Rejected state-machine transitions.
///
/// Invalid calls surface as values, never panics; callers are free to treat
/// them the way a shell disables a button.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("a name is required to start the quiz")]
    NameRequired,

    #[error("not valid in the {0} phase")]
    InvalidPhase(Phase),

    #[error("question is locked after a correct answer")]
    Locked,

    #[error("current question has not been checked yet")]
    Unchecked,

    #[error("already at the first question")]
    AtFirstQuestion,

    #[error("a session needs at least one question")]
    EmptyQuestionSet,
}
