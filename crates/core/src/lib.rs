#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod page;
pub mod session;
pub mod time;

pub use error::SessionError;
pub use model::{ExternalResult, Identity, Question, QuestionBank, QuizResult};
pub use page::slug_from_path;
pub use session::{Advanced, CheckOutcome, Feedback, Phase, Session, SessionProgress};
pub use time::Clock;
