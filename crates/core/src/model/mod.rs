mod identity;
mod question;
mod result;

pub use identity::Identity;
pub use question::{Question, QuestionBank};
pub use result::{ExternalResult, QuizResult};
