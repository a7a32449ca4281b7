#![forbid(unsafe_code)]

pub mod confetti;
pub mod error;
pub mod events;
pub mod manifest;
pub mod quiz_service;
pub mod recorder;
pub mod sender;

pub use quiz_core::Clock;

pub use confetti::{ConfettiHook, NoConfetti};
pub use error::{DeliveryError, ManifestError};
pub use events::{EventBus, QuizEvent};
pub use manifest::{
    HttpManifestClient, ItemMetadata, ManifestApi, ManifestItem, RemoteQuizRecord, SiteManifest,
};
pub use quiz_service::{QuizConfig, QuizService};
pub use recorder::ResultRecorder;
pub use sender::{DeliveryStatus, DeliveryTransport, HttpDeliveryTransport, ResultSender};
