#![forbid(unsafe_code)]

pub mod config;
pub mod content;
pub mod error;
pub mod queue;
pub mod study_service;

pub use vocab_core::Clock;

pub use config::EngineConfig;
pub use content::{ContentProvider, JsonContentProvider, StaticContentProvider};
pub use error::{BootstrapError, ContentError, EngineError};
pub use queue::{QueueProgress, SessionQueue};
pub use study_service::{DueWord, QueueAnswer, StudyService};
