pub mod access_gate_service;
pub mod publish_scheduler;
pub mod quiz_attempt_service;
pub mod scoring;

pub use access_gate_service::AccessGateService;
pub use publish_scheduler::{PublishScheduler, TickReport};
pub use quiz_attempt_service::QuizAttemptService;
