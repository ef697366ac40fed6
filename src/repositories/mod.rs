pub mod memory;
pub mod quiz_attempt_repository;
pub mod quiz_repository;

pub use memory::{InMemoryQuizAttemptRepository, InMemoryQuizRepository};
pub use quiz_attempt_repository::{MongoQuizAttemptRepository, QuizAttemptRepository};
pub use quiz_repository::{MongoQuizRepository, QuizRepository};

#[cfg(test)]
pub use quiz_repository::MockQuizRepository;
