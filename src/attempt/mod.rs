//! Exam attempt lifecycle: storage, session rules, scoring and the controller
//! that ties them together.

pub mod error;
pub mod lifecycle;
pub mod scoring;
pub mod session;
pub mod store;

pub use error::AttemptError;
pub use lifecycle::AttemptLifecycle;
pub use scoring::{Score, score};
pub use session::SessionValidator;
pub use store::AttemptStore;
