//! Chat service access.
//!
//! The client talks to the locally running chat API; the collector uses it
//! to answer whole question files, polling under a bounded retry policy.

pub mod client;
pub mod collector;
pub mod retry;

pub use client::ChatClient;
pub use collector::AnswerCollector;
pub use retry::RetryPolicy;
