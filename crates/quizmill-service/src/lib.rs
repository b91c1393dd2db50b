//! quizmill-service — attempt service backends.
//!
//! Implements the `AttemptService` trait over HTTP for a remote quiz
//! backend, plus an in-memory system of record for tests and
//! single-process hosts.

pub mod config;
pub mod http;
pub mod memory;

pub use config::{load_config, load_config_from, ServiceConfig};
pub use http::HttpAttemptService;
pub use memory::MemoryAttemptService;
