//! quizmill-core — Timed quiz engine: attempt state, countdown, navigation,
//! scoring, and review presentation.
//!
//! The engine owns one attempt at a time and talks to the outside world only
//! through the [`traits::AttemptService`] boundary.

pub mod attempt;
pub mod error;
pub mod model;
pub mod navigation;
pub mod report;
pub mod scoring;
pub mod session;
pub mod timer;
pub mod traits;
