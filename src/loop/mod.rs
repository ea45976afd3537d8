//! Iteration driver
//!
//! STARTING → ITERATING ⇄ CHECKPOINTING → STOPPING → DONE. One question per
//! iteration: prompt, query, interpret, persist, derive the next question.
//! Every path out of ITERATING runs finalization, which writes the project.

mod engine;

pub use engine::{DriverStatus, LoopDriver, RunSummary, StopReason};
