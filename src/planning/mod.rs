//! Planning document input
//!
//! The planning text is read once at startup and stays fixed for the run.

mod loader;

pub use loader::{PLANNING_EXTENSIONS, load_planning_docs};
