//! Run-state snapshot and transcript entries

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::history::{ConversationHistory, Turn};

/// Everything needed to continue an interrupted run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// Identity of the run that wrote this snapshot
    #[serde(default)]
    pub run_id: String,

    /// Next iteration to run (1-based)
    pub iteration: u32,

    /// Question to ask on that iteration
    pub pending_question: String,

    /// Module the conversation was last about
    #[serde(default)]
    pub current_module: Option<String>,

    /// Retained turns, oldest first
    #[serde(default)]
    pub history: Vec<Turn>,

    /// Rolling summary of older turns
    #[serde(default)]
    pub summary: String,

    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,
}

impl RunState {
    /// Initial state of a fresh run
    pub fn fresh(initial_question: impl Into<String>) -> Self {
        let run_id = Uuid::now_v7().to_string();
        debug!(%run_id, "RunState::fresh: called");
        Self {
            run_id,
            iteration: 1,
            pending_question: initial_question.into(),
            current_module: None,
            history: Vec::new(),
            summary: String::new(),
            timestamp: Utc::now(),
        }
    }

    /// Capture the driver's state; `iteration` is the next one to run
    pub fn capture(
        run_id: &str,
        iteration: u32,
        pending_question: &str,
        current_module: Option<&str>,
        history: &ConversationHistory,
    ) -> Self {
        debug!(%run_id, %iteration, "RunState::capture: called");
        Self {
            run_id: run_id.to_string(),
            iteration,
            pending_question: pending_question.to_string(),
            current_module: current_module.map(str::to_string),
            history: history.to_vec(),
            summary: history.summary().to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// One block of the human-readable transcript
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub run_id: String,
    pub iteration: u32,
    pub question: String,
    pub response: String,
    pub timestamp: DateTime<Local>,
}

impl TranscriptEntry {
    pub fn new(run_id: &str, iteration: u32, question: &str, response: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            iteration,
            question: question.to_string(),
            response: response.to_string(),
            timestamp: Local::now(),
        }
    }

    /// Render as an appendable text block
    pub fn render(&self) -> String {
        format!(
            "=== Iteration {} | {} | run {} ===\nQuestion: {}\n\nResponse:\n{}\n\n",
            self.iteration,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.run_id,
            self.question,
            self.response.trim_end()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state() {
        let state = RunState::fresh("Q1");
        assert_eq!(state.iteration, 1);
        assert_eq!(state.pending_question, "Q1");
        assert!(state.history.is_empty());
        assert!(Uuid::parse_str(&state.run_id).is_ok());
        assert_ne!(state.run_id, RunState::fresh("Q1").run_id);
    }

    #[test]
    fn test_capture_copies_history() {
        let mut history = ConversationHistory::new(2);
        history.add("q1", "a1");
        history.add("q2", "a2");
        history.add("q3", "a3");

        let state = RunState::capture("run", 4, "q4", Some("Auth"), &history);

        assert_eq!(state.iteration, 4);
        assert_eq!(state.current_module.as_deref(), Some("Auth"));
        assert_eq!(state.history, vec![Turn::new("q2", "a2"), Turn::new("q3", "a3")]);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let state = RunState::capture("run", 7, "Q7", None, &ConversationHistory::new(3));
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["iteration"], 7);
        assert_eq!(json["pending_question"], "Q7");
        assert!(json["current_module"].is_null());

        let back: RunState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_snapshot_without_optional_fields() {
        let json = r#"{"iteration": 3, "pending_question": "Q3", "timestamp": "2024-01-01T00:00:00Z"}"#;
        let state: RunState = serde_json::from_str(json).unwrap();
        assert_eq!(state.iteration, 3);
        assert!(state.run_id.is_empty());
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_transcript_render() {
        let entry = TranscriptEntry::new("run-1", 2, "What next?", "Build auth.\n");
        let text = entry.render();

        assert!(text.starts_with("=== Iteration 2 |"));
        assert!(text.contains("run run-1"));
        assert!(text.contains("Question: What next?\n\nResponse:\nBuild auth.\n\n"));
    }
}
