//! ConversationHistory - bounded window of turns plus a rolling summary

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm::{self, LlmClient, LlmError};

/// Fixed instruction used when asking the model for a summary
pub const SUMMARY_INSTRUCTION: &str =
    "The following is a conversation about a planning document. Summarize it concisely:";

/// One question/answer exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Sliding window of the most recent turns with FIFO eviction
///
/// The window holds at most `max_history` turns; the bound is inclusive.
/// `summary` is only replaced by an explicit [`summarize`](Self::summarize)
/// call, never by [`add`](Self::add).
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: VecDeque<Turn>,
    max_history: usize,
    summary: String,
}

impl ConversationHistory {
    /// Create an empty history holding at most `max_history` turns
    pub fn new(max_history: usize) -> Self {
        debug!(%max_history, "ConversationHistory::new: called");
        Self {
            turns: VecDeque::with_capacity(max_history + 1),
            max_history,
            summary: String::new(),
        }
    }

    /// Rebuild a history from persisted turns and summary
    ///
    /// Turns are replayed through [`add`](Self::add), so a snapshot written
    /// with a larger bound is trimmed to the newest `max_history` turns.
    pub fn restore(max_history: usize, turns: Vec<Turn>, summary: String) -> Self {
        debug!(%max_history, turn_count = turns.len(), "ConversationHistory::restore: called");
        let mut history = Self::new(max_history);
        for turn in turns {
            history.push(turn);
        }
        history.summary = summary;
        history
    }

    /// Append a turn, evicting the oldest once the bound is exceeded
    pub fn add(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.push(Turn::new(question, answer));
    }

    fn push(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        if self.turns.len() > self.max_history {
            debug!(
                len = %self.turns.len(),
                max_history = %self.max_history,
                "ConversationHistory::push: evicting oldest turn"
            );
            self.turns.pop_front();
        }
    }

    /// Turns in chronological order
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Owned copy of the turns, for snapshots
    pub fn to_vec(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Deterministic rendering of the turns for embedding in prompts
    pub fn formatted(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("Question: {}\nAnswer: {}", t.question, t.answer))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Ask the model to summarize the current turns and store the result
    ///
    /// An empty history yields an empty summary without calling the model.
    /// On failure the previous summary is kept and the error is returned.
    pub async fn summarize(&mut self, llm: &dyn LlmClient, model: &str) -> Result<&str, LlmError> {
        debug!(turn_count = self.turns.len(), "ConversationHistory::summarize: called");
        if self.turns.is_empty() {
            self.summary.clear();
            return Ok(&self.summary);
        }

        let prompt = format!("{}\n\n{}\n\nSummary:", SUMMARY_INSTRUCTION, self.formatted());
        let summary = llm::query(llm, model, prompt).await?;
        self.summary = summary.trim().to_string();
        Ok(&self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use proptest::prelude::*;

    #[test]
    fn test_add_and_format_in_order() {
        let mut history = ConversationHistory::new(10);
        history.add("Q1", "A1");
        history.add("Q2", "A2");

        assert_eq!(history.len(), 2);
        assert_eq!(history.formatted(), "Question: Q1\nAnswer: A1\n\nQuestion: Q2\nAnswer: A2");
    }

    #[test]
    fn test_bound_is_inclusive() {
        let mut history = ConversationHistory::new(3);
        for i in 1..=3 {
            history.add(format!("Q{i}"), format!("A{i}"));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.turns().next().unwrap().question, "Q1");

        history.add("Q4", "A4");
        assert_eq!(history.len(), 3);
        assert_eq!(history.turns().next().unwrap().question, "Q2");
    }

    #[test]
    fn test_add_does_not_touch_summary() {
        let mut history = ConversationHistory::restore(5, vec![], "older context".to_string());
        history.add("Q", "A");
        assert_eq!(history.summary(), "older context");
    }

    #[test]
    fn test_restore_trims_to_bound() {
        let turns = (1..=6).map(|i| Turn::new(format!("Q{i}"), format!("A{i}"))).collect();
        let history = ConversationHistory::restore(4, turns, "sum".to_string());

        let questions: Vec<_> = history.turns().map(|t| t.question.as_str()).collect();
        assert_eq!(questions, vec!["Q3", "Q4", "Q5", "Q6"]);
        assert_eq!(history.summary(), "sum");
    }

    #[test]
    fn test_empty_formats_to_empty_string() {
        let history = ConversationHistory::new(10);
        assert!(history.formatted().is_empty());
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_summarize_replaces_summary() {
        let llm = MockLlmClient::with_texts(&["  They discussed login.  "]);
        let mut history = ConversationHistory::new(10);
        history.add("How does login work?", "With a session token.");

        let summary = history.summarize(&llm, "phi4").await.unwrap().to_string();

        assert_eq!(summary, "They discussed login.");
        assert_eq!(history.summary(), "They discussed login.");
        let prompt = &llm.prompts()[0];
        assert!(prompt.starts_with(SUMMARY_INSTRUCTION));
        assert!(prompt.contains("Question: How does login work?"));
    }

    #[tokio::test]
    async fn test_summarize_empty_history_skips_model() {
        let llm = MockLlmClient::with_texts(&["unused"]);
        let mut history = ConversationHistory::restore(10, vec![], "stale".to_string());

        let summary = history.summarize(&llm, "phi4").await.unwrap().to_string();

        assert!(summary.is_empty());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_summarize_failure_keeps_previous_summary() {
        let llm = MockLlmClient::new(vec![Err(LlmError::InvalidResponse("down".to_string()))]);
        let mut history = ConversationHistory::restore(10, vec![Turn::new("Q", "A")], "previous".to_string());

        assert!(history.summarize(&llm, "phi4").await.is_err());
        assert_eq!(history.summary(), "previous");
    }

    proptest! {
        #[test]
        fn prop_keeps_most_recent_turns(max in 1usize..20, extra in 1usize..30) {
            let total = max + extra;
            let mut history = ConversationHistory::new(max);
            for i in 0..total {
                history.add(format!("Q{i}"), format!("A{i}"));
            }

            prop_assert_eq!(history.len(), max);
            let expected: Vec<String> = (total - max..total).map(|i| format!("Q{i}")).collect();
            let actual: Vec<String> = history.turns().map(|t| t.question.clone()).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
