//! Conversation history tracking
//!
//! Every prompt carries the last few question/answer turns verbatim plus a
//! rolling summary of older context. `ConversationHistory` owns both.

mod conversation;

pub use conversation::{ConversationHistory, SUMMARY_INSTRUCTION, Turn};
