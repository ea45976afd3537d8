//! CodeSnippet domain type

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A fenced code block captured verbatim from a model response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSnippet {
    /// Language tag from the fence (free text)
    #[serde(default)]
    pub language: String,

    /// Code body
    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub description: Option<String>,

    /// File name under the snippet directory; stable once assigned
    #[serde(default)]
    pub filename: Option<String>,
}

impl CodeSnippet {
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            code: code.into(),
            description: None,
            filename: None,
        }
    }

    /// File extension for this snippet's language (`txt` when unknown)
    pub fn extension(&self) -> &'static str {
        extension_for(&self.language)
    }

    /// Assign a timestamp-derived file name unless one is already set
    ///
    /// `index` is a sequence number chosen by the caller, so several snippets
    /// created in the same millisecond still get distinct names.
    /// Returns the (possibly pre-existing) file name.
    pub fn ensure_filename(&mut self, created: DateTime<Local>, index: usize) -> &str {
        if self.filename.is_none() {
            let name = format!(
                "snippet_{}_{}.{}",
                created.format("%Y%m%d_%H%M%S_%3f"),
                index,
                self.extension()
            );
            debug!(%name, "CodeSnippet::ensure_filename: assigned");
            self.filename = Some(name);
        }
        self.filename.as_deref().unwrap_or_default()
    }
}

/// Map a fence language tag to a file extension
pub fn extension_for(language: &str) -> &'static str {
    match language.trim().to_lowercase().as_str() {
        "python" | "py" => "py",
        "javascript" | "js" => "js",
        "typescript" | "ts" => "ts",
        "java" => "java",
        "cpp" | "c++" => "cpp",
        "c" => "c",
        "csharp" | "c#" | "cs" => "cs",
        "go" => "go",
        "rust" | "rs" => "rs",
        "ruby" | "rb" => "rb",
        "php" => "php",
        "swift" => "swift",
        "kotlin" | "kt" => "kt",
        _ => "txt",
    }
}
