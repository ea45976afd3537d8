//! Pattern-based extraction from free-text model output

use regex::Regex;
use tracing::debug;

use super::{Interpretation, ResponseInterpreter};
use crate::domain::CodeSnippet;

/// Best-effort extractor driven by labeled lines and fenced code blocks
///
/// Recognized labels (case-insensitive): `Module:` / `모듈:` and
/// `Feature description:` / `기능 설명:`. Code is taken from every
/// ```` ```lang ```` fenced block. Architecture sections start at a
/// `# Architecture Diagram` / `# 아키텍처 다이어그램` heading and run to the
/// next heading.
pub struct PatternInterpreter {
    module: Regex,
    description: Regex,
    fence: Regex,
    diagram: Regex,
}

impl PatternInterpreter {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            module: Regex::new(r"(?im)\b(?:module|모듈)[ \t]*:[ \t]*(.+)$")?,
            description: Regex::new(r"(?im)\b(?:feature[ \t]+description|기능[ \t]*설명)[ \t]*:[ \t]*(.+)$")?,
            fence: Regex::new(r"```([A-Za-z0-9_+#.-]*)[ \t]*\r?\n([\s\S]*?)```")?,
            diagram: Regex::new(r"(?im)^#+[ \t]*(?:architecture[ \t]+diagram|아키텍처[ \t]*다이어그램)[ \t]*\r?\n")?,
        })
    }

    /// First labeled module name, trimmed of whitespace and markdown emphasis
    pub fn module_name(&self, text: &str) -> Option<String> {
        first_label(&self.module, text)
    }

    /// First labeled feature description
    pub fn feature_description(&self, text: &str) -> Option<String> {
        first_label(&self.description, text)
    }

    /// Every fenced block in document order
    pub fn code_snippets(&self, text: &str) -> Vec<CodeSnippet> {
        self.fence
            .captures_iter(text)
            .map(|caps| {
                let language = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
                let language = if language.is_empty() { "text" } else { language };
                let code = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
                CodeSnippet::new(language, code)
            })
            .collect()
    }

    /// Bodies of architecture diagram sections
    pub fn diagrams(&self, text: &str) -> Vec<String> {
        self.diagram
            .find_iter(text)
            .filter_map(|heading| {
                let rest = &text[heading.end()..];
                let end = next_heading(rest).unwrap_or(rest.len());
                let body = rest[..end].trim();
                (!body.is_empty()).then(|| body.to_string())
            })
            .collect()
    }
}

impl ResponseInterpreter for PatternInterpreter {
    fn interpret(&self, text: &str) -> Interpretation {
        let interpretation = Interpretation {
            module: self.module_name(text),
            description: self.feature_description(text),
            snippets: self.code_snippets(text),
            diagrams: self.diagrams(text),
        };
        debug!(
            module = ?interpretation.module,
            snippet_count = interpretation.snippets.len(),
            diagram_count = interpretation.diagrams.len(),
            "PatternInterpreter::interpret: done"
        );
        interpretation
    }
}

fn first_label(re: &Regex, text: &str) -> Option<String> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| clean_label(m.as_str()))
        .find(|value| !value.is_empty())
}

fn clean_label(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '*' || c == '_' || c == '`')
        .to_string()
}

/// Byte offset of the next line starting with `#`, outside code fences
fn next_heading(text: &str) -> Option<usize> {
    let mut offset = 0;
    let mut in_fence = false;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
        } else if !in_fence && trimmed.starts_with('#') {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpreter() -> PatternInterpreter {
        PatternInterpreter::new().unwrap()
    }

    #[test]
    fn test_single_python_block() {
        let snippets = interpreter().code_snippets("```python\nprint(1)\n```");

        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].language, "python");
        assert_eq!(snippets[0].code, "print(1)");
    }

    #[test]
    fn test_blocks_in_document_order_and_blank_language() {
        let text = "Intro\n```\nplain\n```\nthen\n```rust\nfn main() {}\n```\nand\n```js\nlet a = 1;\n```";
        let snippets = interpreter().code_snippets(text);

        let langs: Vec<_> = snippets.iter().map(|s| s.language.as_str()).collect();
        assert_eq!(langs, vec!["text", "rust", "js"]);
        assert_eq!(snippets[0].code, "plain");
        assert_eq!(snippets[1].code, "fn main() {}");
    }

    #[test]
    fn test_code_body_kept_verbatim_inside() {
        let text = "```python\n\ndef f():\n    return 1\n\n```";
        let snippets = interpreter().code_snippets(text);
        assert_eq!(snippets[0].code, "def f():\n    return 1");
    }

    #[test]
    fn test_reparse_is_stable() {
        let interp = interpreter();
        let first = interp.code_snippets("```python\nprint(1)\n```");
        let rendered = format!("```{}\n{}\n```", first[0].language, first[0].code);
        assert_eq!(interp.code_snippets(&rendered), first);
    }

    #[test]
    fn test_no_blocks() {
        assert!(interpreter().code_snippets("just prose").is_empty());
    }

    #[test]
    fn test_module_name_korean_label() {
        let text = "설명입니다.\n모듈: Auth\n기타";
        assert_eq!(interpreter().module_name(text).as_deref(), Some("Auth"));
    }

    #[test]
    fn test_module_name_english_label_with_emphasis() {
        let interp = interpreter();
        assert_eq!(interp.module_name("**Module:** Billing  ").as_deref(), Some("Billing"));
        assert_eq!(interp.module_name("module: payments").as_deref(), Some("payments"));
    }

    #[test]
    fn test_module_name_first_match_wins() {
        let text = "Module: First\nModule: Second";
        assert_eq!(interpreter().module_name(text).as_deref(), Some("First"));
    }

    #[test]
    fn test_module_name_absent() {
        let interp = interpreter();
        assert_eq!(interp.module_name("No label here"), None);
        assert_eq!(interp.module_name("Module:\n"), None);
        assert_eq!(interp.module_name("submodule: x"), None);
    }

    #[test]
    fn test_feature_description() {
        let interp = interpreter();
        let text = "Module: Auth\nFeature description: Password login with lockout\n";
        assert_eq!(
            interp.feature_description(text).as_deref(),
            Some("Password login with lockout")
        );
        assert_eq!(
            interp.feature_description("기능 설명: 로그인").as_deref(),
            Some("로그인")
        );
        assert_eq!(interp.feature_description("nothing"), None);
    }

    #[test]
    fn test_diagram_sections() {
        let text = "# Overview\nx\n# Architecture Diagram\nClient -> API\nAPI -> DB\n\n# Next\nmore";
        let diagrams = interpreter().diagrams(text);
        assert_eq!(diagrams, vec!["Client -> API\nAPI -> DB".to_string()]);
    }

    #[test]
    fn test_diagram_section_runs_to_end() {
        let text = "# 아키텍처 다이어그램\n웹 -> 서버";
        assert_eq!(interpreter().diagrams(text), vec!["웹 -> 서버".to_string()]);
    }

    #[test]
    fn test_interpret_collects_everything() {
        let text = "Module: Auth\nFeature description: Login\n```python\nprint(1)\n```";
        let result = interpreter().interpret(text);

        assert_eq!(result.module.as_deref(), Some("Auth"));
        assert_eq!(result.description.as_deref(), Some("Login"));
        assert_eq!(result.snippets.len(), 1);
        assert!(result.diagrams.is_empty());
    }
}
