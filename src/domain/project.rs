//! Project aggregate: components, features and their snippets
//!
//! The Project is the durable artifact of a run. It owns its components
//! exclusively; components own their features; features own their snippets.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::debug;

use super::{CodeSnippet, Complexity, FeatureStatus, Priority};

/// Name of the fallback component used when no module was ever named
pub const MAIN_COMPONENT: &str = "Main Component";

/// A unit of functionality, currently always holding one snippet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub complexity: Complexity,

    #[serde(default)]
    pub status: FeatureStatus,

    #[serde(default)]
    pub code_snippets: Vec<CodeSnippet>,

    /// Free-text names of other features; not checked for existence
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl Feature {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            priority: Priority::default(),
            complexity: Complexity::default(),
            status: FeatureStatus::default(),
            code_snippets: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Builder: attach a snippet
    pub fn with_snippet(mut self, snippet: CodeSnippet) -> Self {
        self.code_snippets.push(snippet);
        self
    }
}

/// A named module of the project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub features: Vec<Feature>,
}

impl Component {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            features: Vec::new(),
        }
    }

    /// Case-insensitive name comparison
    pub fn is_named(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }

    pub fn snippet_count(&self) -> usize {
        self.features.iter().map(|f| f.code_snippets.len()).sum()
    }
}

/// A described architecture section captured from a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureDiagram {
    #[serde(default)]
    pub description: String,

    #[serde(default = "default_diagram_kind", rename = "type")]
    pub kind: String,
}

fn default_diagram_kind() -> String {
    "architecture".to_string()
}

impl ArchitectureDiagram {
    pub fn architecture(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            kind: default_diagram_kind(),
        }
    }
}

/// Root aggregate persisted as the project document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub components: Vec<Component>,

    #[serde(default)]
    pub diagrams: Vec<ArchitectureDiagram>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: description.into(),
            components: Vec::new(),
            diagrams: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Fresh, empty project named after its creation time
    pub fn generated() -> Self {
        let name = format!("generated_project_{}", Local::now().format("%Y%m%d_%H%M%S"));
        debug!(%name, "Project::generated: called");
        Self::new(name, "Project generated automatically from the planning documents")
    }

    /// Refresh the last-update timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Find a component by case-insensitive name
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.is_named(name))
    }

    /// Find a component by case-insensitive name, appending it if missing
    pub fn component_or_insert(&mut self, name: &str, description: impl Into<String>) -> &mut Component {
        let idx = match self.components.iter().position(|c| c.is_named(name)) {
            Some(idx) => idx,
            None => {
                debug!(%name, "Project::component_or_insert: creating component");
                self.components.push(Component::new(name.trim(), description));
                self.components.len() - 1
            }
        };
        &mut self.components[idx]
    }

    pub fn feature_count(&self) -> usize {
        self.components.iter().map(|c| c.features.len()).sum()
    }

    pub fn snippet_count(&self) -> usize {
        self.components.iter().map(Component::snippet_count).sum()
    }

    /// Render a human-readable Markdown report of the project
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}\n", self.name);
        let _ = writeln!(out, "{}\n", self.description);
        let _ = writeln!(
            out,
            "- Created: {}\n- Updated: {}\n- Components: {}\n- Features: {}\n",
            self.created_at.to_rfc3339(),
            self.updated_at.to_rfc3339(),
            self.components.len(),
            self.feature_count()
        );

        for component in &self.components {
            let _ = writeln!(out, "## {}\n", component.name);
            if !component.description.is_empty() {
                let _ = writeln!(out, "{}\n", component.description);
            }
            for feature in &component.features {
                let _ = writeln!(out, "### {}\n", feature.name);
                let _ = writeln!(
                    out,
                    "{}\n\n_priority: {}, complexity: {}, status: {}_\n",
                    feature.description, feature.priority, feature.complexity, feature.status
                );
                if !feature.dependencies.is_empty() {
                    let _ = writeln!(out, "Depends on: {}\n", feature.dependencies.join(", "));
                }
                for snippet in &feature.code_snippets {
                    if let Some(filename) = &snippet.filename {
                        let _ = writeln!(out, "`{}`\n", filename);
                    }
                    let _ = writeln!(out, "```{}\n{}\n```\n", snippet.language, snippet.code);
                }
            }
        }

        if !self.diagrams.is_empty() {
            let _ = writeln!(out, "## Architecture\n");
            for diagram in &self.diagrams {
                let _ = writeln!(out, "{}\n", diagram.description);
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project() -> Project {
        let mut project = Project::new("Shop", "Online shop");
        for (module, lang, code) in [("Auth", "python", "def login(): pass"), ("Cart", "rust", "fn add() {}")] {
            let mut snippet = CodeSnippet::new(lang, code);
            snippet.filename = Some(format!("snippet_{}.txt", module.to_lowercase()));
            project
                .component_or_insert(module, format!("{} module", module))
                .features
                .push(Feature::new(format!("{} Feature 1", module), "first").with_snippet(snippet));
        }
        project
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let project = sample_project();

        let json = serde_json::to_string_pretty(&project).unwrap();
        let restored: Project = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, project);
        assert_eq!(restored.components.len(), 2);
        assert_eq!(restored.components[1].features[0].code_snippets[0].code, "fn add() {}");
        assert_eq!(
            restored.components[0].features[0].code_snippets[0].filename.as_deref(),
            Some("snippet_auth.txt")
        );
    }

    #[test]
    fn test_component_lookup_is_case_insensitive() {
        let mut project = sample_project();

        assert!(project.component("auth").is_some());
        assert!(project.component(" CART ").is_some());

        project.component_or_insert("AUTH", "ignored");
        assert_eq!(project.components.len(), 2);
        assert_eq!(project.component("auth").unwrap().description, "Auth module");
    }

    #[test]
    fn test_counts() {
        let project = sample_project();
        assert_eq!(project.feature_count(), 2);
        assert_eq!(project.snippet_count(), 2);
    }

    #[test]
    fn test_deserialize_sparse_document() {
        let json = r#"{"name":"Old","components":[{"name":"Main Component","features":[{"name":"Feature_1"}]}]}"#;
        let project: Project = serde_json::from_str(json).unwrap();

        let feature = &project.components[0].features[0];
        assert_eq!(feature.priority, Priority::Medium);
        assert_eq!(feature.status, FeatureStatus::Proposed);
        assert!(project.diagrams.is_empty());
    }

    #[test]
    fn test_generated_name_has_timestamp() {
        let project = Project::generated();
        assert!(project.name.starts_with("generated_project_"));
        assert!(project.components.is_empty());
    }

    #[test]
    fn test_markdown_report_lists_features() {
        let mut project = sample_project();
        project
            .diagrams
            .push(ArchitectureDiagram::architecture("Client -> API -> DB"));

        let md = project.to_markdown();

        assert!(md.starts_with("# Shop"));
        assert!(md.contains("## Auth"));
        assert!(md.contains("### Cart Feature 1"));
        assert!(md.contains("```python\ndef login(): pass\n```"));
        assert!(md.contains("Client -> API -> DB"));
    }
}
