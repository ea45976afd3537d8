//! Fold an Interpretation into the project model

use chrono::{DateTime, Local};
use tracing::{debug, info};

use super::Interpretation;
use crate::domain::{ArchitectureDiagram, CodeSnippet, Feature, MAIN_COMPONENT, Project};

/// Switches for optional reconciliation effects
#[derive(Debug, Clone, Copy)]
pub struct ReconcileOptions {
    /// Turn code blocks into features
    pub extract_snippets: bool,
    /// Give each new snippet a file name from the timestamp and its sequence number
    pub assign_filenames: bool,
    /// Append diagram sections to the project
    pub extract_diagrams: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            extract_snippets: true,
            assign_filenames: true,
            extract_diagrams: true,
        }
    }
}

/// What a reconciliation pass changed
#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    /// Module in effect after this response (new label, else the previous one)
    pub module: Option<String>,
    /// Copies of the snippets added in this pass, filenames included
    pub new_snippets: Vec<CodeSnippet>,
    pub features_added: usize,
    pub diagrams_added: usize,
}

/// Apply one interpreted response to the project
///
/// Every snippet becomes a new single-snippet Feature appended to the
/// component named by the effective module (created on first sight), or to
/// the "Main Component" when no module was ever named. Features are never
/// merged. `updated_at` is refreshed exactly once per call.
pub fn reconcile(
    project: &mut Project,
    interpretation: Interpretation,
    current_module: Option<&str>,
    options: ReconcileOptions,
    now: DateTime<Local>,
) -> Reconciled {
    let module = interpretation
        .module
        .clone()
        .or_else(|| current_module.map(str::to_string))
        .filter(|m| !m.trim().is_empty());
    debug!(?module, snippet_count = interpretation.snippets.len(), "reconcile: called");

    let mut result = Reconciled {
        module: module.clone(),
        ..Default::default()
    };

    if options.extract_snippets {
        for mut snippet in interpretation.snippets {
            if options.assign_filenames {
                // Project-wide sequence keeps names unique within one millisecond
                let seq = project.snippet_count();
                snippet.ensure_filename(now, seq);
            }

            let component = match &module {
                Some(name) => project.component_or_insert(name, format!("Component for module '{}'", name.trim())),
                None => project.component_or_insert(
                    MAIN_COMPONENT,
                    "Main component generated from the planning documents",
                ),
            };

            let seq = component.features.len() + 1;
            let feature_name = match &module {
                Some(_) => format!("{} Feature {}", component.name, seq),
                None => format!("Feature_{}", seq),
            };
            let description = interpretation
                .description
                .clone()
                .unwrap_or_else(|| format!("Auto-generated feature {}", now.format("%Y-%m-%d %H:%M:%S")));

            debug!(component = %component.name, feature = %feature_name, "reconcile: appending feature");
            result.new_snippets.push(snippet.clone());
            component
                .features
                .push(Feature::new(feature_name, description).with_snippet(snippet));
            result.features_added += 1;
        }
    }

    if options.extract_diagrams {
        for body in interpretation.diagrams {
            project.diagrams.push(ArchitectureDiagram::architecture(body));
            result.diagrams_added += 1;
        }
    }

    project.touch();

    if result.features_added > 0 {
        info!(
            features_added = result.features_added,
            module = module.as_deref().unwrap_or(MAIN_COMPONENT),
            "Project updated"
        );
    }
    result
}
