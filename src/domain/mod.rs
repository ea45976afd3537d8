//! Domain types for the project model
//!
//! Project → Component → Feature → CodeSnippet, all serde-serializable so
//! the whole tree can be written as one JSON document.

mod level;
mod project;
mod snippet;

pub use level::{Complexity, FeatureStatus, Priority};
pub use project::{ArchitectureDiagram, Component, Feature, MAIN_COMPONENT, Project};
pub use snippet::{CodeSnippet, extension_for};
