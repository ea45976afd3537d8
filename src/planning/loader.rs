//! Planning document loader

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use tracing::{debug, info, warn};

/// File extensions read as planning documents
pub const PLANNING_EXTENSIONS: &[&str] = &["txt", "md", "docx"];

fn is_planning_doc(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| PLANNING_EXTENSIONS.iter().any(|p| p.eq_ignore_ascii_case(ext)))
}

/// Concatenate every planning document in `dir`
///
/// Files are visited in file-name order and each is prefixed with a
/// `# <file name>` header. Rich formats get no real parsing: a `.docx` that
/// is not valid UTF-8 is skipped like any other unreadable file. Having no
/// readable document at all is an error.
pub fn load_planning_docs(dir: &Path) -> Result<String> {
    debug!(dir = %dir.display(), "load_planning_docs: called");

    let entries = fs::read_dir(dir).context(format!("Failed to read planning directory {}", dir.display()))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_planning_doc(path))
        .collect();
    files.sort();

    let mut combined = String::new();
    let mut loaded = 0usize;
    for path in &files {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        match fs::read_to_string(path) {
            Ok(content) => {
                debug!(file = %name, bytes = content.len(), "load_planning_docs: read file");
                combined.push_str(&format!("# {}\n{}\n\n", name, content.trim_end()));
                loaded += 1;
            }
            Err(e) => {
                warn!("Skipping unreadable planning document {}: {}", path.display(), e);
            }
        }
    }

    if loaded == 0 {
        return Err(eyre::eyre!(
            "No planning documents found in {} (expected .txt, .md or .docx files)",
            dir.display()
        ));
    }

    info!(files = loaded, bytes = combined.len(), "Loaded planning documents");
    Ok(combined)
}
