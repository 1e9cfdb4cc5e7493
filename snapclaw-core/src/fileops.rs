//! Workspace-confined filesystem primitives.
//!
//! Every operation resolves its path through the [`Confiner`] before touching
//! the filesystem, and every failure comes back as an error value whose
//! message is fit to show the model.

use anyhow::{Context, Result, anyhow, bail};
use std::path::PathBuf;

use crate::confiner::Confiner;
use crate::truncation;

/// One directory entry as reported to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: String,
    pub size_bytes: u64,
    pub is_dir: bool,
}

/// List a directory inside the workspace.
///
/// An empty `relative_dir` means the workspace root itself. Entry order is
/// whatever the underlying directory enumeration yields.
pub fn list_directory(confiner: &Confiner, relative_dir: &str) -> Result<Vec<EntryInfo>> {
    let resolved: PathBuf = if relative_dir.is_empty() {
        confiner.workspace_root().to_path_buf()
    } else {
        confiner.resolve(relative_dir).map_err(|e| {
            anyhow!(
                "Cannot list \"{}\" as it is outside the permitted working directory",
                e.path()
            )
        })?
    };

    if !resolved.exists() {
        bail!("Directory not found: \"{}\"", relative_dir);
    }
    if !resolved.is_dir() {
        bail!("\"{}\" is not a directory", relative_dir);
    }

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(&resolved)
        .with_context(|| format!("Failed to list directory: {}", resolved.display()))?
    {
        let entry = entry?;
        let metadata = entry
            .metadata()
            .with_context(|| format!("Failed to stat {}", entry.path().display()))?;
        entries.push(EntryInfo {
            name: entry.file_name().to_string_lossy().into_owned(),
            size_bytes: metadata.len(),
            is_dir: metadata.is_dir(),
        });
    }

    Ok(entries)
}

/// Read a file inside the workspace, truncated to the fixed character cap.
///
/// Content longer than the cap comes back cut at the cap with an
/// informational marker appended; repeated reads yield identical output.
pub fn read_file(confiner: &Confiner, relative_path: &str) -> Result<String> {
    let resolved = confiner.resolve(relative_path).map_err(|e| {
        anyhow!(
            "Cannot read \"{}\" as it is outside the permitted working directory",
            e.path()
        )
    })?;

    if !resolved.exists() {
        bail!("File not found: \"{}\"", relative_path);
    }
    if resolved.is_dir() {
        bail!("\"{}\" is a directory, not a regular file", relative_path);
    }

    let content = std::fs::read_to_string(&resolved)
        .with_context(|| format!("Failed to read file: \"{}\"", relative_path))?;

    let truncated = truncation::truncate_file_content(&content, relative_path);
    if truncated.len() != content.len() {
        log::debug!(
            "Truncated \"{}\" from {} chars for the model",
            relative_path,
            content.chars().count()
        );
    }
    Ok(truncated)
}

/// Write (or overwrite) a file inside the workspace.
///
/// Missing parent directories are created. Returns a confirmation string
/// reporting the path and the number of characters written.
pub fn write_file(confiner: &Confiner, relative_path: &str, content: &str) -> Result<String> {
    let resolved = confiner.resolve(relative_path).map_err(|e| {
        anyhow!(
            "Cannot write to \"{}\" as it is outside the permitted working directory",
            e.path()
        )
    })?;

    if let Some(parent) = resolved.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(&resolved, content)
        .with_context(|| format!("Failed to write file: \"{}\"", relative_path))?;

    Ok(format!(
        "Successfully wrote to \"{}\" ({} characters written)",
        relative_path,
        content.chars().count()
    ))
}
