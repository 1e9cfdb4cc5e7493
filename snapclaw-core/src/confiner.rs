use anyhow::{Context, Result, bail};
use std::path::{Component, Path, PathBuf};

/// A path escaped the workspace boundary.
///
/// Carries the original, pre-resolution path so callers can build an error
/// message in terms of what the model actually asked for.
#[derive(Debug, Clone, thiserror::Error)]
#[error("path \"{path}\" is outside the permitted working directory")]
pub struct ConfineError {
    path: String,
}

impl ConfineError {
    /// The path as originally supplied, before any resolution.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Workspace path confiner.
///
/// Enforces that ALL file operations are restricted to the workspace
/// directory. Paths are joined onto the workspace root, lexically normalized
/// (so `../` segments are collapsed before the check), and accepted only if
/// the result still lies under the canonical root.
///
/// This is a prefix check on normalized paths, not a symlink-aware
/// containment check. The workspace is a guard rail for a cooperating model,
/// not a security boundary against hostile file content.
#[derive(Debug, Clone)]
pub struct Confiner {
    /// Canonical path to the workspace root
    workspace_root: PathBuf,
}

impl Confiner {
    /// Create a new Confiner for the given workspace directory.
    ///
    /// The workspace path must exist and will be canonicalized.
    pub fn new(workspace_path: &Path) -> Result<Self> {
        let workspace_root = std::fs::canonicalize(workspace_path).with_context(|| {
            format!(
                "Failed to canonicalize workspace path: {}",
                workspace_path.display()
            )
        })?;

        if !workspace_root.is_dir() {
            bail!(
                "Workspace path is not a directory: {}",
                workspace_root.display()
            );
        }

        Ok(Self { workspace_root })
    }

    /// The canonical workspace root all operations are confined to.
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Resolve a model-supplied path against the workspace root.
    ///
    /// Relative paths are joined onto the root; absolute paths are taken as
    /// given. Either way the normalized result must remain inside the root,
    /// otherwise a [`ConfineError`] carrying the original path is returned.
    /// Resolution never touches the filesystem, so nonexistent targets (e.g.
    /// a file about to be created) resolve fine.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, ConfineError> {
        let requested = Path::new(raw);
        let joined = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            self.workspace_root.join(requested)
        };

        let normalized = normalize(&joined);
        if normalized.starts_with(&self.workspace_root) {
            Ok(normalized)
        } else {
            Err(ConfineError {
                path: raw.to_string(),
            })
        }
    }
}

/// Collapse `.` and `..` components without consulting the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
