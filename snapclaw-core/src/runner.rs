//! Confined script execution.
//!
//! Scripts are resolved through the [`Confiner`], executed directly as a
//! subprocess with the workspace as their working directory, and bounded by a
//! timeout. A non-zero exit code is data for the model, not a failure of the
//! runner; only confinement violations, missing files, launch failures, and
//! timeouts are errors.

use anyhow::{Context, Result, anyhow, bail};
use std::process::Stdio;
use std::time::Duration;

use crate::confiner::Confiner;

/// Captured result of one completed script run.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

/// Run a script inside the workspace with the given arguments.
///
/// On timeout the child is killed and no partial output is returned.
pub async fn run_script(
    confiner: &Confiner,
    relative_path: &str,
    args: &[String],
    timeout: Duration,
) -> Result<CapturedOutput> {
    let script = confiner.resolve(relative_path).map_err(|e| {
        anyhow!(
            "Cannot execute \"{}\" as it is outside the permitted working directory",
            e.path()
        )
    })?;

    if !script.is_file() {
        bail!("File \"{}\" not found.", relative_path);
    }

    log::info!(
        "Running script \"{}\" with {} arg(s), timeout {}s",
        relative_path,
        args.len(),
        timeout.as_secs()
    );

    let output = tokio::time::timeout(
        timeout,
        tokio::process::Command::new(&script)
            .args(args)
            .current_dir(confiner.workspace_root())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| {
        anyhow!(
            "Script \"{}\" timed out after {} seconds",
            relative_path,
            timeout.as_secs()
        )
    })?
    .with_context(|| format!("Failed to launch \"{}\"", relative_path))?;

    Ok(CapturedOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, Confiner) {
        let tmp = tempdir().unwrap();
        let confiner = Confiner::new(tmp.path()).unwrap();
        (tmp, confiner)
    }

    #[cfg(unix)]
    fn write_script(confiner: &Confiner, name: &str, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        let path = confiner.workspace_root().join(name);
        std::fs::write(&path, body).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_stdout_and_args() {
        let (_tmp, confiner) = setup();
        write_script(&confiner, "hello.sh", "#!/bin/sh\necho hello \"$1\"\n");

        let out = run_script(
            &confiner,
            "hello.sh",
            &["world".to_string()],
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(out.exit_code, Some(0));
        assert_eq!(out.stdout.trim(), "hello world");
        assert!(out.stderr.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_not_an_error() {
        let (_tmp, confiner) = setup();
        write_script(&confiner, "fail.sh", "#!/bin/sh\necho oops >&2\nexit 3\n");

        let out = run_script(&confiner, "fail.sh", &[], Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_returns_no_partial_output() {
        let (_tmp, confiner) = setup();
        write_script(&confiner, "slow.sh", "#!/bin/sh\necho early\nsleep 5\n");

        let err = run_script(&confiner, "slow.sh", &[], Duration::from_millis(200))
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("timed out"));
        assert!(!msg.contains("early"));
    }

    #[tokio::test]
    async fn test_escape_is_rejected_before_spawn() {
        let (_tmp, confiner) = setup();
        let err = run_script(&confiner, "../evil.sh", &[], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("outside the permitted working directory"));
    }

    #[tokio::test]
    async fn test_missing_script_is_rejected() {
        let (_tmp, confiner) = setup();
        let err = run_script(&confiner, "nope.sh", &[], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("File \"nope.sh\" not found."));
    }
}
