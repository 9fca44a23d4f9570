//! Collaborators backed by the `git` command line.

use error_set::error_set;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::collab::{
    ApplyDirection, ApplyTarget, DiffSelector, DiffSource, ExternalEditor, ExternalError,
    PatchApplier,
};

error_set! {
    /// Errors from git command execution
    GitCommandError := {
        #[display("Failed to run git diff: {message}")]
        DiffFailed { message: String },
        #[display("git diff failed: {stderr}")]
        DiffExitError { stderr: String },
        #[display("Invalid UTF-8 in git diff output: {message}")]
        InvalidUtf8 { message: String },
        #[display("Failed to spawn git apply: {message}")]
        ApplySpawnFailed { message: String },
        #[display("Failed to get stdin handle for git apply")]
        ApplyStdinFailed,
        #[display("Failed to write patch to git apply: {message}")]
        ApplyWriteFailed { message: String },
        #[display("Failed to wait for git apply: {message}")]
        ApplyWaitFailed { message: String },
        #[display("git apply failed: {stderr}")]
        ApplyExitError { stderr: String },
    }
}

/// A repository driven through `git -C <path>`
#[derive(Debug, Clone)]
pub struct GitRepo {
    path: PathBuf,
    context_lines: u32,
}

impl GitRepo {
    pub fn new(path: impl Into<PathBuf>, context_lines: u32) -> Self {
        Self {
            path: path.into(),
            context_lines,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw `git diff` output for `selector`
    pub fn diff(&self, selector: &DiffSelector) -> Result<String, GitCommandError> {
        let context = format!("-U{}", self.context_lines);
        let mut args = vec!["diff", "--no-ext-diff", "--no-color", context.as_str()];

        match selector {
            DiffSelector::Unstaged { .. } => {}
            DiffSelector::Staged { .. } => args.push("--cached"),
            DiffSelector::Refs {
                from, to, reverse, ..
            } => {
                if *reverse {
                    args.push("-R");
                }
                args.push(from);
                args.push(to);
            }
        }
        args.extend(["--", selector.path()]);

        let output = self
            .git()
            .args(&args)
            .output()
            .map_err(|e| GitCommandError::DiffFailed {
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitCommandError::DiffExitError {
                stderr: stderr.into_owned(),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| GitCommandError::InvalidUtf8 {
            message: e.to_string(),
        })
    }

    /// Feed `patch` to `git apply` on stdin
    pub fn apply(
        &self,
        patch: &str,
        target: ApplyTarget,
        direction: ApplyDirection,
    ) -> Result<(), GitCommandError> {
        let mut args = vec!["apply"];
        if target == ApplyTarget::Index {
            args.push("--cached");
        }
        if direction == ApplyDirection::Reverse {
            args.push("--reverse");
        }
        if self.context_lines == 0 {
            args.push("--unidiff-zero");
        }
        args.push("-");

        tracing::info!(?target, ?direction, bytes = patch.len(), "applying patch");

        let mut child = self
            .git()
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GitCommandError::ApplySpawnFailed {
                message: e.to_string(),
            })?;

        child
            .stdin
            .take()
            .ok_or(GitCommandError::ApplyStdinFailed)?
            .write_all(patch.as_bytes())
            .map_err(|e| GitCommandError::ApplyWriteFailed {
                message: e.to_string(),
            })?;

        let output = child
            .wait_with_output()
            .map_err(|e| GitCommandError::ApplyWaitFailed {
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitCommandError::ApplyExitError {
                stderr: stderr.into_owned(),
            });
        }

        Ok(())
    }

    fn git(&self) -> Command {
        let mut command = Command::new("git");
        command.arg("-C").arg(&self.path);
        command
    }
}

impl DiffSource for GitRepo {
    fn diff_text(&self, selector: &DiffSelector) -> Result<String, ExternalError> {
        self.diff(selector)
            .map_err(|e| ExternalError::DiffUnavailable {
                path: selector.path().to_string(),
                reason: e.to_string(),
            })
    }
}

impl PatchApplier for GitRepo {
    fn apply_patch(
        &self,
        patch: &str,
        target: ApplyTarget,
        direction: ApplyDirection,
    ) -> Result<(), ExternalError> {
        self.apply(patch, target, direction)
            .map_err(|e| ExternalError::ApplyRejected {
                reason: match e {
                    GitCommandError::ApplyExitError { stderr } => stderr.trim_end().to_string(),
                    other => other.to_string(),
                },
            })
    }
}

/// Runs `<command> +<line> <path>` and waits for it to exit
#[derive(Debug, Clone)]
pub struct CommandEditor {
    command: String,
}

impl CommandEditor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl ExternalEditor for CommandEditor {
    fn edit_file_at_line(&self, path: &Path, line: usize) -> Result<(), ExternalError> {
        let mut words = self.command.split_whitespace();
        let program = words.next().ok_or_else(|| ExternalError::EditorFailed {
            reason: "no editor configured".to_string(),
        })?;

        tracing::debug!(editor = program, path = %path.display(), line, "opening editor");

        let status = Command::new(program)
            .args(words)
            .arg(format!("+{line}"))
            .arg(path)
            .status()
            .map_err(|e| ExternalError::EditorFailed {
                reason: format!("{program}: {e}"),
            })?;

        if !status.success() {
            return Err(ExternalError::EditorFailed {
                reason: format!("{program} exited with {status}"),
            });
        }

        Ok(())
    }
}
