// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `ScriptRunner` backed by `/bin/bash` through `tokio::process`

use crate::domain::shell::{Privilege, Script, ScriptOutput, ScriptRunner, ShellError, Stdio};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio as ProcessStdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error};

pub struct BashRunner {
    working_dir: PathBuf,
}

impl BashRunner {
    /// Scripts run with `working_dir` as their current directory
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    fn command(&self, script: &Script) -> Command {
        let mut cmd = match script.privilege {
            Privilege::User => Command::new("/bin/bash"),
            Privilege::Root => {
                let mut sudo = Command::new("sudo");
                sudo.arg("/bin/bash");
                sudo
            }
        };
        cmd.arg("-c").arg(&script.body);
        cmd.current_dir(&self.working_dir);

        let (stdout, stderr) = match script.stdio {
            Stdio::Capture => (ProcessStdio::piped(), ProcessStdio::piped()),
            Stdio::Inherit | Stdio::Interactive => (ProcessStdio::inherit(), ProcessStdio::inherit()),
        };
        let stdin = match (&script.stdin, script.stdio) {
            (Some(_), _) => ProcessStdio::piped(),
            (None, Stdio::Interactive) => ProcessStdio::inherit(),
            (None, _) => ProcessStdio::null(),
        };
        cmd.stdin(stdin).stdout(stdout).stderr(stderr);
        cmd
    }
}

#[async_trait]
impl ScriptRunner for BashRunner {
    async fn run(&self, script: Script) -> Result<ScriptOutput, ShellError> {
        debug!(label = %script.label, privilege = ?script.privilege, "Running script:\n{}", script.body);

        let mut child = self.command(&script).spawn().map_err(|source| ShellError::Spawn {
            label: script.label.clone(),
            source,
        })?;

        if let (Some(input), Some(mut stdin)) = (&script.stdin, child.stdin.take()) {
            match stdin.write_all(input.as_bytes()).await {
                Ok(()) => {}
                // The child exited without reading all of its input; its status decides
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!(label = %script.label, "Script closed stdin early");
                }
                Err(source) => {
                    return Err(ShellError::Stdin {
                        label: script.label.clone(),
                        source,
                    });
                }
            }
            // Closing stdin lets the child see EOF
            drop(stdin);
        }

        let output = child.wait_with_output().await.map_err(|source| ShellError::Spawn {
            label: script.label.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            error!(
                label = %script.label,
                code = ?output.status.code(),
                "Script failed"
            );
            return Err(ShellError::Failed {
                label: script.label,
                code: output.status.code(),
                stderr,
            });
        }

        Ok(ScriptOutput { stdout, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let runner = BashRunner::new(dir.path());
        let output = runner
            .run(Script::new("echo", "echo hello; echo oops >&2").captured())
            .await
            .unwrap();
        assert_eq!(output.stdout, "hello\n");
        assert_eq!(output.stderr, "oops\n");
    }

    #[tokio::test]
    async fn test_feeds_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let runner = BashRunner::new(dir.path());
        let output = runner
            .run(Script::new("cat", "cat").captured().with_stdin("secret"))
            .await
            .unwrap();
        assert_eq!(output.stdout, "secret");
    }

    #[tokio::test]
    async fn test_unread_stdin_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = BashRunner::new(dir.path());
        let input = "x".repeat(4 << 20);
        let output = runner
            .run(Script::new("ignore input", "exit 0").captured().with_stdin(input.clone()))
            .await
            .unwrap();
        assert_eq!(output, ScriptOutput::default());

        let err = runner
            .run(Script::new("reject input", "exit 4").captured().with_stdin(input))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(4));
    }

    #[tokio::test]
    async fn test_failure_carries_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let runner = BashRunner::new(dir.path());
        let err = runner
            .run(Script::new("fail", "echo broken >&2; exit 3").captured())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(3));
        assert!(err.to_string().contains("broken"));
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), "x").unwrap();
        let runner = BashRunner::new(dir.path());
        let output = runner
            .run(Script::new("ls", "ls").captured())
            .await
            .unwrap();
        assert!(output.stdout.contains("marker"));
    }
}
