// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Shell script port
//!
//! Every external tool (easyrsa, acbuild, rkt, gpg, git, ssh, scp) is driven
//! through a rendered script handed to a [`ScriptRunner`]. Tests substitute a
//! recording runner and never touch the real tools.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    User,
    /// Run under `sudo`
    Root,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stdio {
    /// Child output streams to the terminal
    Inherit,
    /// Output is collected into [`ScriptOutput`]
    Capture,
    /// Child owns the terminal (stdin included)
    Interactive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    /// Short name used in logs and errors, e.g. `easyrsa init`
    pub label: String,
    pub body: String,
    pub privilege: Privilege,
    pub stdio: Stdio,
    /// Written to the child's stdin, then stdin is closed
    pub stdin: Option<String>,
}

impl Script {
    pub fn new(label: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            body: body.into(),
            privilege: Privilege::User,
            stdio: Stdio::Inherit,
            stdin: None,
        }
    }

    pub fn as_root(mut self) -> Self {
        self.privilege = Privilege::Root;
        self
    }

    pub fn captured(mut self) -> Self {
        self.stdio = Stdio::Capture;
        self
    }

    pub fn interactive(mut self) -> Self {
        self.stdio = Stdio::Interactive;
        self
    }

    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Failed to start '{label}': {source}")]
    Spawn {
        label: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write stdin of '{label}': {source}")]
    Stdin {
        label: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{label}' exited with {}", exit_summary(.code, .stderr))]
    Failed {
        label: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to render script template '{template}': {reason}")]
    Render { template: String, reason: String },
}

impl ShellError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ShellError::Failed { code, .. } => *code,
            _ => None,
        }
    }
}

#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Run `script` to completion. A non-zero exit is [`ShellError::Failed`].
    async fn run(&self, script: Script) -> Result<ScriptOutput, ShellError>;
}

fn exit_summary(code: &Option<i32>, stderr: &str) -> String {
    let status = match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    };
    match stderr.trim() {
        "" => status,
        detail => format!("{}: {}", status, detail),
    }
}

/// Quote `value` for safe interpolation into a POSIX shell command line
pub fn quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:@=+,".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}
