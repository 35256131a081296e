//! Identity check run after a switch.
//!
//! The configured command (by default `aws sts get-caller-identity`) is run
//! against the now-live configuration and its stdout is shown to the
//! operator. There is no timeout; the command runs until it exits.

use std::process::Command;
use tracing::debug;

use crate::error::{SwitchError, SwitchResult};

#[derive(Debug, Clone)]
pub struct IdentityCheck {
    program: String,
    args: Vec<String>,
}

impl IdentityCheck {
    /// Build a check from an argv list; the first element is the program
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// The full command line, for messages
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command and capture its stdout as text
    pub fn run(&self) -> SwitchResult<String> {
        debug!(command = %self.display(), "running identity check");

        let failed = |reason: String| SwitchError::IdentityCheckFailed {
            command: self.display(),
            reason,
        };

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|e| failed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = match stderr.trim() {
                "" => output.status.to_string(),
                msg => format!("{}: {}", output.status, msg),
            };
            return Err(failed(reason));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Split identity output into lines, flagging those that contain `token`
pub fn highlight_lines<'a>(output: &'a str, token: &str) -> Vec<(&'a str, bool)> {
    output
        .lines()
        .map(|line| (line, !token.is_empty() && line.contains(token)))
        .collect()
}
