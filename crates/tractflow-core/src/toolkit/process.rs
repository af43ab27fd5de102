//! Blocking execution of external programs.

use crate::PipelineError;
use std::process::Command;

/// Render a command as a shell-like line for logs.
pub fn command_line(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|s| s.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run `command` to completion.
///
/// A non-zero exit becomes [`PipelineError::Toolkit`] with the program's
/// stderr (or stdout when stderr is empty) as the message.
pub fn run_command(mut command: Command) -> Result<(), PipelineError> {
    let program = command.get_program().to_string_lossy().into_owned();
    tracing::debug!("Running: {}", command_line(&command));

    let output = command.output().map_err(|e| PipelineError::Spawn {
        program: program.clone(),
        reason: e.to_string(),
    })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let message = if stderr.is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr
    };

    Err(PipelineError::Toolkit {
        program,
        status: output.status.code(),
        stderr: message,
    })
}
