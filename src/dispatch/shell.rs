//! Shell runner

use std::path::Path;
use std::process::Stdio;

use serde_json::Value as JsonValue;
use tokio::process::Command;
use tracing::warn;

use crate::config::RunnerConfig;
use crate::errors::ChainError;

/// Run `script` through the configured shell in `cwd`
///
/// Standard output is the step result. Standard error from a successful
/// command is only a warning; a failed command reports it as the message.
pub async fn run(settings: &RunnerConfig, cwd: &Path, script: &str) -> Result<JsonValue, ChainError> {
    let output = Command::new(&settings.shell)
        .arg(&settings.shell_flag)
        .arg(script)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| ChainError::Step {
            command: script.to_string(),
            message: format!("failed to execute {}: {}", settings.shell, e),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        let message = match stderr.trim() {
            "" => match output.status.code() {
                Some(code) => format!("Command exited with status {}", code),
                None => "Command terminated by signal".to_string(),
            },
            text => text.to_string(),
        };
        return Err(ChainError::Step {
            command: script.to_string(),
            message,
        });
    }

    if !stderr.trim().is_empty() {
        warn!(command = %script, "{}", stderr.trim_end());
    }

    Ok(JsonValue::String(stdout))
}
