use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use codeagent_commands::comment_text::truncate_for_error;
use codeagent_runtime::{CodeGenerationSummary, CodeGenerator, WorkspaceHandle};
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info};

const PROCESS_ERROR_MAX_CHARS: usize = 800;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliCodeGeneratorConfig {
    pub program: String,
    /// Passed after `-p <prompt> --output-format json`.
    pub extra_args: Vec<String>,
    pub timeout_ms: u64,
}

impl Default for CliCodeGeneratorConfig {
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            extra_args: Vec::new(),
            timeout_ms: 600_000,
        }
    }
}

/// Runs the coding CLI inside the prepared workspace and interprets its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliCodeGenerator {
    config: CliCodeGeneratorConfig,
}

impl CliCodeGenerator {
    pub fn new(config: CliCodeGeneratorConfig) -> Result<Self> {
        if config.program.trim().is_empty() {
            bail!("code generator program is empty");
        }
        if config.timeout_ms == 0 {
            bail!("code generator timeout must be greater than 0ms");
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &CliCodeGeneratorConfig {
        &self.config
    }
}

async fn spawn_with_text_file_busy_retry(
    command: &mut Command,
    program: &str,
) -> Result<tokio::process::Child> {
    const MAX_TEXT_FILE_BUSY_RETRIES: u32 = 5;
    const TEXT_FILE_BUSY_ERRNO: i32 = 26;
    let mut attempt = 0;
    loop {
        match command.spawn() {
            Ok(child) => return Ok(child),
            Err(error)
                if error.raw_os_error() == Some(TEXT_FILE_BUSY_ERRNO)
                    && attempt < MAX_TEXT_FILE_BUSY_RETRIES =>
            {
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("failed to spawn code generator '{program}'"))
            }
        }
    }
}

#[async_trait]
impl CodeGenerator for CliCodeGenerator {
    async fn generate(
        &self,
        description: &str,
        workspace: &WorkspaceHandle,
    ) -> Result<CodeGenerationSummary> {
        let mut command = Command::new(&self.config.program);
        command.kill_on_drop(true);
        command.current_dir(&workspace.path);
        command.arg("-p");
        command.arg(description);
        command.arg("--output-format");
        command.arg("json");
        command.args(&self.config.extra_args);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        debug!(
            program = %self.config.program,
            workspace = %workspace.path.display(),
            "starting code generator"
        );
        let child = spawn_with_text_file_busy_retry(&mut command, &self.config.program).await?;

        let output = tokio::time::timeout(
            Duration::from_millis(self.config.timeout_ms),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "code generator timed out after {}ms",
                self.config.timeout_ms
            )
        })?
        .context("code generator process failed")?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            let status = output
                .status
                .code()
                .map(|value| value.to_string())
                .unwrap_or_else(|| "signal".to_string());
            bail!(
                "code generator failed with status {status}: {}",
                summarize_process_failure(&stderr, &stdout)
            );
        }

        let summary = interpret_generator_output(&stdout);
        info!(
            branch = %workspace.branch,
            success = summary.success,
            "code generator finished"
        );
        Ok(summary)
    }
}

/// Understands `{"result": ..., "is_error": ...}` payloads; anything else is
/// taken verbatim as a successful summary.
pub fn interpret_generator_output(stdout: &str) -> CodeGenerationSummary {
    let trimmed = stdout.trim();
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return CodeGenerationSummary {
            success: true,
            summary: trimmed.to_string(),
        };
    };
    if let Some(message) = extract_error_message(&value) {
        return CodeGenerationSummary {
            success: false,
            summary: message,
        };
    }
    match extract_result_message(&value) {
        Some(result) => CodeGenerationSummary {
            success: true,
            summary: result,
        },
        None => CodeGenerationSummary {
            success: true,
            summary: trimmed.to_string(),
        },
    }
}

fn non_empty_field(map: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

fn extract_error_message(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            if !map
                .get("is_error")
                .and_then(Value::as_bool)
                .unwrap_or(false)
            {
                return None;
            }
            non_empty_field(map, "result")
                .or_else(|| non_empty_field(map, "error"))
                .or_else(|| non_empty_field(map, "message"))
                .or(Some("code generator reported an error".to_string()))
        }
        Value::Array(entries) => entries.iter().find_map(extract_error_message),
        _ => None,
    }
}

fn extract_result_message(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => non_empty_field(map, "result"),
        Value::Array(entries) => entries.iter().rev().find_map(extract_result_message),
        _ => None,
    }
}

fn summarize_process_failure(stderr: &str, stdout: &str) -> String {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return truncate_for_error(stderr, PROCESS_ERROR_MAX_CHARS);
    }

    let stdout = stdout.trim();
    if !stdout.is_empty() {
        return truncate_for_error(stdout, PROCESS_ERROR_MAX_CHARS);
    }

    "no error output".to_string()
}
