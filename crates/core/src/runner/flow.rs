//! Flow script invocation.
//!
//! The external automation script is invoked as
//! `<interpreter> <script> <flow_name> <data_file>`, mirroring how the
//! browser-automation tool it wraps expects its arguments.

use tokio::fs;
use tokio_util::sync::CancellationToken;

use super::subprocess;
use super::types::{RunError, RunInput, RunOutput};

/// Configured flow script: an interpreter plus the script path.
#[derive(Debug, Clone)]
pub struct FlowScript {
    /// Interpreter binary, e.g. `python3`.
    pub interpreter: String,
    /// Absolute path to the automation script.
    pub script_path: String,
}

impl FlowScript {
    pub fn new(interpreter: impl Into<String>, script_path: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            script_path: script_path.into(),
        }
    }

    /// Run the script for one flow against one uploaded data file.
    ///
    /// Verifies the script exists before spawning so a misconfigured path
    /// surfaces as [`RunError::NotFound`] rather than an opaque exec error.
    pub async fn run(
        &self,
        flow_name: &str,
        data_file: &str,
        input: RunInput,
        cancel: &CancellationToken,
    ) -> Result<RunOutput, RunError> {
        if fs::metadata(&self.script_path).await.is_err() {
            return Err(RunError::NotFound(self.script_path.clone()));
        }

        let mut cmd = tokio::process::Command::new(&self.interpreter);
        cmd.arg(&self.script_path).arg(flow_name).arg(data_file);
        subprocess::run_command(&mut cmd, input, cancel).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    /// Helper to create a temporary shell script from the given body.
    ///
    /// Tests use `sh` as the interpreter so they do not depend on a Python
    /// installation; the argument contract is identical.
    fn write_temp_script(body: &str) -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut f = tempfile::Builder::new()
            .suffix(".sh")
            .tempfile()
            .expect("create temp file");
        write!(f, "{body}").expect("write body");
        f
    }

    fn default_input() -> RunInput {
        RunInput {
            env_vars: vec![],
            working_directory: None,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn passes_flow_name_and_file_as_arguments() {
        let script = write_temp_script("echo \"$1:$2\"\n");
        let flow = FlowScript::new("sh", script.path().to_str().expect("path"));
        let cancel = CancellationToken::new();

        let output = flow
            .run("Weekly Import", "/tmp/upload.csv", default_input(), &cancel)
            .await
            .expect("run should complete");

        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout.trim(), "Weekly Import:/tmp/upload.csv");
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_in_output() {
        let script = write_temp_script("exit 7\n");
        let flow = FlowScript::new("sh", script.path().to_str().expect("path"));
        let cancel = CancellationToken::new();

        let output = flow
            .run("flow", "/tmp/data.csv", default_input(), &cancel)
            .await
            .expect("run should complete");
        assert_eq!(output.exit_code, 7);
        assert!(!output.success());
    }

    #[tokio::test]
    async fn missing_script_is_not_found() {
        let flow = FlowScript::new("sh", "/nonexistent/flow_script.py");
        let cancel = CancellationToken::new();

        let result = flow
            .run("flow", "/tmp/data.csv", default_input(), &cancel)
            .await;
        assert!(matches!(result, Err(RunError::NotFound(_))));
    }

    #[tokio::test]
    async fn long_running_script_can_be_cancelled() {
        let script = write_temp_script("sleep 60\n");
        let flow = FlowScript::new("sh", script.path().to_str().expect("path"));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let result = flow
            .run("flow", "/tmp/data.csv", default_input(), &cancel)
            .await;
        assert!(matches!(result, Err(RunError::Cancelled { .. })));
    }
}
