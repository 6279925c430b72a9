//! Builder for executing external tool commands with timeout support.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;

/// Default command timeout: 1 hour. Long lossless sources can take a while
/// to encode with the slower encoders.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use snd_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> snd_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .arg("-v").arg("quiet")
///     .arg("-print_format").arg("json")
///     .arg("-show_format")
///     .arg("/path/to/track.flac")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// The arguments collected so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Render the command line as a shell-like string, quoting arguments
    /// that contain whitespace or quotes.
    pub fn display(&self) -> String {
        std::iter::once(self.program.to_string_lossy().to_string())
            .chain(self.args.iter().cloned())
            .map(|a| quote_arg(&a))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - Returns [`snd_core::Error::Tool`] if the process times out (message
    ///   includes the timeout duration). The child is killed.
    /// - Returns [`snd_core::Error::Tool`] if the process exits with a non-zero
    ///   status (message includes stderr).
    /// - Returns [`snd_core::Error::Tool`] if spawning the process fails.
    pub async fn execute(&self) -> snd_core::Result<ToolOutput> {
        let program_name = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::debug!("exec: {}", self.display());

        let child = cmd
            .spawn()
            .map_err(|e| snd_core::Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        match result {
            Ok(Ok(output)) => {
                let tool_output = ToolOutput {
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if !output.status.success() {
                    return Err(snd_core::Error::tool(
                        program_name,
                        format!(
                            "exited with status {}: {}",
                            output.status,
                            last_lines(tool_output.stderr.trim(), 5)
                        ),
                    ));
                }

                Ok(tool_output)
            }
            Ok(Err(e)) => Err(snd_core::Error::tool(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            Err(_elapsed) => Err(snd_core::Error::tool(
                program_name,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }
}

fn quote_arg(arg: &str) -> String {
    if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '\'' || c == '"') {
        format!("'{}'", arg.replace('\'', r"'\''"))
    } else {
        arg.to_string()
    }
}

/// ffmpeg can be chatty on stderr; keep the tail, which holds the error.
fn last_lines(s: &str, n: usize) -> String {
    let lines: Vec<&str> = s.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join(" | ")
}
