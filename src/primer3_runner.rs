use crate::error::DesignError;
use log::{debug, info, warn};
use std::{
    fs,
    io::{ErrorKind, Read},
    path::Path,
    process::{Child, Command, ExitStatus, Stdio},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

pub const DEFAULT_PRIMER3_BIN: &str = "primer3_core";
pub const PRIMER3_ENV_BIN: &str = "PRIMERDESK_PRIMER3_BIN";
pub const PRIMER3_ENV_TIMEOUT: &str = "PRIMERDESK_PRIMER3_TIMEOUT_SECS";
const INPUT_FILE_NAME: &str = "input.txt";
const POLL_INTERVAL: Duration = Duration::from_millis(20);

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Explicit setting, else environment value, else `primer3_core` on PATH.
pub fn resolve_executable(explicit: Option<&str>, env_value: Option<&str>) -> String {
    explicit
        .and_then(non_empty)
        .or_else(|| env_value.and_then(non_empty))
        .unwrap_or_else(|| DEFAULT_PRIMER3_BIN.to_string())
}

/// Seconds as text; non-positive or unparsable values mean no deadline.
pub fn parse_timeout_secs(text: &str) -> Option<Duration> {
    let secs: f64 = text.trim().parse().ok()?;
    (secs.is_finite() && secs > 0.0).then(|| Duration::from_secs_f64(secs))
}

#[derive(Clone, Debug, PartialEq)]
pub struct Primer3Runner {
    executable: String,
    timeout: Option<Duration>,
}

impl Primer3Runner {
    pub fn new(executable: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            executable: executable.into(),
            timeout,
        }
    }

    /// Fills unset values from `PRIMERDESK_PRIMER3_BIN` and
    /// `PRIMERDESK_PRIMER3_TIMEOUT_SECS`.
    pub fn from_env(executable: Option<&str>, timeout: Option<Duration>) -> Self {
        let env_bin = std::env::var(PRIMER3_ENV_BIN).ok();
        let timeout = timeout.or_else(|| {
            let raw = std::env::var(PRIMER3_ENV_TIMEOUT).ok()?;
            let parsed = parse_timeout_secs(&raw);
            if parsed.is_none() {
                warn!("Ignoring {PRIMER3_ENV_TIMEOUT}='{raw}'");
            }
            parsed
        });
        Self::new(resolve_executable(executable, env_bin.as_deref()), timeout)
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Runs the engine on `input` and returns its raw standard output.
    ///
    /// The input is written to `input.txt` in a fresh temporary directory
    /// that is removed on every exit path.
    pub fn run(&self, input: &str) -> Result<String, DesignError> {
        let dir = tempfile::Builder::new()
            .prefix("primerdesk-")
            .tempdir()
            .map_err(|e| {
                DesignError::io(
                    "Could not create temporary directory in",
                    std::env::temp_dir().display().to_string(),
                    e,
                )
            })?;
        let input_path = dir.path().join(INPUT_FILE_NAME);
        fs::write(&input_path, input).map_err(|e| {
            DesignError::io(
                "Could not write engine input",
                input_path.display().to_string(),
                e,
            )
        })?;
        self.run_on_file(&input_path)
    }

    fn run_on_file(&self, input_path: &Path) -> Result<String, DesignError> {
        info!(
            "Running {} on {}",
            self.executable,
            input_path.display()
        );
        let started = Instant::now();
        let mut child = Command::new(&self.executable)
            .arg(input_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.launch_error(e))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let status = self.wait(&mut child)?;
        let stdout = collect(stdout);
        let stderr = collect(stderr);
        debug!(
            "{} exited with {:?} after {:.2?} ({} bytes stdout, {} bytes stderr)",
            self.executable,
            status.code(),
            started.elapsed(),
            stdout.len(),
            stderr.len()
        );

        if !status.success() {
            return Err(DesignError::EngineExecutionError {
                executable: self.executable.clone(),
                status: status.code(),
                stderr,
            });
        }
        Ok(stdout)
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, DesignError> {
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(|e| self.launch_error(e));
        };
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait().map_err(|e| self.launch_error(e))? {
                return Ok(status);
            }
            let now = Instant::now();
            if now >= deadline {
                warn!(
                    "{} exceeded {:.1} s, stopping it",
                    self.executable,
                    timeout.as_secs_f64()
                );
                let _ = child.kill();
                let _ = child.wait();
                return Err(DesignError::EngineTimeout {
                    executable: self.executable.clone(),
                    seconds: timeout.as_secs_f64(),
                });
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    fn launch_error(&self, e: std::io::Error) -> DesignError {
        let message = if e.kind() == ErrorKind::NotFound {
            format!("executable not found. Install Primer3 or set {PRIMER3_ENV_BIN}")
        } else {
            e.to_string()
        };
        DesignError::EngineLaunchFailure {
            executable: self.executable.clone(),
            message,
        }
    }
}

impl Default for Primer3Runner {
    fn default() -> Self {
        Self::new(DEFAULT_PRIMER3_BIN, None)
    }
}

/// Reads a pipe to the end on a helper thread so the child never blocks on
/// a full pipe buffer.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    let mut pipe = pipe?;
    Some(thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    }))
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
        .unwrap_or_default()
}
