//! Recognition service boundary.
//!
//! The [`RecognitionService`] trait is the seam between the pipeline and
//! whatever fingerprints the audio. The shipped backend shells out to
//! `songrec`, which fingerprints the file locally and forwards the signature
//! to Shazam, printing the raw JSON response on stdout.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{trace, warn};

/// Subcommand used to recognize a whole file.
const SONGREC_SUBCOMMAND: &str = "audio-file-to-recognized-song";

/// Longest a single recognizer run may take before it is killed.
pub const DEFAULT_RECOGNIZER_TIMEOUT: Duration = Duration::from_secs(120);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Anything that can turn an audio file into a Shazam-style JSON response.
pub trait RecognitionService {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// Submit one file. `Err` carries a human-readable reason.
    fn recognize(&self, path: &Path) -> Result<serde_json::Value, String>;
}

/// Recognition through the `songrec` command line tool.
pub struct SongrecRecognizer {
    command: String,
    timeout: Duration,
}

impl Default for SongrecRecognizer {
    fn default() -> Self {
        Self::new("songrec")
    }
}

impl SongrecRecognizer {
    /// Create a recognizer that runs `command` (a program name or path).
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            timeout: DEFAULT_RECOGNIZER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wait for `child` until the deadline, killing it when it overruns.
    fn wait_bounded(&self, child: &mut Child) -> Result<ExitStatus, String> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    warn!("{} still running after {:?}, killing it", self.command, self.timeout);
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(format!("{} timed out after {:?}", self.command, self.timeout));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(format!("Error waiting for {}: {}", self.command, e)),
            }
        }
    }
}

/// Drain a child pipe on its own thread so a chatty process never blocks on
/// a full pipe while we poll it.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

impl RecognitionService for SongrecRecognizer {
    fn name(&self) -> &str {
        "songrec"
    }

    fn recognize(&self, path: &Path) -> Result<serde_json::Value, String> {
        let mut child = Command::new(&self.command)
            .arg(SONGREC_SUBCOMMAND)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("Error running {}: {}", self.command, e))?;

        let stdout_reader = drain(child.stdout.take());
        let stderr_reader = drain(child.stderr.take());

        let status = self.wait_bounded(&mut child)?;
        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(format!("{} failed: {}", self.command, stderr.trim()));
        }

        let stdout = String::from_utf8_lossy(&stdout);
        trace!("{} returned {} bytes", self.command, stdout.len());
        parse_response(&stdout)
    }
}

/// Parse songrec's stdout. Blank output is an empty response, not an error.
fn parse_response(stdout: &str) -> Result<serde_json::Value, String> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_str(trimmed).map_err(|e| format!("Invalid response JSON: {}", e))
}
