//! Recognition with bounded retries.
//!
//! Shazam is flaky under load: requests fail outright or come back empty
//! when the service is throttling. [`RecognitionClient`] retries a fixed
//! number of times with a fixed pause in between. The pause goes through the
//! [`Sleeper`] trait so tests can run without wall-clock delay.

use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{AutotagError, Result};
use crate::metadata::RecognitionResult;
use crate::recognizer::RecognitionService;

/// Attempts per file unless configured otherwise.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Pause between attempts unless configured otherwise.
pub const DEFAULT_DELAY_SECONDS: u64 = 10;

/// Suspends the current task between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Blocks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Wraps a [`RecognitionService`] with retry and backoff.
pub struct RecognitionClient<'a> {
    service: &'a dyn RecognitionService,
    sleeper: &'a dyn Sleeper,
    max_retries: u32,
    delay: Duration,
}

impl<'a> RecognitionClient<'a> {
    /// * `max_retries`: total attempts per file (0 is treated as 1)
    /// * `delay`: pause between two attempts
    pub fn new(
        service: &'a dyn RecognitionService,
        sleeper: &'a dyn Sleeper,
        max_retries: u32,
        delay: Duration,
    ) -> Self {
        RecognitionClient {
            service,
            sleeper,
            max_retries: max_retries.max(1),
            delay,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Recognize one file.
    ///
    /// Service errors and empty responses are retried until the attempt
    /// budget is spent. A response whose title is unknown ends the loop at
    /// once with [`AutotagError::UnknownTitle`].
    pub fn recognize(&self, path: &Path) -> Result<RecognitionResult> {
        let mut last_error = String::from("no response");

        for attempt in 1..=self.max_retries {
            match self.service.recognize(path) {
                Ok(raw) => match RecognitionResult::from_json(&raw) {
                    Some(result) if result.has_unknown_title() => {
                        return Err(AutotagError::UnknownTitle {
                            path: path.to_path_buf(),
                        });
                    }
                    Some(result) => {
                        debug!("[{}] Found: {} (attempt {})", self.service.name(), result, attempt);
                        return Ok(result);
                    }
                    None => last_error = "Empty response, no match".to_string(),
                },
                Err(e) => last_error = e,
            }

            debug!(
                "[{}] Attempt {}/{} failed: {}",
                self.service.name(),
                attempt,
                self.max_retries,
                last_error
            );

            if attempt < self.max_retries {
                debug!(
                    "[{}] Retrying in {:.1}s...",
                    self.service.name(),
                    self.delay.as_secs_f64()
                );
                self.sleeper.sleep(self.delay);
            }
        }

        warn!(
            "[{}] Giving up on {} after {} attempt(s): {}",
            self.service.name(),
            path.display(),
            self.max_retries,
            last_error
        );
        Err(AutotagError::Recognition {
            path: path.to_path_buf(),
            attempts: self.max_retries,
            reason: last_error,
        })
    }
}
