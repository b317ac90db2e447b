//! Cover art download.

use std::io::Read;
use std::time::Duration;

/// Refuse covers larger than this.
const MAX_COVER_BYTES: u64 = 16 * 1024 * 1024;

/// Fetches image bytes for a cover URL.
pub trait CoverFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, String>;
}

/// Plain HTTP(S) download with a request timeout.
pub struct HttpCoverFetcher {
    agent: ureq::Agent,
}

impl Default for HttpCoverFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(20))
    }
}

impl HttpCoverFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl CoverFetcher for HttpCoverFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        let response = self
            .agent
            .get(url)
            .set("Accept", "image/*")
            .call()
            .map_err(|e| format!("Cover download failed: {}", e))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_COVER_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|e| format!("Cover download interrupted: {}", e))?;

        if bytes.is_empty() {
            return Err(format!("Empty cover image at {}", url));
        }
        Ok(bytes)
    }
}
