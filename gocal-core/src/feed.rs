//! Where the raw event feed comes from.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{GoCalError, GoCalResult};

/// A source of the raw feed body (a JSON array of event records).
pub trait FeedSource {
    /// Human description of the source, for progress output.
    fn describe(&self) -> String;

    fn fetch(&self) -> impl Future<Output = GoCalResult<Vec<u8>>> + Send;
}

/// Fetches the feed over HTTP. No retries: a failure aborts the run.
pub struct HttpFeed {
    http: reqwest::Client,
    url: String,
}

impl HttpFeed {
    pub fn new(url: &str, timeout: Duration) -> GoCalResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GoCalError::Fetch(e.to_string()))?;

        Ok(HttpFeed {
            http,
            url: url.to_string(),
        })
    }
}

impl FeedSource for HttpFeed {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> GoCalResult<Vec<u8>> {
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| GoCalError::Fetch(format!("{}: {}", self.url, e)))?;

        if !resp.status().is_success() {
            return Err(GoCalError::Fetch(format!(
                "{} returned HTTP {}",
                self.url,
                resp.status()
            )));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| GoCalError::Fetch(format!("{}: {}", self.url, e)))?;

        Ok(body.to_vec())
    }
}

/// Reads the feed from a local file.
pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileFeed { path: path.into() }
    }
}

impl FeedSource for FileFeed {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> GoCalResult<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| GoCalError::Fetch(format!("{}: {}", self.path.display(), e)))
    }
}
