use crate::config::Config;
use crate::core::DownloadRequest;
use anyhow::Result;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use url::Url;

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Streams a chosen candidate to disk. Always starts from byte zero.
pub struct Downloader {
    client: reqwest::Client,
    pub retries: usize,
    backoff_base: Duration,
}

impl Downloader {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            retries: config.retries.max(1),
            backoff_base: Duration::from_secs(1),
        })
    }

    /// Base delay for the exponential backoff between attempts.
    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Download `request` into `output_path`, sending `referrer` (the page the
    /// candidate was found on) as `Referer`. `on_progress` receives bytes
    /// written so far and the expected total when the server announced one.
    /// Returns the number of bytes written.
    pub async fn download<F>(
        &self,
        request: &DownloadRequest,
        referrer: &Url,
        output_path: &Path,
        mut on_progress: F,
    ) -> Result<u64>
    where
        F: FnMut(u64, Option<u64>),
    {
        info!("Downloading: {} ({})", request.title, request.format);
        info!("URL: {}", request.url);

        let max_attempts = u32::try_from(self.retries).unwrap_or(u32::MAX);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let response = match self.send(&request.url, referrer).await {
                Ok(response) => response,
                Err(e) => {
                    if attempt >= max_attempts {
                        return Err(e.into());
                    }
                    warn!("Request failed (attempt {}): {}", attempt, e);
                    tokio::time::sleep(self.backoff(attempt)).await;
                    continue;
                }
            };

            let status = response.status();

            if status.is_success() {
                return self.write_body(response, output_path, &mut on_progress).await;
            } else if status == reqwest::StatusCode::FORBIDDEN && attempt < max_attempts {
                let delay = self.backoff(attempt);
                warn!("HTTP 403 (attempt {}), retrying in {:?}", attempt, delay);
                tokio::time::sleep(delay).await;
                continue;
            } else {
                anyhow::bail!("Download failed after {} attempt(s): HTTP {}", attempt, status);
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2_u32.saturating_pow(attempt))
            .min(MAX_BACKOFF)
    }

    async fn send(&self, url: &str, referrer: &Url) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(url)
            .header("Accept", "*/*")
            .header("Accept-Encoding", "identity")
            .header("Connection", "keep-alive")
            .header("Range", "bytes=0-")
            .header("Referer", referrer.as_str())
            .header("Sec-Fetch-Dest", "video")
            .header("Sec-Fetch-Mode", "no-cors")
            .header("Sec-Fetch-Site", "cross-site")
            .send()
            .await
    }

    async fn write_body<F>(
        &self,
        response: reqwest::Response,
        output_path: &Path,
        on_progress: &mut F,
    ) -> Result<u64>
    where
        F: FnMut(u64, Option<u64>),
    {
        let total = response.content_length();
        let mut written = 0u64;
        let mut file = File::create(output_path).await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            on_progress(written, total);
        }

        file.flush().await?;

        if written == 0 {
            anyhow::bail!("No data downloaded to {}", output_path.display());
        }

        info!("Downloaded {} bytes to {}", written, output_path.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_then_caps() {
        let downloader = Downloader::new(&Config::default())
            .unwrap()
            .with_backoff(Duration::from_millis(100));

        assert_eq!(downloader.backoff(1), Duration::from_millis(200));
        assert_eq!(downloader.backoff(3), Duration::from_millis(800));
        assert_eq!(downloader.backoff(32), MAX_BACKOFF);
        assert_eq!(downloader.backoff(u32::MAX), MAX_BACKOFF);
    }
}
