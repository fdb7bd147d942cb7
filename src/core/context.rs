use crate::config::Config;
use crate::core::fetcher::{FetchOptions, FetchedPage, Fetcher, RequestFlavor};
use crate::core::validator::ValidationRules;
use crate::core::{ExtractError, FetchError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Everything one extraction call needs: its own HTTP client and cookie jar,
/// the page URL used as referrer for secondary fetches, and the pool bounding
/// those fetches. Built per call and dropped with it.
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    fetcher: Fetcher,
    page_url: Url,
    config: Arc<Config>,
    secondary_permits: Arc<Semaphore>,
}

impl ExtractionContext {
    pub fn new(page_url: Url, config: Arc<Config>) -> Result<Self, ExtractError> {
        let fetcher = Fetcher::new(&config).map_err(ExtractError::Client)?;
        let secondary_permits = Arc::new(Semaphore::new(config.max_secondary_fetches));

        Ok(Self {
            fetcher,
            page_url,
            config,
            secondary_permits,
        })
    }

    pub fn page_url(&self) -> &Url {
        &self.page_url
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules::with_min_length(self.config.min_url_length)
    }

    pub async fn fetch_primary(&self) -> Result<FetchedPage, FetchError> {
        self.fetcher
            .fetch(&self.page_url, None, self.config.primary_timeout())
            .await
    }

    /// GET a sub-resource discovered in the primary page, with the primary
    /// page as referrer. Waits for a slot in the secondary-fetch pool first.
    pub async fn fetch_secondary(
        &self,
        target: &Url,
        flavor: RequestFlavor,
        timeout: Duration,
    ) -> Result<FetchedPage, FetchError> {
        // The semaphore is never closed, so a failed acquire cannot happen.
        let _permit = self.secondary_permits.acquire().await.ok();

        self.fetcher
            .fetch_with(
                target,
                FetchOptions {
                    referrer: Some(&self.page_url),
                    timeout,
                    flavor,
                },
            )
            .await
    }
}
