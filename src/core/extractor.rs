use crate::config::Config;
use crate::core::aggregator::aggregate;
use crate::core::context::ExtractionContext;
use crate::core::fetcher::FetchedPage;
use crate::core::{CandidateRecord, ExtractError, FetchError, StrategyError};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// The discovery strategies, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    DirectPattern,
    ScriptInline,
    StreamingHeuristic,
    FrameFollow,
    EndpointProbe,
    ExternalExtractor,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 6] = [
        StrategyKind::DirectPattern,
        StrategyKind::ScriptInline,
        StrategyKind::StreamingHeuristic,
        StrategyKind::FrameFollow,
        StrategyKind::EndpointProbe,
        StrategyKind::ExternalExtractor,
    ];

    /// Enabled unless configured otherwise. The external extractor needs a
    /// binary on the host and is opt-in.
    pub const DEFAULT: [StrategyKind; 5] = [
        StrategyKind::DirectPattern,
        StrategyKind::ScriptInline,
        StrategyKind::StreamingHeuristic,
        StrategyKind::FrameFollow,
        StrategyKind::EndpointProbe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::DirectPattern => "direct_pattern",
            StrategyKind::ScriptInline => "script_inline",
            StrategyKind::StreamingHeuristic => "streaming_heuristic",
            StrategyKind::FrameFollow => "frame_follow",
            StrategyKind::EndpointProbe => "endpoint_probe",
            StrategyKind::ExternalExtractor => "external_extractor",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<_> = StrategyKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown strategy '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// One independent way of finding video URLs in a fetched page.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Candidates found for `page`, in the order they were found.
    async fn discover(
        &self,
        page: &FetchedPage,
        ctx: &ExtractionContext,
    ) -> Result<Vec<CandidateRecord>, StrategyError>;
}

/// How one strategy fared during an extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyReport {
    pub strategy: &'static str,
    pub found: usize,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct ExtractionReport {
    pub page_url: Url,
    /// Ranked, deduplicated candidates. Empty means "no sources found".
    pub candidates: Vec<CandidateRecord>,
    /// Set when the primary page could not be fetched; no strategy ran.
    pub primary_fetch_error: Option<FetchError>,
    pub strategies: Vec<StrategyReport>,
}

impl ExtractionReport {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn best(&self) -> Option<&CandidateRecord> {
        self.candidates.first()
    }
}

pub struct ExtractionEngine {
    config: Arc<Config>,
    pub strategies: Vec<Box<dyn Strategy>>,
}

impl ExtractionEngine {
    /// Engine with default configuration and no strategies registered.
    pub fn new() -> Self {
        Self {
            config: Arc::new(Config::default()),
            strategies: Vec::new(),
        }
    }

    /// Engine running every strategy enabled in `config`.
    pub fn with_config(config: Config) -> Result<Self, ExtractError> {
        config.validate()?;

        let mut engine = Self {
            strategies: Vec::new(),
            config: Arc::new(config),
        };

        let mut kinds = engine.config.strategies.clone();
        kinds.sort();
        kinds.dedup();
        for kind in kinds {
            engine.register_strategy(crate::extractors::build_strategy(kind));
        }

        Ok(engine)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Add a strategy. Strategies always run in [`StrategyKind`] order;
    /// strategies of the same kind run in registration order.
    pub fn register_strategy(&mut self, strategy: Box<dyn Strategy>) {
        self.strategies.push(strategy);
        self.strategies.sort_by_key(|s| s.kind());
    }

    pub fn strategy_kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Ranked candidates for `url`. A page that cannot be fetched yields an
    /// empty list, the same as a page with nothing on it.
    pub async fn extract(&self, url: &str) -> Result<Vec<CandidateRecord>, ExtractError> {
        Ok(self.extract_report(url).await?.candidates)
    }

    /// Like [`extract_report`](Self::extract_report), but gives up as soon as
    /// `cancel` fires. Outstanding requests are dropped and any external
    /// extractor process is killed.
    pub async fn extract_with_cancel(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<ExtractionReport, ExtractError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Extraction of {} cancelled", url);
                Err(ExtractError::Cancelled)
            }
            report = self.extract_report(url) => report,
        }
    }

    pub async fn extract_report(&self, url: &str) -> Result<ExtractionReport, ExtractError> {
        let page_url = parse_page_url(url)?;
        let ctx = ExtractionContext::new(page_url.clone(), Arc::clone(&self.config))?;

        info!("Extracting video sources from {}", page_url);

        let page = match ctx.fetch_primary().await {
            Ok(page) => page,
            Err(e) => {
                warn!("Primary fetch failed, no sources found: {}", e);
                return Ok(ExtractionReport {
                    page_url,
                    candidates: Vec::new(),
                    primary_fetch_error: Some(e),
                    strategies: Vec::new(),
                });
            }
        };

        let page_title = crate::utils::extract_page_title(&page.body);
        debug!("Page title: {:?}", page_title);

        // join_all yields in input order, so completion order never leaks
        // into the ranking.
        let runs = join_all(self.strategies.iter().map(|strategy| {
            let page = &page;
            let ctx = &ctx;
            async move { (strategy.name(), strategy.discover(page, ctx).await) }
        }))
        .await;

        let mut collected = Vec::new();
        let mut reports = Vec::with_capacity(runs.len());
        for (name, result) in runs {
            match result {
                Ok(records) => {
                    info!("{} found {} candidate(s)", name, records.len());
                    reports.push(StrategyReport {
                        strategy: name,
                        found: records.len(),
                        error: None,
                    });
                    collected.extend(records);
                }
                Err(e) => {
                    warn!("{} failed: {}", name, e);
                    reports.push(StrategyReport {
                        strategy: name,
                        found: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        if let Some(title) = page_title {
            for record in collected.iter_mut().filter(|r| r.has_placeholder_title()) {
                record.title = title.clone();
            }
        }

        let candidates = aggregate(collected);
        info!("{} unique source(s) after ranking", candidates.len());

        Ok(ExtractionReport {
            page_url,
            candidates,
            primary_fetch_error: None,
            strategies: reports,
        })
    }
}

impl Default for ExtractionEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_page_url(url: &str) -> Result<Url, ExtractError> {
    let parsed = Url::parse(url.trim()).map_err(|source| ExtractError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ExtractError::UnsupportedScheme {
            scheme: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_kind_order_is_execution_order() {
        let mut shuffled = vec![
            StrategyKind::EndpointProbe,
            StrategyKind::DirectPattern,
            StrategyKind::ExternalExtractor,
            StrategyKind::FrameFollow,
            StrategyKind::StreamingHeuristic,
            StrategyKind::ScriptInline,
        ];
        shuffled.sort();
        assert_eq!(shuffled, StrategyKind::ALL.to_vec());
    }

    #[test]
    fn test_strategy_kind_from_str() {
        assert_eq!("frame-follow".parse::<StrategyKind>(), Ok(StrategyKind::FrameFollow));
        assert_eq!(" Direct_Pattern ".parse::<StrategyKind>(), Ok(StrategyKind::DirectPattern));
        assert!("telepathy".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_with_config_registers_in_declared_order() {
        let config = Config {
            strategies: vec![
                StrategyKind::EndpointProbe,
                StrategyKind::DirectPattern,
                StrategyKind::EndpointProbe,
            ],
            ..Config::default()
        };
        let engine = ExtractionEngine::with_config(config).unwrap();
        assert_eq!(
            engine.strategy_kinds(),
            vec![StrategyKind::DirectPattern, StrategyKind::EndpointProbe]
        );
    }

    #[test]
    fn test_with_config_rejects_invalid_config() {
        let config = Config {
            max_secondary_fetches: 0,
            ..Config::default()
        };
        assert!(matches!(
            ExtractionEngine::with_config(config),
            Err(ExtractError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_input_is_a_hard_failure() {
        let engine = ExtractionEngine::new();
        assert!(matches!(
            engine.extract("not a url").await,
            Err(ExtractError::InvalidUrl { .. })
        ));
        assert!(matches!(
            engine.extract("ftp://example.com/movie.mp4").await,
            Err(ExtractError::UnsupportedScheme { .. })
        ));
    }

    #[tokio::test]
    async fn test_already_cancelled_token_short_circuits() {
        let engine = ExtractionEngine::new();
        let token = CancellationToken::new();
        token.cancel();
        let result = engine
            .extract_with_cancel("https://example.invalid/watch", &token)
            .await;
        assert!(matches!(result, Err(ExtractError::Cancelled)));
    }
}
