use crate::core::fetcher::{resolve_locator, FetchedPage, RequestFlavor};
use crate::core::validator::ValidationRules;
use crate::core::{
    CandidateRecord, ExtractionContext, ExtractionMethod, Strategy, StrategyError, StrategyKind,
};
use crate::extractors::patterns::PatternSet;
use crate::extractors::{candidate_from_match, mentions_any};
use crate::utils::clean_url;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, warn};
use url::Url;

const ENDPOINT_KEYWORDS: [&str; 4] = ["video", "stream", "play", "media"];

// Request call sites in inline script: jQuery ajax/get/getJSON/post, fetch,
// XMLHttpRequest.open and axios.
static CALL_SITE_PATTERNS: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r#"\.ajax\(\s*\{[^}]*?url\s*:\s*["']([^"']+)["']"#,
        r#"\bfetch\(\s*["']([^"']+)["']"#,
        r#"\.open\(\s*["'](?:GET|POST)["']\s*,\s*["']([^"']+)["']"#,
        r#"\$\.(?:get|getJSON|post)\(\s*["']([^"']+)["']"#,
        r#"\baxios(?:\.(?:get|post))?\(\s*["']([^"']+)["']"#,
    ])
    .expect("call site patterns are valid")
});

static RESPONSE_PATTERNS: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r#""(?:url|file|src|source|hls|dash)"\s*:\s*"([^"]+\.(?:mp4|m3u8|mpd)(?:\?[^"]*)?)""#,
    ])
    .expect("response pattern is valid")
});

/// Probes JSON endpoints the page's own script would call and reads video
/// URLs out of the responses.
pub struct EndpointProbeStrategy;

impl EndpointProbeStrategy {
    /// Endpoints referenced by request call sites whose path looks
    /// media-related, resolved against the page. Each is listed once.
    pub fn endpoint_targets(&self, text: &str, base: &Url) -> Vec<Url> {
        let mut seen = HashSet::new();
        CALL_SITE_PATTERNS
            .scan(text)
            .map(|m| clean_url(m.value))
            .filter(|target| mentions_any(target, &ENDPOINT_KEYWORDS))
            .filter_map(|target| resolve_locator(base, &target))
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }

    pub fn scan_response(
        &self,
        response: &FetchedPage,
        rules: &ValidationRules,
    ) -> Vec<CandidateRecord> {
        RESPONSE_PATTERNS
            .scan(&response.body)
            .filter_map(|m| candidate_from_match(m.value, &response.url, ExtractionMethod::Api, rules))
            .collect()
    }
}

#[async_trait]
impl Strategy for EndpointProbeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::EndpointProbe
    }

    async fn discover(
        &self,
        page: &FetchedPage,
        ctx: &ExtractionContext,
    ) -> Result<Vec<CandidateRecord>, StrategyError> {
        let endpoints = self.endpoint_targets(&page.body, &page.url);
        if endpoints.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Probing {} endpoint(s)", endpoints.len());

        let timeout = ctx.config().probe_timeout();
        let responses = join_all(
            endpoints
                .iter()
                .map(|endpoint| ctx.fetch_secondary(endpoint, RequestFlavor::Xhr, timeout)),
        )
        .await;

        let rules = ctx.validation_rules();
        let mut records = Vec::new();
        let mut first_error = None;
        for (endpoint, response) in endpoints.iter().zip(responses) {
            match response {
                Ok(response) => records.extend(self.scan_response(&response, &rules)),
                Err(e) => {
                    warn!("Endpoint {} skipped: {}", endpoint, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if records.is_empty() => Err(e.into()),
            _ => Ok(records),
        }
    }
}
