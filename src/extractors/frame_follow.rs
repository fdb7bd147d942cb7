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

const FRAME_KEYWORDS: [&str; 4] = ["player", "embed", "video", "stream"];

static IFRAME_PATTERN: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[r#"<iframe\b[^>]*?\ssrc\s*=\s*["']([^"']+)["'][^>]*>"#])
        .expect("iframe pattern is valid")
});

static FRAME_VIDEO_PATTERNS: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r#""(?:file|src|url)"\s*:\s*"([^"]+\.(?:mp4|m3u8|mpd)(?:\?[^"]*)?)""#,
        r#"(?:source|file)\s*:\s*["']([^"']+\.(?:mp4|m3u8|mpd)(?:\?[^"']*)?)["']"#,
        r#"<source\b[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#,
    ])
    .expect("frame video patterns are valid")
});

/// Follows embedded player frames and scans the frame documents.
pub struct FrameFollowStrategy;

impl FrameFollowStrategy {
    /// Frame targets worth following, resolved against the page and in the
    /// order they appear. Each target is listed once.
    pub fn frame_targets(&self, text: &str, base: &Url) -> Vec<Url> {
        let mut seen = HashSet::new();
        IFRAME_PATTERN
            .scan(text)
            .map(|m| clean_url(m.value))
            .filter(|src| mentions_any(src, &FRAME_KEYWORDS))
            .filter_map(|src| resolve_locator(base, &src))
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }

    /// Video URLs in a fetched frame document, resolved against the frame's
    /// own URL.
    pub fn scan_frame(&self, frame: &FetchedPage, rules: &ValidationRules) -> Vec<CandidateRecord> {
        FRAME_VIDEO_PATTERNS
            .scan(&frame.body)
            .filter_map(|m| candidate_from_match(m.value, &frame.url, ExtractionMethod::Iframe, rules))
            .collect()
    }
}

#[async_trait]
impl Strategy for FrameFollowStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FrameFollow
    }

    async fn discover(
        &self,
        page: &FetchedPage,
        ctx: &ExtractionContext,
    ) -> Result<Vec<CandidateRecord>, StrategyError> {
        let targets = self.frame_targets(&page.body, &page.url);
        if targets.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Following {} frame(s)", targets.len());

        let timeout = ctx.config().frame_timeout();
        let fetches = join_all(
            targets
                .iter()
                .map(|target| ctx.fetch_secondary(target, RequestFlavor::Frame, timeout)),
        )
        .await;

        let rules = ctx.validation_rules();
        let mut records = Vec::new();
        let mut first_error = None;
        for (target, fetched) in targets.iter().zip(fetches) {
            match fetched {
                Ok(frame) => {
                    let found = self.scan_frame(&frame, &rules);
                    debug!("Frame {} yielded {} candidate(s)", target, found.len());
                    records.extend(found);
                }
                Err(e) => {
                    warn!("Frame {} skipped: {}", target, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        // Only report a failure when it cost us every result.
        match first_error {
            Some(e) if records.is_empty() => Err(e.into()),
            _ => Ok(records),
        }
    }
}
