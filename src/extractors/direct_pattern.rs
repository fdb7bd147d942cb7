use crate::core::fetcher::FetchedPage;
use crate::core::validator::ValidationRules;
use crate::core::{
    CandidateRecord, ExtractionContext, ExtractionMethod, Strategy, StrategyError, StrategyKind,
};
use crate::extractors::candidate_from_match;
use crate::extractors::patterns::PatternSet;
use async_trait::async_trait;
use std::sync::LazyLock;
use url::Url;

// Extension patterns must end the token, so `clip.mp4.jpg` is never cut down
// to `clip.mp4`. The trailing delimiter is consumed but not captured.
static DIRECT_PATTERNS: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r#"(https?://[^"'\s<>]+\.(?:mp4|avi|mkv|mov|wmv|flv|webm|m4v)(?:\?[^"'\s<>]*)?)(?:["'\s<>]|$)"#,
        r#"(https?://[^"'\s<>]+/videoplayback\?[^"'\s<>]*)"#,
        r#"(https?://[^"'\s<>]+\.m3u8(?:\?[^"'\s<>]*)?)(?:["'\s<>]|$)"#,
        r#"(https?://[^"'\s<>]+\.mpd(?:\?[^"'\s<>]*)?)(?:["'\s<>]|$)"#,
        r#"(https?://[^"'\s<>]*(?:videoplayback|manifest|playlist|/video/|player|stream)[^"'\s<>]*)"#,
    ])
    .expect("direct patterns are valid")
});

/// Literal absolute URLs in the page that end in a video or manifest
/// extension or point at a streaming endpoint.
pub struct DirectPatternStrategy;

impl DirectPatternStrategy {
    pub fn scan(&self, text: &str, base: &Url, rules: &ValidationRules) -> Vec<CandidateRecord> {
        DIRECT_PATTERNS
            .scan(text)
            .filter_map(|m| candidate_from_match(m.value, base, ExtractionMethod::DirectPattern, rules))
            .collect()
    }
}

#[async_trait]
impl Strategy for DirectPatternStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DirectPattern
    }

    async fn discover(
        &self,
        page: &FetchedPage,
        ctx: &ExtractionContext,
    ) -> Result<Vec<CandidateRecord>, StrategyError> {
        Ok(self.scan(&page.body, &page.url, &ctx.validation_rules()))
    }
}
