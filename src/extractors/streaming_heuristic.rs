use crate::core::fetcher::FetchedPage;
use crate::core::validator::ValidationRules;
use crate::core::{
    CandidateRecord, DecodeError, ExtractionContext, ExtractionMethod, Strategy, StrategyError,
    StrategyKind,
};
use crate::extractors::candidate_from_match;
use crate::extractors::patterns::PatternSet;
use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

const ATOB_PATTERN: usize = 2;

static STREAMING_PATTERNS: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r#"data-src\s*=\s*["']([^"']*(?:mp4|m3u8|mpd)[^"']*)["']"#,
        r#"data-video\s*=\s*["']([^"']+)["']"#,
        r#"atob\(\s*["']([A-Za-z0-9+/=_-]+)["']\s*\)"#,
        r#"jwplayer\([^)]*\)\.setup\(\s*\{[^}]*?file\s*:\s*["']([^"']+)["']"#,
        r#"player\.setup\(\s*\{[^}]*?file\s*:\s*["']([^"']+)["']"#,
        r#"new\s+Plyr\([^,]*,\s*\{[^}]*?sources\s*:\s*\[\s*\{[^}]*?src\s*:\s*["']([^"']+)["']"#,
        r#"(https?://[^"'\s<>]+\.(?:mp4|avi|mkv|mov|wmv|flv|webm|m4v)(?:\?[^"'\s<>]*)?)(?:["'\s<>]|$)"#,
        r#"([^"'\s<>()=,]+\.m3u8(?:\?[^"'\s<>]*)?)(?:["'\s<>),;]|$)"#,
        r#"([^"'\s<>()=,]+\.mpd(?:\?[^"'\s<>]*)?)(?:["'\s<>),;]|$)"#,
    ])
    .expect("streaming patterns are valid")
});

/// Player-config idioms, data attributes, manifest suffixes and base64
/// payloads handed to `atob`.
pub struct StreamingHeuristicStrategy;

impl StreamingHeuristicStrategy {
    pub fn scan(&self, text: &str, base: &Url, rules: &ValidationRules) -> Vec<CandidateRecord> {
        STREAMING_PATTERNS
            .scan(text)
            .filter_map(|m| {
                if m.pattern == ATOB_PATTERN {
                    match decode_obfuscated(m.value) {
                        Ok(decoded) => {
                            candidate_from_match(&decoded, base, ExtractionMethod::Base64, rules)
                        }
                        Err(e) => {
                            debug!("Dropping atob payload at byte {}: {}", m.start, e);
                            None
                        }
                    }
                } else {
                    candidate_from_match(m.value, base, ExtractionMethod::StreamingPattern, rules)
                }
            })
            .collect()
    }
}

/// Decode a base64 payload as found in `atob("...")`, accepting the standard
/// and URL-safe alphabets with or without padding.
pub fn decode_obfuscated(payload: &str) -> Result<String, DecodeError> {
    let payload = payload.trim();
    let unpadded = payload.trim_end_matches('=');

    let bytes = STANDARD
        .decode(payload)
        .or_else(|_| URL_SAFE.decode(payload))
        .or_else(|_| STANDARD_NO_PAD.decode(unpadded))
        .or_else(|_| URL_SAFE_NO_PAD.decode(unpadded))?;

    Ok(String::from_utf8(bytes)?)
}

#[async_trait]
impl Strategy for StreamingHeuristicStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::StreamingHeuristic
    }

    async fn discover(
        &self,
        page: &FetchedPage,
        ctx: &ExtractionContext,
    ) -> Result<Vec<CandidateRecord>, StrategyError> {
        Ok(self.scan(&page.body, &page.url, &ctx.validation_rules()))
    }
}
