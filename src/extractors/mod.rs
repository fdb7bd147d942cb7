//! The discovery strategies. Each one reads the primary page and turns what it
//! recognizes into [`CandidateRecord`]s; some follow up with secondary fetches.

pub mod direct_pattern;
pub mod endpoint_probe;
pub mod external;
pub mod frame_follow;
pub mod patterns;
pub mod script_inline;
pub mod streaming_heuristic;

pub use direct_pattern::DirectPatternStrategy;
pub use endpoint_probe::EndpointProbeStrategy;
pub use external::ExternalExtractorStrategy;
pub use frame_follow::FrameFollowStrategy;
pub use script_inline::ScriptInlineStrategy;
pub use streaming_heuristic::StreamingHeuristicStrategy;

use crate::core::fetcher::resolve_locator;
use crate::core::validator::{
    has_streaming_keyword, has_video_extension, is_valid_candidate_with, ValidationRules,
};
use crate::core::{CandidateRecord, ExtractionMethod, Strategy, StrategyKind};
use crate::utils::clean_url;
use tracing::debug;
use url::Url;

pub fn build_strategy(kind: StrategyKind) -> Box<dyn Strategy> {
    match kind {
        StrategyKind::DirectPattern => Box::new(DirectPatternStrategy),
        StrategyKind::ScriptInline => Box::new(ScriptInlineStrategy),
        StrategyKind::StreamingHeuristic => Box::new(StreamingHeuristicStrategy),
        StrategyKind::FrameFollow => Box::new(FrameFollowStrategy),
        StrategyKind::EndpointProbe => Box::new(EndpointProbeStrategy),
        StrategyKind::ExternalExtractor => Box::new(ExternalExtractorStrategy),
    }
}

/// Clean a matched string, resolve it against the document it came from and
/// keep it only if it still looks like a video resource.
pub(crate) fn candidate_from_match(
    raw: &str,
    base: &Url,
    method: ExtractionMethod,
    rules: &ValidationRules,
) -> Option<CandidateRecord> {
    let cleaned = clean_url(raw);

    // The video signal has to come from the matched text, not from whatever
    // the base URL contributes during resolution.
    if rules.require_video_signal
        && !(has_video_extension(&cleaned) || has_streaming_keyword(&cleaned))
    {
        return None;
    }

    let resolved = resolve_locator(base, &cleaned)?;

    if !is_valid_candidate_with(resolved.as_str(), rules) {
        debug!("Rejected {} ({})", resolved, method);
        return None;
    }

    Some(CandidateRecord::from_url(resolved.to_string(), method))
}

/// Whether a discovered sub-resource path mentions any of `keywords`.
pub(crate) fn mentions_any(target: &str, keywords: &[&str]) -> bool {
    let lower = target.to_ascii_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}
