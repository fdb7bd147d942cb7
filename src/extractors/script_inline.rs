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

// `name = "value"`, `name: 'value'` and `"name": "value"`. What counts is
// whether the value validates as a video resource, not the name.
static ASSIGNMENT_PATTERNS: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r#"["'][A-Za-z_$][\w$-]*["']\s*:\s*["']([^"'\s]+)["']"#,
        r#"[A-Za-z_$][\w$]*\s*[:=]\s*["']([^"'\s]+)["']"#,
    ])
    .expect("assignment patterns are valid")
});

/// Video URLs assigned to variables, object keys or attributes in inline
/// script and markup. The text is only pattern-matched, never evaluated.
pub struct ScriptInlineStrategy;

impl ScriptInlineStrategy {
    pub fn scan(&self, text: &str, base: &Url, rules: &ValidationRules) -> Vec<CandidateRecord> {
        ASSIGNMENT_PATTERNS
            .scan(text)
            .filter_map(|m| candidate_from_match(m.value, base, ExtractionMethod::JavaScript, rules))
            .collect()
    }
}

#[async_trait]
impl Strategy for ScriptInlineStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ScriptInline
    }

    async fn discover(
        &self,
        page: &FetchedPage,
        ctx: &ExtractionContext,
    ) -> Result<Vec<CandidateRecord>, StrategyError> {
        Ok(self.scan(&page.body, &page.url, &ctx.validation_rules()))
    }
}
