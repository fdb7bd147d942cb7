use regex::Regex;

/// A group of regexes scanned as one leftmost-first pass, so matches come out
/// in the order they occur in the text no matter which pattern found them.
///
/// Every pattern must contain exactly one capturing group; capture group
/// `i + 1` of the combined regex then belongs to pattern `i`.
#[derive(Debug)]
pub struct PatternSet {
    combined: Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternMatch<'t> {
    /// Index of the pattern that matched.
    pub pattern: usize,
    /// Text of the pattern's capture group.
    pub value: &'t str,
    /// Byte offset of the whole match in the scanned text.
    pub start: usize,
}

impl PatternSet {
    /// Case-insensitive set built from `patterns`, in priority order.
    pub fn new(patterns: &[&str]) -> Result<Self, regex::Error> {
        let alternatives: Vec<String> = patterns.iter().map(|p| format!("(?:{p})")).collect();
        let combined = Regex::new(&format!("(?i){}", alternatives.join("|")))?;

        debug_assert_eq!(
            combined.captures_len(),
            patterns.len() + 1,
            "each pattern needs exactly one capture group"
        );

        Ok(Self { combined })
    }

    pub fn scan<'s, 't>(&'s self, text: &'t str) -> impl Iterator<Item = PatternMatch<'t>> + 's
    where
        't: 's,
    {
        self.combined.captures_iter(text).filter_map(|caps| {
            let start = caps.get(0)?.start();
            caps.iter()
                .enumerate()
                .skip(1)
                .find_map(|(group, m)| m.map(|m| (group - 1, m)))
                .map(|(pattern, m)| PatternMatch {
                    pattern,
                    value: m.as_str(),
                    start,
                })
        })
    }
}
