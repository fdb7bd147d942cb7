use crate::core::CandidateRecord;
use std::collections::HashSet;

/// Merge strategy output into the final ranking.
///
/// Records are deduplicated by `url` (first occurrence wins, later duplicates
/// are dropped without merging metadata) and then stably sorted by `quality`,
/// highest first. Input order is strategy execution order, so among equal
/// qualities the earlier strategy's records stay first.
///
/// `quality` is a `u32` and cannot be absent or malformed by the time a record
/// gets here: producers build it with [`CandidateRecord::from_url`] or
/// [`quality_from_json`](crate::core::quality_from_json), and deserialization
/// maps anything else to `0`.
pub fn aggregate<I>(records: I) -> Vec<CandidateRecord>
where
    I: IntoIterator<Item = CandidateRecord>,
{
    let mut seen = HashSet::new();
    let mut unique: Vec<CandidateRecord> = records
        .into_iter()
        .filter(|record| seen.insert(record.url.clone()))
        .collect();

    // sort_by is stable
    unique.sort_by(|a, b| b.quality.cmp(&a.quality));
    unique
}
