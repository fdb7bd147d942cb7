//! Progress vocabulary for shells that wrap an extraction.
//!
//! The engine itself never emits events; a caller turns an extraction result
//! into this sequence and serializes it however its transport needs.

use crate::core::{CandidateRecord, ContainerFormat, ExtractionMethod};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExtractionEvent {
    Started {
        url: String,
        message: String,
    },
    Info {
        source_count: usize,
        quality: u32,
        message: String,
    },
    Completed {
        url: String,
        quality: u32,
        format: ContainerFormat,
        method: ExtractionMethod,
    },
    Error {
        message: String,
    },
}

#[derive(Serialize)]
struct TimestampedEvent<'a> {
    #[serde(flatten)]
    event: &'a ExtractionEvent,
    timestamp: f64,
}

impl ExtractionEvent {
    pub fn started(url: &str) -> Self {
        ExtractionEvent::Started {
            url: url.to_string(),
            message: format!("Starting extraction for: {url}"),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ExtractionEvent::Error {
            message: message.into(),
        }
    }

    /// The events describing a finished extraction: `info` then `completed`
    /// for the top-ranked candidate, or a single `error` when nothing was found.
    pub fn for_result(candidates: &[CandidateRecord]) -> Vec<Self> {
        let Some(best) = candidates.first() else {
            return vec![Self::error("No video sources found")];
        };

        let quality = if best.quality > 0 {
            format!("{}p", best.quality)
        } else {
            "unknown".to_string()
        };

        vec![
            ExtractionEvent::Info {
                source_count: candidates.len(),
                quality: best.quality,
                message: format!(
                    "Found {} source(s), best quality {}",
                    candidates.len(),
                    quality
                ),
            },
            ExtractionEvent::Completed {
                url: best.url.clone(),
                quality: best.quality,
                format: best.format,
                method: best.method,
            },
        ]
    }

    /// One JSON object with a unix `timestamp`, no trailing newline.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();

        serde_json::to_string(&TimestampedEvent {
            event: self,
            timestamp,
        })
    }
}
