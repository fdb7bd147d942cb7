use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Title used until something better is known about the page.
pub const PLACEHOLDER_TITLE: &str = "Extracted Video";

/// Container or manifest type of a candidate, derived from its URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Mp4,
    Avi,
    Mkv,
    Mov,
    Wmv,
    Flv,
    Webm,
    M4v,
    Hls,
    Dash,
    #[default]
    Unknown,
}

impl ContainerFormat {
    /// Every known format paired with the file extension that identifies it.
    pub const TABLE: [(ContainerFormat, &'static str); 10] = [
        (ContainerFormat::Mp4, "mp4"),
        (ContainerFormat::Avi, "avi"),
        (ContainerFormat::Mkv, "mkv"),
        (ContainerFormat::Mov, "mov"),
        (ContainerFormat::Wmv, "wmv"),
        (ContainerFormat::Flv, "flv"),
        (ContainerFormat::Webm, "webm"),
        (ContainerFormat::M4v, "m4v"),
        (ContainerFormat::Hls, "m3u8"),
        (ContainerFormat::Dash, "mpd"),
    ];

    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::TABLE
            .iter()
            .find(|(_, known)| *known == ext)
            .map(|(format, _)| *format)
            .unwrap_or(ContainerFormat::Unknown)
    }

    /// File extension for this format; `None` for [`ContainerFormat::Unknown`].
    pub fn extension(&self) -> Option<&'static str> {
        Self::TABLE
            .iter()
            .find(|(format, _)| format == self)
            .map(|(_, ext)| *ext)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Avi => "avi",
            ContainerFormat::Mkv => "mkv",
            ContainerFormat::Mov => "mov",
            ContainerFormat::Wmv => "wmv",
            ContainerFormat::Flv => "flv",
            ContainerFormat::Webm => "webm",
            ContainerFormat::M4v => "m4v",
            ContainerFormat::Hls => "hls",
            ContainerFormat::Dash => "dash",
            ContainerFormat::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which discovery path produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractionMethod {
    #[serde(rename = "direct_pattern")]
    DirectPattern,
    #[serde(rename = "javascript_extraction")]
    JavaScript,
    #[serde(rename = "streaming_pattern")]
    StreamingPattern,
    #[serde(rename = "base64_extraction")]
    Base64,
    #[serde(rename = "iframe_extraction")]
    Iframe,
    #[serde(rename = "api_extraction")]
    Api,
    #[serde(rename = "yt-dlp")]
    External,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::DirectPattern => "direct_pattern",
            ExtractionMethod::JavaScript => "javascript_extraction",
            ExtractionMethod::StreamingPattern => "streaming_pattern",
            ExtractionMethod::Base64 => "base64_extraction",
            ExtractionMethod::Iframe => "iframe_extraction",
            ExtractionMethod::Api => "api_extraction",
            ExtractionMethod::External => "yt-dlp",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discovered video resource. `url` is its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub url: String,
    /// Vertical resolution in pixels, `0` when unknown.
    #[serde(default, deserialize_with = "lenient_quality")]
    pub quality: u32,
    #[serde(default)]
    pub format: ContainerFormat,
    pub method: ExtractionMethod,
    #[serde(default = "placeholder_title")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcodec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acodec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
}

impl CandidateRecord {
    /// Build a record from a resolved URL, classifying it from the string alone.
    pub fn from_url(url: impl Into<String>, method: ExtractionMethod) -> Self {
        let url = url.into();
        Self {
            quality: crate::core::validator::estimate_quality(&url),
            format: crate::core::validator::classify_format(&url),
            url,
            method,
            title: placeholder_title(),
            filesize: None,
            duration: None,
            fps: None,
            vcodec: None,
            acodec: None,
            uploader: None,
        }
    }

    pub fn has_placeholder_title(&self) -> bool {
        self.title.is_empty() || self.title == PLACEHOLDER_TITLE
    }

    pub fn download_request(&self) -> DownloadRequest {
        DownloadRequest {
            url: self.url.clone(),
            format: self.format,
            title: self.title.clone(),
        }
    }
}

/// What the download collaborator needs from the top-ranked candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    pub format: ContainerFormat,
    pub title: String,
}

fn placeholder_title() -> String {
    PLACEHOLDER_TITLE.to_string()
}

/// Accepts any JSON value for `quality`; anything that is not a non-negative
/// integer becomes `0`.
fn lenient_quality<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(quality_from_json).unwrap_or(0))
}

/// Normalize an untyped quality value (e.g. a yt-dlp `height`).
pub fn quality_from_json(value: &serde_json::Value) -> u32 {
    value
        .as_u64()
        .and_then(|q| u32::try_from(q).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_extension_table_round_trips() {
        for (format, ext) in ContainerFormat::TABLE {
            assert_eq!(ContainerFormat::from_extension(ext), format);
            assert_eq!(format.extension(), Some(ext));
        }
        assert_eq!(ContainerFormat::from_extension(".M3U8"), ContainerFormat::Hls);
        assert_eq!(ContainerFormat::from_extension("gif"), ContainerFormat::Unknown);
        assert_eq!(ContainerFormat::Unknown.extension(), None);
    }

    #[test]
    fn test_method_serializes_to_provenance_tag() {
        let tag = serde_json::to_value(ExtractionMethod::Iframe).unwrap();
        assert_eq!(tag, json!("iframe_extraction"));
        assert_eq!(ExtractionMethod::External.to_string(), "yt-dlp");
    }

    #[test]
    fn test_malformed_quality_deserializes_to_zero() {
        let cases = [
            json!(null),
            json!("720"),
            json!(12.5),
            json!(-480),
            json!([1080]),
        ];
        for quality in cases {
            let record: CandidateRecord = serde_json::from_value(json!({
                "url": "https://cdn.example.com/a.mp4",
                "quality": quality,
                "method": "direct_pattern",
            }))
            .unwrap();
            assert_eq!(record.quality, 0, "quality input {quality}");
        }

        let missing: CandidateRecord = serde_json::from_value(json!({
            "url": "https://cdn.example.com/a.mp4",
            "method": "yt-dlp",
        }))
        .unwrap();
        assert_eq!(missing.quality, 0);
        assert_eq!(missing.title, PLACEHOLDER_TITLE);
        assert_eq!(missing.format, ContainerFormat::Unknown);
    }

    #[test]
    fn test_from_url_classifies() {
        let record = CandidateRecord::from_url(
            "https://cdn.example.com/video_720p.mp4?x=1",
            ExtractionMethod::DirectPattern,
        );
        assert_eq!(record.quality, 720);
        assert_eq!(record.format, ContainerFormat::Mp4);
        assert!(record.has_placeholder_title());

        let request = record.download_request();
        assert_eq!(request.url, record.url);
        assert_eq!(request.format, ContainerFormat::Mp4);
    }
}
