//! Plausibility checks and coarse classification of candidate URLs.
//!
//! Everything here works on the URL string alone; nothing is fetched.

use crate::core::ContainerFormat;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

pub const DEFAULT_MIN_URL_LENGTH: usize = 10;

/// Substrings that mark streaming endpoints without a file extension.
pub const STREAMING_KEYWORDS: [&str; 6] = [
    "videoplayback",
    "manifest",
    "playlist",
    "stream",
    "/video/",
    "player",
];

const TRACKING_DOMAINS: [&str; 7] = [
    "google.com",
    "facebook.com",
    "twitter.com",
    "instagram.com",
    "doubleclick.net",
    "google-analytics.com",
    "googletagmanager.com",
];

const TRACKING_LABELS: [&str; 3] = ["ads", "analytics", "tracking"];

static VIDEO_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\.(mp4|avi|mkv|mov|wmv|flv|webm|m4v|m3u8|mpd)(?:$|[?#&/;"'\s])"#)
        .expect("video extension regex is valid")
});

static ASSET_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(?:js|css|png|jpe?g|gif|svg|ico|woff2?|ttf)(?:[?#]|$)")
        .expect("asset extension regex is valid")
});

static QUALITY_P_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\D)(\d{3,4})p(?:\D|$)").expect("quality p-token regex is valid")
});

static QUALITY_DIMENSIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\D)\d{3,4}x(\d{3,4})(?:\D|$)").expect("quality dimensions regex is valid")
});

static QUALITY_BARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\D)(720|1080|1440|2160)(?:\D|$)").expect("bare quality regex is valid")
});

static QUALITY_KEYWORDS: LazyLock<[(Regex, u32); 3]> = LazyLock::new(|| {
    let keyword = |words: &str| {
        Regex::new(&format!(r"(?:^|[^a-z0-9])(?:{words})(?:[^a-z0-9]|$)"))
            .expect("quality keyword regex is valid")
    };
    [
        (keyword("4k|uhd"), 2160),
        (keyword("hd|high"), 720),
        (keyword("sd|low"), 480),
    ]
});

/// Which filters apply when judging a candidate. Strategies that read page
/// text use the defaults; the external extractor trusts its own output and
/// drops the video-signal requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    pub min_length: usize,
    pub reject_asset_extensions: bool,
    pub reject_tracking_hosts: bool,
    pub require_video_signal: bool,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_URL_LENGTH,
            reject_asset_extensions: true,
            reject_tracking_hosts: true,
            require_video_signal: true,
        }
    }
}

impl ValidationRules {
    pub fn with_min_length(min_length: usize) -> Self {
        Self {
            min_length,
            ..Self::default()
        }
    }

    pub fn permissive(min_length: usize) -> Self {
        Self {
            min_length,
            reject_asset_extensions: false,
            reject_tracking_hosts: false,
            require_video_signal: false,
        }
    }
}

pub fn is_valid_candidate(url: &str) -> bool {
    is_valid_candidate_with(url, &ValidationRules::default())
}

pub fn is_valid_candidate_with(url: &str, rules: &ValidationRules) -> bool {
    if url.len() < rules.min_length {
        return false;
    }

    let lower = url.to_ascii_lowercase();
    if lower.starts_with("data:") || lower.starts_with("blob:") {
        return false;
    }

    let parsed = Url::parse(url).ok();
    if let Some(parsed) = &parsed {
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
    }

    if rules.reject_asset_extensions && ASSET_EXTENSION.is_match(&lower) {
        return false;
    }

    if rules.reject_tracking_hosts {
        if let Some(host) = parsed.as_ref().and_then(|u| u.host_str()) {
            if is_tracking_host(host) {
                return false;
            }
        }
    }

    if rules.require_video_signal {
        return has_video_extension(&lower) || has_streaming_keyword(&lower);
    }

    true
}

pub fn has_video_extension(url: &str) -> bool {
    VIDEO_EXTENSION.is_match(url)
}

pub fn has_streaming_keyword(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    STREAMING_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn is_tracking_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let known = TRACKING_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")));

    known
        || host
            .split(['.', '-'])
            .any(|label| TRACKING_LABELS.contains(&label))
}

/// Path and query of `url`, or the whole string when it does not parse.
fn quality_haystack(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => {
            let mut target = parsed.path().to_string();
            if let Some(query) = parsed.query() {
                target.push('?');
                target.push_str(query);
            }
            target.to_ascii_lowercase()
        }
        Err(_) => url.to_ascii_lowercase(),
    }
}

/// Estimate vertical resolution from the URL string. `0` when nothing matches.
pub fn estimate_quality(url: &str) -> u32 {
    let target = quality_haystack(url);

    let numeric = [&*QUALITY_P_TOKEN, &*QUALITY_DIMENSIONS, &*QUALITY_BARE];
    for re in numeric {
        if let Some(height) = re
            .captures(&target)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
        {
            return height;
        }
    }

    QUALITY_KEYWORDS
        .iter()
        .find(|(re, _)| re.is_match(&target))
        .map(|(_, quality)| *quality)
        .unwrap_or(0)
}

/// Classify by the path's file extension.
pub fn classify_format(url: &str) -> ContainerFormat {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    let last_segment = path.rsplit('/').next().unwrap_or_default();
    if let Some((_, ext)) = last_segment.rsplit_once('.') {
        let format = ContainerFormat::from_extension(ext);
        if format != ContainerFormat::Unknown {
            return format;
        }
    }

    VIDEO_EXTENSION
        .captures(&path)
        .and_then(|c| c.get(1))
        .map(|m| ContainerFormat::from_extension(m.as_str()))
        .unwrap_or(ContainerFormat::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_short_strings() {
        assert!(!is_valid_candidate("a.mp4"));
        assert!(!is_valid_candidate("/v/a.mp4"));
        assert!(is_valid_candidate("https://a.co/v.mp4"));
    }

    #[test]
    fn test_rejects_asset_extensions() {
        for url in [
            "https://cdn.example.com/player.js",
            "https://cdn.example.com/stream/style.css?v=2",
            "https://cdn.example.com/video/poster.jpg",
            "https://cdn.example.com/playlist/icon.svg",
            "https://cdn.example.com/stream/font.woff2",
        ] {
            assert!(!is_valid_candidate(url), "{url} should be rejected");
        }
    }

    #[test]
    fn test_rejects_tracking_hosts_and_inline_images() {
        assert!(!is_valid_candidate("https://www.facebook.com/video/123.mp4"));
        assert!(!is_valid_candidate("https://ads.example.net/stream/1.m3u8"));
        assert!(!is_valid_candidate("https://static-analytics.example.com/player/x"));
        assert!(!is_valid_candidate("data:image/png;base64,iVBORw0KGgoAAAANSUhEUg"));
        assert!(!is_valid_candidate("blob:https://example.com/4a5e-video"));
        assert!(is_valid_candidate("https://downloads.example.com/movie.mp4"));
    }

    #[test]
    fn test_accepts_video_extensions() {
        for (_, ext) in ContainerFormat::TABLE {
            let url = format!("https://media.example.org/files/clip.{ext}");
            assert!(is_valid_candidate(&url), "{url} should be accepted");
            let with_query = format!("https://media.example.org/files/clip.{ext}?token=abc");
            assert!(is_valid_candidate(&with_query), "{with_query} should be accepted");
        }
    }

    #[test]
    fn test_requires_extension_or_keyword() {
        assert!(!is_valid_candidate("https://example.com/about-us"));
        assert!(is_valid_candidate("https://example.com/videoplayback?id=1"));
        assert!(is_valid_candidate("https://example.com/live/stream/42"));
        assert!(is_valid_candidate("https://example.com/hls/manifest"));
    }

    #[test]
    fn test_permissive_rules_skip_signal_requirement() {
        let rules = ValidationRules::permissive(DEFAULT_MIN_URL_LENGTH);
        assert!(is_valid_candidate_with("https://rr3.example.net/abc?id=1", &rules));
        assert!(!is_valid_candidate_with("data:video/mp4;base64,AAAA", &rules));
        assert!(!is_valid_candidate_with("short", &rules));
    }

    #[test]
    fn test_estimate_quality_priority() {
        assert_eq!(estimate_quality("https://cdn.example.com/video_720p.mp4?x=1"), 720);
        assert_eq!(estimate_quality("https://cdn.example.com/1080p/hd/clip.mp4"), 1080);
        assert_eq!(estimate_quality("https://cdn.example.com/clip_1920x1080.mp4"), 1080);
        assert_eq!(estimate_quality("https://cdn.example.com/2160/clip.mp4"), 2160);
        assert_eq!(estimate_quality("https://cdn.example.com/uhd/clip.mp4"), 2160);
        assert_eq!(estimate_quality("https://cdn.example.com/clip_4k.mp4"), 2160);
        assert_eq!(estimate_quality("https://cdn.example.com/clip-hd.mp4"), 720);
        assert_eq!(estimate_quality("https://cdn.example.com/low/clip.mp4"), 480);
        assert_eq!(estimate_quality("https://cdn.example.com/clip.mp4"), 0);
    }

    #[test]
    fn test_estimate_quality_ignores_host_and_port() {
        assert_eq!(estimate_quality("http://127.0.0.1:1080/clip.mp4"), 0);
        assert_eq!(estimate_quality("https://hd.example.com/clip.mp4"), 0);
        assert_eq!(estimate_quality("https://example.com/highlights/clip.mp4"), 0);
    }

    #[test]
    fn test_classify_format() {
        assert_eq!(classify_format("https://a.com/x/master.m3u8?t=1"), ContainerFormat::Hls);
        assert_eq!(classify_format("https://a.com/x/manifest.mpd"), ContainerFormat::Dash);
        assert_eq!(classify_format("https://a.com/x/movie.MKV"), ContainerFormat::Mkv);
        assert_eq!(classify_format("https://a.com/hls/index.m3u8/seg"), ContainerFormat::Hls);
        assert_eq!(classify_format("https://a.com/videoplayback?mime=mp4"), ContainerFormat::Unknown);
        assert_eq!(classify_format("/relative/clip.webm"), ContainerFormat::Webm);
    }

    #[test]
    fn test_classify_format_round_trips_extension_table() {
        for (format, ext) in ContainerFormat::TABLE {
            let url = format!("https://cdn.example.com/path/file.{ext}");
            assert_eq!(classify_format(&url), format);
        }
    }
}
