use crate::core::{ContainerFormat, DownloadRequest};
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

static TITLE_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        r"(?is)<title[^>]*>([^<]+)</title>",
        r"(?is)<h1[^>]*>([^<]+)</h1>",
        r#"(?is)<meta[^>]*property=["']og:title["'][^>]*content=["']([^"']+)["']"#,
    ]
    .map(|p| Regex::new(p).expect("title regex is valid"))
});

pub fn sanitize_filename(filename: &str) -> String {
    // Remove or replace characters that are invalid in filenames
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            '/' | '\\' => '-',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// File extension a download of `format` should be saved under.
pub fn extension_for(format: ContainerFormat) -> &'static str {
    format.extension().unwrap_or("mp4")
}

pub fn generate_output_filename(template: &str, request: &DownloadRequest) -> PathBuf {
    let title = sanitize_filename(&request.title);
    let title = if title.is_empty() { "video".to_string() } else { title };

    let filename = template
        .replace("%(title)s", &title)
        .replace("%(format)s", request.format.as_str())
        .replace("%(ext)s", extension_for(request.format));

    PathBuf::from(filename)
}

/// Undo the escaping page text commonly wraps URLs in: JSON-escaped slashes,
/// `\u` escapes for `/` and `&`, HTML `&amp;`, and fully percent-encoded
/// absolute URLs.
pub fn clean_url(raw: &str) -> String {
    let cleaned = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .replace("\\/", "/")
        .replace("\\u002F", "/")
        .replace("\\u002f", "/")
        .replace("\\u0026", "&")
        .replace("&amp;", "&");

    let lower = cleaned.to_ascii_lowercase();
    if lower.starts_with("http%3a") || lower.starts_with("https%3a") {
        if let Ok(decoded) = urlencoding::decode(&cleaned) {
            return decoded.into_owned();
        }
    }

    cleaned
}

/// Best-effort page title: `<title>`, then the first `<h1>`, then `og:title`.
pub fn extract_page_title(html: &str) -> Option<String> {
    TITLE_PATTERNS.iter().find_map(|re| {
        re.captures(html)
            .and_then(|c| c.get(1))
            .map(|m| decode_html_entities(m.as_str().trim()))
            .filter(|t| !t.is_empty())
    })
}

fn decode_html_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("hello/world"), "hello-world");
        assert_eq!(sanitize_filename("test<>file"), "test__file");
        assert_eq!(sanitize_filename("normal_file.mp4"), "normal_file.mp4");
    }

    #[test]
    fn test_clean_url() {
        assert_eq!(
            clean_url(r"https:\/\/cdn.example.com\/v\/a.mp4"),
            "https://cdn.example.com/v/a.mp4"
        );
        assert_eq!(
            clean_url(r"https://cdn.example.com/a.m3u8?x=1&y=2"),
            "https://cdn.example.com/a.m3u8?x=1&y=2"
        );
        assert_eq!(
            clean_url("https%3A%2F%2Fcdn.example.com%2Fa.mp4"),
            "https://cdn.example.com/a.mp4"
        );
        assert_eq!(clean_url("'/v/a.mp4?a=1&amp;b=2'"), "/v/a.mp4?a=1&b=2");
    }

    #[test]
    fn test_extract_page_title() {
        let html = "<html><head><TITLE>\n  Big Buck  Bunny &amp; Friends </TITLE></head></html>";
        assert_eq!(extract_page_title(html).as_deref(), Some("Big Buck Bunny & Friends"));

        let html = r#"<meta property="og:title" content="Sintel"><h1>Heading</h1>"#;
        assert_eq!(extract_page_title(html).as_deref(), Some("Heading"));

        let html = r#"<meta property="og:title" content="Sintel">"#;
        assert_eq!(extract_page_title(html).as_deref(), Some("Sintel"));
        assert_eq!(extract_page_title("<title>   </title>"), None);
    }

    #[test]
    fn test_output_filename_uses_format_extension() {
        let request = DownloadRequest {
            url: "https://cdn.example.com/master.m3u8".to_string(),
            format: ContainerFormat::Hls,
            title: "Movie: The Sequel".to_string(),
        };
        assert_eq!(
            generate_output_filename("%(title)s.%(ext)s", &request),
            PathBuf::from("Movie_ The Sequel.m3u8")
        );

        let unknown = DownloadRequest {
            format: ContainerFormat::Unknown,
            title: "  ".to_string(),
            ..request
        };
        assert_eq!(
            generate_output_filename("%(title)s.%(ext)s", &unknown),
            PathBuf::from("video.mp4")
        );
    }
}
