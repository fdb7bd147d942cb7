use crate::config::Config;
use crate::core::FetchError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// What kind of request the browser would be making. Only changes headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFlavor {
    Document,
    Frame,
    Xhr,
}

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions<'a> {
    pub referrer: Option<&'a Url>,
    pub timeout: Duration,
    pub flavor: RequestFlavor,
}

/// Body and status of a successful GET. `url` is the URL that was requested,
/// which is the base for any relative locator found in `body`.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub status: StatusCode,
    pub body: String,
}

/// HTTP client with a consistent browser identity.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    accept_language: String,
}

impl Fetcher {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            accept_language: config.accept_language.clone(),
        })
    }

    pub async fn fetch(
        &self,
        target: &Url,
        referrer: Option<&Url>,
        timeout: Duration,
    ) -> Result<FetchedPage, FetchError> {
        self.fetch_with(
            target,
            FetchOptions {
                referrer,
                timeout,
                flavor: RequestFlavor::Document,
            },
        )
        .await
    }

    pub async fn fetch_with(
        &self,
        target: &Url,
        options: FetchOptions<'_>,
    ) -> Result<FetchedPage, FetchError> {
        let headers = self.headers_for(options.flavor, options.referrer);

        debug!("GET {} ({:?}, timeout {:?})", target, options.flavor, options.timeout);
        let response = self
            .client
            .get(target.clone())
            .headers(headers)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(target.as_str(), options.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: target.to_string(),
                status,
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: target.to_string(),
                    timeout: options.timeout,
                }
            } else {
                FetchError::Body {
                    url: target.to_string(),
                    source: e,
                }
            }
        })?;

        debug!("GET {} -> {} ({} bytes)", target, status, body.len());

        Ok(FetchedPage {
            url: target.clone(),
            status,
            body,
        })
    }

    fn headers_for(&self, flavor: RequestFlavor, referrer: Option<&Url>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&self.accept_language)
                .unwrap_or_else(|_| HeaderValue::from_static("en-US,en;q=0.9")),
        );
        headers.insert("Accept-Encoding", HeaderValue::from_static("identity"));
        headers.insert("Connection", HeaderValue::from_static("keep-alive"));

        match flavor {
            RequestFlavor::Document | RequestFlavor::Frame => {
                headers.insert(
                    ACCEPT,
                    HeaderValue::from_static(
                        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
                    ),
                );
                headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
                headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
                if flavor == RequestFlavor::Frame {
                    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("iframe"));
                    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("cross-site"));
                } else {
                    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
                    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("none"));
                    headers.insert("Sec-Fetch-User", HeaderValue::from_static("?1"));
                    headers.insert("Cache-Control", HeaderValue::from_static("max-age=0"));
                }
            }
            RequestFlavor::Xhr => {
                headers.insert(
                    ACCEPT,
                    HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
                );
                headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
                headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("empty"));
                headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("cors"));
                headers.insert("Sec-Fetch-Site", HeaderValue::from_static("same-origin"));
            }
        }

        if let Some(referrer) = referrer {
            if let Ok(value) = HeaderValue::from_str(referrer.as_str()) {
                headers.insert(REFERER, value);
            }
        }

        headers
    }
}

/// Resolve a locator found in a document against the document's own URL.
///
/// Handles absolute, protocol-relative (`//host/x`, inherits the base scheme),
/// root-relative (`/x`) and path-relative locators. Anything that does not end
/// up as http(s) is dropped.
pub fn resolve_locator(base: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let resolved = base.join(raw).ok()?;
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://site.example.com/watch/movie-1?lang=en").unwrap()
    }

    #[test]
    fn test_resolve_absolute() {
        let url = resolve_locator(&base(), "https://cdn.example.com/a.mp4").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/a.mp4");
    }

    #[test]
    fn test_resolve_protocol_relative() {
        let url = resolve_locator(&base(), "//cdn.example.com/a.m3u8").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/a.m3u8");

        let http_base = Url::parse("http://127.0.0.1:8080/page").unwrap();
        let url = resolve_locator(&http_base, "//cdn.example.com/a.m3u8").unwrap();
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn test_resolve_root_and_path_relative() {
        let root = resolve_locator(&base(), "/embed/123").unwrap();
        assert_eq!(root.as_str(), "https://site.example.com/embed/123");

        let relative = resolve_locator(&base(), "hls/master.m3u8").unwrap();
        assert_eq!(relative.as_str(), "https://site.example.com/watch/hls/master.m3u8");
    }

    #[test]
    fn test_resolve_rejects_non_http() {
        assert!(resolve_locator(&base(), "javascript:void(0)").is_none());
        assert!(resolve_locator(&base(), "data:video/mp4;base64,AAAA").is_none());
        assert!(resolve_locator(&base(), "   ").is_none());
    }

    #[test]
    fn test_fetcher_builds_from_default_config() {
        let fetcher = Fetcher::new(&Config::default()).unwrap();
        let referrer = base();
        let headers = fetcher.headers_for(RequestFlavor::Xhr, Some(&referrer));
        assert_eq!(headers.get("X-Requested-With").unwrap(), "XMLHttpRequest");
        assert_eq!(headers.get(REFERER).unwrap(), referrer.as_str());

        let headers = fetcher.headers_for(RequestFlavor::Document, None);
        assert!(headers.get(REFERER).is_none());
        assert!(headers.get("X-Requested-With").is_none());
    }
}
