use chardetng::EncodingDetector;
use chrono::{DateTime, Utc};
use encoding_rs::Encoding;
use scraper::{Html, Selector};
use url::Url;

use crate::Platform;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PageError {
    #[error("failed to decode bytes with {encoding}")]
    Decode { encoding: String },
    #[error("invalid page url {url:?}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("page url unknown: no url given and no canonical link in the document")]
    MissingUrl,
}

/// A parsed HTML snapshot of a platform page together with where and when it
/// was captured.
pub struct PageDocument {
    html: Html,
    url: Url,
    captured_at: DateTime<Utc>,
    encoding_label: String,
}

impl PageDocument {
    pub fn parse(html: &str, url: &str) -> Result<Self, PageError> {
        let url = parse_url(url)?;
        Ok(Self {
            html: Html::parse_document(html),
            url,
            captured_at: Utc::now(),
            encoding_label: "UTF-8".to_string(),
        })
    }

    /// Decode raw bytes (BOM, then Content-Type charset, then detection) and
    /// parse them. Without `url`, the document's canonical link is used.
    pub fn from_bytes(
        bytes: &[u8],
        content_type: Option<&str>,
        url: Option<&str>,
    ) -> Result<Self, PageError> {
        let (text, encoding) = decode_bytes(bytes, content_type)?;
        let html = Html::parse_document(&text);
        let url = match url {
            Some(raw) => parse_url(raw)?,
            None => discover_url(&html).ok_or(PageError::MissingUrl)?,
        };
        Ok(Self {
            html,
            url,
            captured_at: Utc::now(),
            encoding_label: encoding.name().to_string(),
        })
    }

    /// Overrides the capture instant used to resolve relative timestamps.
    pub fn with_captured_at(mut self, captured_at: DateTime<Utc>) -> Self {
        self.captured_at = captured_at;
        self
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn encoding_label(&self) -> &str {
        &self.encoding_label
    }

    pub fn platform(&self) -> Option<Platform> {
        Platform::detect(&self.url)
    }

    /// Resolve `reference` against the page url. Fragments, `javascript:`,
    /// `data:` and `blob:` references yield `None`.
    pub fn resolve_url(&self, reference: &str) -> Option<Url> {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return None;
        }
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with('#')
            || lower.starts_with("javascript:")
            || lower.starts_with("data:")
            || lower.starts_with("blob:")
        {
            return None;
        }
        let url = match Url::parse(trimmed) {
            Ok(url) => url,
            Err(_) => self.url.join(trimmed).ok()?,
        };
        matches!(url.scheme(), "http" | "https").then_some(url)
    }
}

fn parse_url(raw: &str) -> Result<Url, PageError> {
    Url::parse(raw.trim()).map_err(|err| PageError::InvalidUrl {
        url: raw.to_string(),
        message: err.to_string(),
    })
}

fn discover_url(html: &Html) -> Option<Url> {
    const CANDIDATES: [(&str, &str); 2] = [
        ("link[rel='canonical']", "href"),
        ("meta[property='og:url']", "content"),
    ];
    CANDIDATES.iter().find_map(|(css, attr)| {
        let selector = Selector::parse(css).ok()?;
        html.select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .find_map(|value| Url::parse(value.trim()).ok())
    })
}

fn decode_bytes(
    bytes: &[u8],
    content_type: Option<&str>,
) -> Result<(String, &'static Encoding), PageError> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(label) = content_type.and_then(extract_charset) {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, encoding);
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    decode_with(bytes, encoding)
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim_matches([' ', '"', '\'']).to_string())
    })
}

fn decode_with(
    bytes: &[u8],
    encoding: &'static Encoding,
) -> Result<(String, &'static Encoding), PageError> {
    let (text, actual, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(PageError::Decode {
            encoding: actual.name().to_string(),
        });
    }
    Ok((text.into_owned(), actual))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_header_drives_decoding() {
        let page = PageDocument::from_bytes(
            b"<p>caf\xe9</p>",
            Some("text/html; charset=ISO-8859-1"),
            Some("https://www.facebook.com/"),
        )
        .unwrap();
        assert!(page.html().root_element().html().contains("café"));
        assert!(page.encoding_label().eq_ignore_ascii_case("windows-1252"));
    }

    #[test]
    fn canonical_link_supplies_missing_url() {
        let html = br#"<html><head><link rel="canonical" href="https://www.reddit.com/r/rust/"></head><body></body></html>"#;
        let page = PageDocument::from_bytes(html, None, None).unwrap();
        assert_eq!(page.url().as_str(), "https://www.reddit.com/r/rust/");
        assert_eq!(page.platform(), Some(Platform::Reddit));
    }

    #[test]
    fn missing_url_is_reported() {
        let err = PageDocument::from_bytes(b"<p>x</p>", None, None).err();
        assert_eq!(err, Some(PageError::MissingUrl));
    }

    #[test]
    fn resolves_relative_and_rejects_non_http() {
        let page = PageDocument::parse("<p></p>", "https://x.com/home").unwrap();
        assert_eq!(
            page.resolve_url("/jack/status/20").map(String::from),
            Some("https://x.com/jack/status/20".to_string())
        );
        assert_eq!(page.resolve_url("#top"), None);
        assert_eq!(page.resolve_url("blob:https://x.com/abc"), None);
        assert_eq!(page.resolve_url("data:image/png;base64,AAAA"), None);
        assert_eq!(page.resolve_url("javascript:void(0)"), None);
    }
}
