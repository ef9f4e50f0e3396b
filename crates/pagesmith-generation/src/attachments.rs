//! Attachment previews
//!
//! Text-like data URIs are decoded and shown inline (truncated); everything else
//! is summarized by name, media type and a short reference. Remote URLs are
//! never fetched.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use pagesmith_utils::types::Attachment;

/// Characters of decoded attachment text included in the prompt
pub const ATTACHMENT_PREVIEW_CHARS: usize = 4_000;

const REFERENCE_CHARS: usize = 120;

/// A parsed `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub media_type: &'a str,
    pub base64: bool,
    pub payload: &'a str,
}

impl<'a> DataUri<'a> {
    /// Parse `data:[<media type>][;param...][;base64],<payload>`.
    #[must_use]
    pub fn parse(uri: &'a str) -> Option<Self> {
        let rest = uri.trim().strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        let mut params = header.split(';');
        let media_type = params.next().map(str::trim).unwrap_or_default();
        let base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

        Some(Self {
            media_type: if media_type.is_empty() {
                "text/plain"
            } else {
                media_type
            },
            base64,
            payload,
        })
    }

    /// Whether the media type is worth decoding as text.
    #[must_use]
    pub fn is_text(&self) -> bool {
        let media = self.media_type.to_ascii_lowercase();
        media.starts_with("text/")
            || matches!(
                media.as_str(),
                "application/json" | "application/xml" | "application/javascript"
            )
            || media.ends_with("+json")
            || media.ends_with("+xml")
    }

    /// Decoded payload bytes, `None` if base64 decoding fails.
    #[must_use]
    pub fn decode(&self) -> Option<Vec<u8>> {
        if self.base64 {
            BASE64.decode(self.payload.trim()).ok()
        } else {
            Some(self.payload.as_bytes().to_vec())
        }
    }

    /// Approximate decoded size in bytes without decoding.
    #[must_use]
    pub fn approx_size(&self) -> usize {
        if self.base64 {
            self.payload.trim().len() / 4 * 3
        } else {
            self.payload.len()
        }
    }
}

/// Truncate `text` to `limit` characters, marking the cut.
#[must_use]
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}\n... [truncated]", &text[..cut]),
        None => text.to_string(),
    }
}

fn short_reference(url: &str) -> String {
    match url.char_indices().nth(REFERENCE_CHARS) {
        Some((cut, _)) => format!("{}...", &url[..cut]),
        None => url.to_string(),
    }
}

/// Render one attachment for the prompt.
#[must_use]
pub fn render_attachment(attachment: &Attachment) -> String {
    let Some(uri) = DataUri::parse(&attachment.url) else {
        return format!(
            "- {} (linked): {}",
            attachment.name,
            short_reference(&attachment.url)
        );
    };

    if uri.is_text() {
        if let Some(text) = uri.decode().and_then(|bytes| String::from_utf8(bytes).ok()) {
            return format!(
                "- {} ({}):\n```\n{}\n```",
                attachment.name,
                uri.media_type,
                truncate_chars(&text, ATTACHMENT_PREVIEW_CHARS)
            );
        }
    }

    format!(
        "- {} ({}, about {} bytes, embedded; not shown)",
        attachment.name,
        uri.media_type,
        uri.approx_size()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(name: &str, url: &str) -> Attachment {
        Attachment {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_parse_base64_data_uri() {
        let uri = DataUri::parse("data:text/csv;base64,YSxiCjEsMgo=").unwrap();
        assert_eq!(uri.media_type, "text/csv");
        assert!(uri.base64);
        assert!(uri.is_text());
        assert_eq!(uri.decode().unwrap(), b"a,b\n1,2\n");
    }

    #[test]
    fn test_parse_plain_data_uri_defaults_media_type() {
        let uri = DataUri::parse("data:,hello").unwrap();
        assert_eq!(uri.media_type, "text/plain");
        assert!(!uri.base64);
        assert_eq!(uri.decode().unwrap(), b"hello");
    }

    #[test]
    fn test_text_like_media_types() {
        for media in [
            "application/json",
            "application/ld+json",
            "image/svg+xml",
            "text/markdown",
        ] {
            let uri = DataUri {
                media_type: media,
                base64: false,
                payload: "",
            };
            assert!(uri.is_text(), "{media} should be text");
        }
        let png = DataUri {
            media_type: "image/png",
            base64: true,
            payload: "",
        };
        assert!(!png.is_text());
    }

    #[test]
    fn test_render_text_attachment_inline() {
        let rendered = render_attachment(&attachment(
            "data.csv",
            "data:text/csv;base64,YSxiCjEsMgo=",
        ));
        assert!(rendered.contains("data.csv (text/csv)"));
        assert!(rendered.contains("a,b\n1,2"));
    }

    #[test]
    fn test_render_image_attachment_summarized() {
        let rendered = render_attachment(&attachment(
            "sample.png",
            "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAAB",
        ));
        assert!(rendered.contains("image/png"));
        assert!(rendered.contains("not shown"));
        assert!(!rendered.contains("iVBORw0KGgo"));
    }

    #[test]
    fn test_render_remote_url_is_reference_only() {
        let rendered = render_attachment(&attachment("logo", "https://example.com/logo.png"));
        assert_eq!(rendered, "- logo (linked): https://example.com/logo.png");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 10), "héllo");
        assert_eq!(truncate_chars("héllo", 2), "hé\n... [truncated]");
    }
}
