//! Raw message structure and tolerant parsing.
//!
//! A [`RawMessage`] is the parsed form of one archive entry: a header block
//! plus either a flat body or multipart [`Part`]s. Parsing only fails when
//! the entry is structurally broken (no recognizable header at all); sparse
//! or partially damaged messages flow through with whatever was readable.

use crate::content_type::ContentType;
use crate::encoding::{decode_base64_lenient, decode_quoted_printable};
use crate::error::{Error, Result};
use crate::header::Headers;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }
}

/// One MIME part of a multipart message.
#[derive(Debug, Clone)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body (raw bytes, still transfer-encoded).
    pub body: Vec<u8>,
}

impl Part {
    /// Creates a new part.
    #[must_use]
    pub const fn new(headers: Headers, body: Vec<u8>) -> Self {
        Self { headers, body }
    }

    /// Gets the content type, defaulting to text/plain.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.headers
            .get("content-type")
            .and_then(|v| ContentType::parse(v).ok())
            .unwrap_or_else(ContentType::text_plain)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        match self.transfer_encoding() {
            TransferEncoding::Base64 => {
                let body_str = String::from_utf8_lossy(&self.body);
                decode_base64_lenient(&body_str)
            }
            TransferEncoding::QuotedPrintable => {
                let body_str = String::from_utf8_lossy(&self.body);
                let decoded = decode_quoted_printable(&body_str)?;
                Ok(decoded.into_bytes())
            }
            _ => Ok(self.body.clone()),
        }
    }

    /// Gets the decoded body as lossy text.
    #[must_use]
    pub fn body_text(&self) -> Option<String> {
        self.decode_body()
            .ok()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Returns the filename advertised for this part, if any.
    ///
    /// Checks the Content-Disposition `filename` parameter first, then the
    /// Content-Type `name` parameter.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        if let Some(disposition) = self.headers.get("content-disposition")
            && let Some(name) = parameter(disposition, "filename")
        {
            return Some(name);
        }
        self.content_type().name().map(ToString::to_string)
    }

    /// Returns the Content-ID with angle brackets stripped, if present.
    #[must_use]
    pub fn content_id(&self) -> Option<String> {
        self.headers
            .get("content-id")
            .map(|v| v.trim().trim_start_matches('<').trim_end_matches('>').to_string())
    }

    /// Whether this part is an attachment rather than body content.
    ///
    /// A part is an attachment when its disposition says so, when it carries
    /// a filename, or when it is a non-text part with a content-id (an
    /// inline image referenced from an HTML body).
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        if let Some(disposition) = self.headers.get("content-disposition") {
            let kind = disposition
                .split(';')
                .next()
                .unwrap_or("")
                .trim()
                .to_lowercase();
            if kind == "attachment" {
                return true;
            }
        }
        if self.filename().is_some() {
            return true;
        }
        !self.content_type().is_text() && self.content_id().is_some()
    }

    /// Whether this part is marked inline (disposition inline or content-id).
    #[must_use]
    pub fn is_inline(&self) -> bool {
        let inline_disposition = self
            .headers
            .get("content-disposition")
            .is_some_and(|d| d.split(';').next().unwrap_or("").trim().eq_ignore_ascii_case("inline"));
        inline_disposition || self.content_id().is_some()
    }
}

/// A parsed archive message: headers plus flat body or multipart parts.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Message headers.
    pub headers: Headers,
    /// The raw header block as it appeared in the entry.
    pub raw_headers: String,
    /// Multipart parts (empty for single-part messages).
    pub parts: Vec<Part>,
    /// Body for single-part messages (raw bytes, still transfer-encoded).
    pub body: Option<Vec<u8>>,
}

impl RawMessage {
    /// Parses a raw message entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] when the entry contains no recognizable
    /// header line at all; every sparser-but-parseable shape succeeds.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let text = String::from_utf8_lossy(raw);
        let (header_text, body_offset) = split_header_block(&text);

        let headers = Headers::parse(header_text);
        if headers.is_empty() {
            return Err(Error::Malformed(
                "no header line found in message entry".to_string(),
            ));
        }

        let raw_headers = header_text.to_string();
        let body_bytes = text[body_offset..].as_bytes().to_vec();

        let content_type = headers
            .get("content-type")
            .and_then(|v| ContentType::parse(v).ok());

        if let Some(ct) = &content_type
            && ct.is_multipart()
            && let Some(boundary) = ct.boundary()
        {
            let parts = split_multipart(&text[body_offset..], boundary);
            return Ok(Self {
                headers,
                raw_headers,
                parts,
                body: None,
            });
        }

        Ok(Self {
            headers,
            raw_headers,
            parts: Vec::new(),
            body: Some(body_bytes),
        })
    }

    /// Finds the first `text/plain` part body, or the flat body for
    /// single-part text messages.
    #[must_use]
    pub fn plain_body(&self) -> Option<String> {
        if self.parts.is_empty() {
            let ct = self
                .headers
                .get("content-type")
                .and_then(|v| ContentType::parse(v).ok())
                .unwrap_or_else(ContentType::text_plain);
            if ct.is_text() && ct.sub_type == "plain" {
                return self.flat_body_text();
            }
            return None;
        }

        self.find_text_part("plain")
    }

    /// Finds the first `text/html` part body, or the flat body of an HTML
    /// single-part message.
    #[must_use]
    pub fn html_body(&self) -> Option<String> {
        if self.parts.is_empty() {
            let ct = self.headers.get("content-type").and_then(|v| ContentType::parse(v).ok())?;
            if ct.is_text() && ct.sub_type == "html" {
                return self.flat_body_text();
            }
            return None;
        }

        self.find_text_part("html")
    }

    /// Returns the attachment-like parts of the message.
    #[must_use]
    pub fn attachment_parts(&self) -> Vec<&Part> {
        self.parts.iter().filter(|p| p.is_attachment()).collect()
    }

    fn find_text_part(&self, sub_type: &str) -> Option<String> {
        self.parts
            .iter()
            .find(|p| {
                let ct = p.content_type();
                ct.is_text() && ct.sub_type == sub_type && !p.is_attachment()
            })
            .and_then(Part::body_text)
    }

    fn flat_body_text(&self) -> Option<String> {
        let body = self.body.as_ref()?;
        let shim = Part::new(self.headers.clone(), body.clone());
        shim.body_text()
    }
}

/// Splits raw text into the header block and the byte offset of the body.
fn split_header_block(text: &str) -> (&str, usize) {
    if let Some(pos) = text.find("\r\n\r\n") {
        (&text[..pos], pos + 4)
    } else if let Some(pos) = text.find("\n\n") {
        (&text[..pos], pos + 2)
    } else {
        (text, text.len())
    }
}

/// Splits a multipart body on its boundary into parts.
///
/// Unparseable fragments between boundaries are dropped rather than erroring;
/// damaged archives routinely truncate the final part.
fn split_multipart(body: &str, boundary: &str) -> Vec<Part> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();

    for segment in body.split(delimiter.as_str()).skip(1) {
        let segment = segment.trim_start_matches(['\r', '\n']);
        // Closing delimiter remainder
        if segment.starts_with("--") {
            break;
        }
        let (header_text, body_offset) = split_header_block(segment);
        let headers = Headers::parse(header_text);
        if headers.is_empty() && segment[body_offset..].trim().is_empty() {
            continue;
        }
        let body = segment[body_offset..]
            .trim_end_matches(['\r', '\n'])
            .as_bytes()
            .to_vec();
        parts.push(Part::new(headers, body));
    }

    parts
}

/// Extracts a `key=value` parameter from a structured header value.
fn parameter(value: &str, key: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|param| {
        let (k, v) = param.split_once('=')?;
        if k.trim().eq_ignore_ascii_case(key) {
            Some(v.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SIMPLE: &str = concat!(
        "From: sender@example.com\r\n",
        "To: recipient@example.com\r\n",
        "Subject: Test\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "Hello, World!"
    );

    #[test]
    fn test_parse_single_part() {
        let message = RawMessage::parse(SIMPLE.as_bytes()).unwrap();
        assert_eq!(message.headers.get("subject"), Some("Test"));
        assert_eq!(message.plain_body().unwrap(), "Hello, World!");
        assert!(message.html_body().is_none());
        assert!(message.attachment_parts().is_empty());
    }

    #[test]
    fn test_parse_rejects_headerless_garbage() {
        let result = RawMessage::parse(b"\x00\x01\x02 nothing resembling a message");
        assert!(matches!(result, Err(Error::Malformed(_))));
    }

    #[test]
    fn test_parse_multipart_with_attachment() {
        let raw = concat!(
            "From: a@example.com\r\n",
            "Subject: Report\r\n",
            "Content-Type: multipart/mixed; boundary=\"XYZ\"\r\n",
            "\r\n",
            "--XYZ\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "See attached.\r\n",
            "--XYZ\r\n",
            "Content-Type: application/pdf; name=\"site.pdf\"\r\n",
            "Content-Disposition: attachment; filename=\"site.pdf\"\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "SGVsbG8=\r\n",
            "--XYZ--\r\n"
        );

        let message = RawMessage::parse(raw.as_bytes()).unwrap();
        assert_eq!(message.plain_body().unwrap(), "See attached.");

        let attachments = message.attachment_parts();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename().unwrap(), "site.pdf");
        assert_eq!(attachments[0].decode_body().unwrap(), b"Hello");
        assert!(!attachments[0].is_inline());
    }

    #[test]
    fn test_parse_multipart_alternative_bodies() {
        let raw = concat!(
            "Subject: Both\r\n",
            "Content-Type: multipart/alternative; boundary=AB\r\n",
            "\r\n",
            "--AB\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "plain here\r\n",
            "--AB\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<p>html here</p>\r\n",
            "--AB--\r\n"
        );

        let message = RawMessage::parse(raw.as_bytes()).unwrap();
        assert_eq!(message.plain_body().unwrap(), "plain here");
        assert_eq!(message.html_body().unwrap(), "<p>html here</p>");
    }

    #[test]
    fn test_inline_image_via_content_id() {
        let raw = concat!(
            "Subject: Inline\r\n",
            "Content-Type: multipart/related; boundary=IM\r\n",
            "\r\n",
            "--IM\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<img src=\"cid:logo\">\r\n",
            "--IM\r\n",
            "Content-Type: image/png; name=\"logo.png\"\r\n",
            "Content-ID: <logo>\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "iVBORw0=\r\n",
            "--IM--\r\n"
        );

        let message = RawMessage::parse(raw.as_bytes()).unwrap();
        let attachments = message.attachment_parts();
        assert_eq!(attachments.len(), 1);
        assert!(attachments[0].is_inline());
        assert_eq!(attachments[0].content_id().unwrap(), "logo");
    }

    #[test]
    fn test_quoted_printable_body() {
        let raw = concat!(
            "Subject: QP\r\n",
            "Content-Type: text/plain\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "caf=C3=A9"
        );
        let message = RawMessage::parse(raw.as_bytes()).unwrap();
        assert_eq!(message.plain_body().unwrap(), "café");
    }
}
