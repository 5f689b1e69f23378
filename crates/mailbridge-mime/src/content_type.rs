//! MIME content type and disposition handling.

use crate::encoding::decode_rfc2047;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// MIME type used when nothing better is known.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters with lowercased names (e.g., charset, boundary).
    pub parameters: BTreeMap<String, String>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Creates a `text/<sub_type>; charset=utf-8` content type.
    #[must_use]
    pub fn text(sub_type: impl Into<String>) -> Self {
        Self::new("text", sub_type).with_parameter("charset", "utf-8")
    }

    /// Creates a text/plain content type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::text("plain")
    }

    /// Creates a multipart/mixed content type with boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "mixed").with_parameter("boundary", boundary)
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters
            .insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.get("boundary").map(String::as_str)
    }

    /// Returns the decoded `name` parameter if present.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.parameters.get("name").map(|n| decode_rfc2047(n))
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("multipart")
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("text")
    }

    /// Checks for an exact `type/subtype` match, ignoring case.
    #[must_use]
    pub fn is(&self, main_type: &str, sub_type: &str) -> bool {
        self.main_type.eq_ignore_ascii_case(main_type) && self.sub_type.eq_ignore_ascii_case(sub_type)
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="value 2"`
    ///
    /// # Errors
    ///
    /// Returns an error if the type or subtype is missing.
    pub fn parse(s: &str) -> Result<Self> {
        let (type_str, params) = split_value_params(s);

        let (main_type, sub_type) = type_str
            .split_once('/')
            .ok_or_else(|| Error::InvalidContentType(format!("missing subtype in {s:?}")))?;
        let main_type = main_type.trim().to_ascii_lowercase();
        let sub_type = sub_type.trim().to_ascii_lowercase();
        if main_type.is_empty() || sub_type.is_empty() {
            return Err(Error::InvalidContentType(format!("empty type in {s:?}")));
        }

        Ok(Self {
            main_type,
            sub_type,
            parameters: params,
        })
    }

    /// Guesses a content type from a file name extension.
    ///
    /// Unknown extensions yield `application/octet-stream`.
    #[must_use]
    pub fn guess_from_file_name(file_name: &str) -> Self {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let mime = match extension.as_str() {
            "txt" | "log" => "text/plain",
            "htm" | "html" => "text/html",
            "csv" => "text/csv",
            "rtf" => "application/rtf",
            "xml" => "application/xml",
            "json" => "application/json",
            "pdf" => "application/pdf",
            "zip" => "application/zip",
            "gz" => "application/gzip",
            "doc" => "application/msword",
            "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "xls" => "application/vnd.ms-excel",
            "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "ppt" => "application/vnd.ms-powerpoint",
            "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            "odt" => "application/vnd.oasis.opendocument.text",
            "ods" => "application/vnd.oasis.opendocument.spreadsheet",
            "eml" => "message/rfc822",
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "bmp" => "image/bmp",
            "svg" => "image/svg+xml",
            "webp" => "image/webp",
            "mp3" => "audio/mpeg",
            "wav" => "audio/wav",
            "mp4" => "video/mp4",
            _ => OCTET_STREAM,
        };

        Self::parse(mime).unwrap_or_else(|_| Self::new("application", "octet-stream"))
    }
}

impl Default for ContentType {
    fn default() -> Self {
        Self::new("text", "plain").with_parameter("charset", "us-ascii")
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;
        write_params(f, &self.parameters)
    }
}

/// Parsed `Content-Disposition` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type, lowercased (`inline`, `attachment`, ...).
    pub kind: String,
    /// Parameters with lowercased names.
    pub parameters: BTreeMap<String, String>,
}

impl ContentDisposition {
    /// Creates an `attachment` disposition with a file name.
    #[must_use]
    pub fn attachment(file_name: Option<&str>) -> Self {
        let mut parameters = BTreeMap::new();
        if let Some(name) = file_name {
            parameters.insert("filename".to_string(), name.to_string());
        }
        Self {
            kind: "attachment".to_string(),
            parameters,
        }
    }

    /// Parses a disposition value. Never fails; an empty value yields
    /// an empty kind.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let (kind, parameters) = split_value_params(s);
        Self {
            kind: kind.trim().to_ascii_lowercase(),
            parameters,
        }
    }

    /// Returns true for `attachment` dispositions.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.kind == "attachment"
    }

    /// Returns the decoded `filename` parameter if present.
    #[must_use]
    pub fn file_name(&self) -> Option<String> {
        self.parameters.get("filename").map(|n| decode_rfc2047(n))
    }
}

impl fmt::Display for ContentDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)?;
        write_params(f, &self.parameters)
    }
}

fn write_params(f: &mut fmt::Formatter<'_>, params: &BTreeMap<String, String>) -> fmt::Result {
    for (key, value) in params {
        if value.is_empty()
            || value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c))
        {
            let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
            write!(f, "; {key}=\"{escaped}\"")?;
        } else {
            write!(f, "; {key}={value}")?;
        }
    }
    Ok(())
}

/// Splits `value; a=b; c="d;e"` into the leading value and its parameters.
///
/// Quoted parameter values may contain `;` and backslash escapes.
fn split_value_params(s: &str) -> (String, BTreeMap<String, String>) {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => {
                current.push(ch);
                escaped = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ';' if !in_quotes => segments.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    segments.push(current);

    let mut iter = segments.into_iter();
    let value = iter.next().unwrap_or_default().trim().to_string();
    let mut params = BTreeMap::new();
    for segment in iter {
        if let Some((key, raw)) = segment.split_once('=') {
            let key = key.trim().to_ascii_lowercase();
            if key.is_empty() {
                continue;
            }
            params.insert(key, unquote(raw.trim()));
        }
    }
    (value, params)
}

fn unquote(raw: &str) -> String {
    let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) else {
        return raw.to_string();
    };
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                result.push(next);
            }
        } else {
            result.push(ch);
        }
    }
    result
}
