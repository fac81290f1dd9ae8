//! Single-file multipart/form-data decoder
//!
//! Works on raw bytes only, so the embedded file survives byte-for-byte. Only
//! the part named `file` is extracted; every other part is ignored.

use std::sync::OnceLock;

use memchr::memmem;
use regex::Regex;

/// Filename used when the part carries none
pub const DEFAULT_FILENAME: &str = "upload.xlsx";

const CRLF: &[u8] = b"\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";
const TAIL: &[u8] = b"--";

/// The uploaded file extracted from a multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultipartError {
    #[error("content type is not multipart/form-data")]
    NotMultipart,

    #[error("multipart boundary missing from content type")]
    MissingBoundary,

    #[error("file is required")]
    MissingFilePart,
}

fn boundary_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)boundary=([^;]+)").expect("valid boundary regex"))
}

/// `name="file"` as its own parameter, not the tail of `filename="file"`
fn file_name_param_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(?:^|[;\s])name="file""#).expect("valid name parameter regex")
    })
}

fn filename_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)filename="([^"]*)""#).expect("valid filename regex"))
}

/// Boundary token from a `Content-Type` header value
pub fn boundary_from_content_type(content_type: &str) -> Result<String, MultipartError> {
    if !content_type.to_ascii_lowercase().contains("multipart/form-data") {
        return Err(MultipartError::NotMultipart);
    }
    let boundary = boundary_regex()
        .captures(content_type)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().trim_matches('"'))
        .filter(|b| !b.is_empty())
        .ok_or(MultipartError::MissingBoundary)?;
    Ok(boundary.to_string())
}

/// Extract the `file` part from a multipart body
pub fn extract_file_part(content_type: &str, body: &[u8]) -> Result<FilePart, MultipartError> {
    let boundary = boundary_from_content_type(content_type)?;
    let marker = format!("--{boundary}");

    let found = split_on(body, marker.as_bytes()).find_map(parse_part);
    found.ok_or(MultipartError::MissingFilePart)
}

/// Split `haystack` on every occurrence of `needle`
fn split_on<'a>(haystack: &'a [u8], needle: &'a [u8]) -> impl Iterator<Item = &'a [u8]> + 'a {
    let mut starts = vec![0];
    let mut ends = Vec::new();
    for pos in memmem::find_iter(haystack, needle) {
        ends.push(pos);
        starts.push(pos + needle.len());
    }
    ends.push(haystack.len());
    starts
        .into_iter()
        .zip(ends)
        .map(move |(start, end)| &haystack[start..end])
}

fn parse_part(part: &[u8]) -> Option<FilePart> {
    if part.is_empty() || part == b"--\r\n" || part == TAIL {
        return None;
    }

    let part = part.strip_prefix(CRLF).unwrap_or(part);
    let header_end = memmem::find(part, HEADER_END)?;
    let headers = String::from_utf8_lossy(&part[..header_end]);
    let body = &part[header_end + HEADER_END.len()..];

    let disposition = headers
        .split("\r\n")
        .find(|line| line.to_ascii_lowercase().starts_with("content-disposition:"))?;
    if !file_name_param_regex().is_match(disposition) {
        return None;
    }

    let filename = filename_regex()
        .captures(disposition)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| DEFAULT_FILENAME.to_string(), |m| m.as_str().to_string());

    let body = body.strip_suffix(CRLF).unwrap_or(body);
    let body = body.strip_suffix(TAIL).unwrap_or(body);

    Some(FilePart {
        filename,
        bytes: body.to_vec(),
    })
}
