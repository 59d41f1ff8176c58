use std::fmt;
use thiserror::Error;

/// Reasons a client-supplied path is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("filename cannot be empty")]
    Empty,
    #[error("absolute paths are not allowed")]
    Absolute,
    #[error("directory traversal (..) is not allowed")]
    Traversal,
    #[error("filename contains invalid characters")]
    InvalidCharacter,
    #[error("path does not name a file")]
    MissingFileName,
}

/// A relative path that passed [`sanitize`]: forward slashes only, no leading
/// slash, no empty, `.` or `..` segments, no control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafePath(String);

impl SafePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SafePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn sanitize(raw: &str) -> Result<SafePath, Rejection> {
    if raw.is_empty() {
        return Err(Rejection::Empty);
    }
    if raw.starts_with('/') || is_drive_absolute(raw) {
        return Err(Rejection::Absolute);
    }
    if raw.contains("..") {
        return Err(Rejection::Traversal);
    }
    if !raw.chars().all(is_printable) {
        return Err(Rejection::InvalidCharacter);
    }

    let normalized = raw.replace('\\', "/");
    if matches!(normalized.rsplit('/').next(), Some("" | ".")) {
        return Err(Rejection::MissingFileName);
    }
    // `a/./b` and `a//b` name the same file as `a/b` and must share its record.
    let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    if segments.is_empty() {
        return Err(Rejection::MissingFileName);
    }
    Ok(SafePath(segments.join("/")))
}

fn is_drive_absolute(raw: &str) -> bool {
    let mut chars = raw.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    )
}

// Space is the only whitespace allowed; invisible format characters (zero
// width, bidi overrides, BOM) and private-use code points are refused along
// with controls.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    !matches!(
        c,
        '\u{00AD}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
            | '\u{E000}'..='\u{F8FF}'
    )
}
