//! Line model: a command part and a comment part split at the first `;`.

/// A classified G-code line.
///
/// At least one of the two parts is present. The comment part excludes the
/// `;` separator but keeps any whitespace that followed it, so
/// `G1 Z0.2 ; lift` becomes command `G1 Z0.2 ` and comment ` lift`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Command bytes before the first `;`.
    pub command: Option<Vec<u8>>,
    /// Comment bytes after the first `;`.
    pub comment: Option<Vec<u8>>,
}

impl Line {
    /// Create a line from its parts.
    pub fn new(command: Option<Vec<u8>>, comment: Option<Vec<u8>>) -> Self {
        Self { command, comment }
    }

    /// Create a command-only line.
    pub fn command(command: impl Into<Vec<u8>>) -> Self {
        Self {
            command: Some(command.into()),
            comment: None,
        }
    }

    /// Create a comment-only line.
    pub fn comment(comment: impl Into<Vec<u8>>) -> Self {
        Self {
            command: None,
            comment: Some(comment.into()),
        }
    }

    /// True if the line carries no command.
    pub fn is_comment_only(&self) -> bool {
        self.command.is_none()
    }

    /// True if the comment, with surrounding whitespace removed, equals `marker`.
    pub fn comment_is(&self, marker: &str) -> bool {
        self.comment
            .as_deref()
            .is_some_and(|c| c.trim_ascii() == marker.as_bytes())
    }

    /// Serialize the line back to its byte form, without a line terminator.
    pub fn to_bytes(&self) -> Vec<u8> {
        match (&self.command, &self.comment) {
            (Some(cmd), None) => cmd.clone(),
            (None, Some(comment)) => {
                let mut out = Vec::with_capacity(comment.len() + 1);
                out.push(b';');
                out.extend_from_slice(comment);
                out
            }
            (Some(cmd), Some(comment)) => {
                let mut out = Vec::with_capacity(cmd.len() + comment.len() + 1);
                out.extend_from_slice(cmd);
                out.push(b';');
                out.extend_from_slice(comment);
                out
            }
            (None, None) => Vec::new(),
        }
    }
}

/// Split a raw line into its command and comment parts.
///
/// Surrounding whitespace is removed first. Returns `None` for blank lines.
pub fn classify(raw: &[u8]) -> Option<Line> {
    let raw = raw.trim_ascii();
    if raw.is_empty() {
        return None;
    }
    if let Some(comment) = raw.strip_prefix(b";") {
        return Some(Line::comment(comment));
    }
    match raw.iter().position(|&b| b == b';') {
        Some(split) => Some(Line::new(
            Some(raw[..split].to_vec()),
            Some(raw[split + 1..].to_vec()),
        )),
        None => Some(Line::command(raw)),
    }
}
