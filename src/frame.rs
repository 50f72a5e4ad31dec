use std::fmt;

/// The byte sequence that closes every message exchanged between the tiers.
pub const TERMINATOR: &str = "\nEND\n";

/// Prefix of every error produced by the application tier itself.
pub const APPLICATION_ERROR: &str = "ERROR: APPLICATION";

/// A complete wire message: a text payload that always ends with [`TERMINATOR`].
///
/// Every request reply and every data tier response travels as a `Frame`. The constructors
/// guarantee the terminator is present, so a `Frame` can never be observed half-finished.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame(String);

impl Frame {
    /// Builds a frame from `body`, appending the terminator unless it is already there.
    ///
    /// Trailing newlines are collapsed so `"OK RESULT 0\n"` and `"OK RESULT 0"` both become
    /// `"OK RESULT 0\nEND\n"`.
    pub fn new(body: impl Into<String>) -> Frame {
        let body = body.into();
        if body.ends_with(TERMINATOR) {
            return Frame(body);
        }

        let mut text = body.trim_end_matches('\n').to_string();
        text.push_str(TERMINATOR);
        Frame(text)
    }

    /// `ERROR: APPLICATION <reason>`
    pub fn application_error(reason: impl fmt::Display) -> Frame {
        Frame::new(format!("{} {}", APPLICATION_ERROR, reason))
    }

    pub fn quit() -> Frame {
        Frame::new("QUITTING: OK BYE....")
    }

    /// Whether the payload reports a failure, either ours or one forwarded from the data tier.
    pub fn is_error(&self) -> bool {
        self.0.starts_with("ERROR")
    }

    /// The payload without the terminator.
    pub fn body(&self) -> &str {
        &self.0[..self.0.len() - TERMINATOR.len()]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Single line rendering for log records, newlines are escaped as `\n`.
    pub fn flatten(&self) -> String {
        flatten(&self.0)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub(crate) fn flatten(text: &str) -> String {
    text.replace('\n', "\\n")
}
