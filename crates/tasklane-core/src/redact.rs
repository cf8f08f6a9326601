//! Log redaction helpers.
//!
//! Payloads and error bodies are logged in full when a message halts a lane,
//! so national identity numbers (11 consecutive digits) MUST be scrubbed from
//! any diagnostic text first. This is a shape-based scrub, not field-aware:
//! it can hit unrelated 11-digit values and will miss ids written with
//! separators.

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Replacement written in place of a national identity number.
pub const REDACTED: &str = "***********";

static NATIONAL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{11}\b").expect("national id pattern is valid"));

/// Returns `text` with every standalone 11-digit run replaced by [`REDACTED`].
pub fn mask_pii(text: &str) -> Cow<'_, str> {
    NATIONAL_ID.replace_all(text, REDACTED)
}

/// Wrapper that masks its content in `Display`.
#[derive(Clone, Copy)]
pub struct Masked<'a>(pub &'a str);

impl fmt::Display for Masked<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&mask_pii(self.0))
    }
}

impl fmt::Debug for Masked<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", mask_pii(self.0))
    }
}
