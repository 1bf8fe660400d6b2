//! Source normalization ahead of tokenizing.

use crate::grammar::{ANNOTATION_RE, DEFAULTS_HEADER_RE};

/// Normalized source plus its defaults header, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    pub text: String,
    /// Arguments of a leading `<!--slidoc-defaults ...-->` header
    pub defaults: Option<String>,
}

/// Normalize newlines and drop `Annotation:` lines. Digests and slide
/// slices are computed over the result.
pub fn preprocess(source: &str) -> Preprocessed {
    let normalized = source.replace("\r\n", "\n").replace('\r', "\n");
    let text = ANNOTATION_RE.replace_all(&normalized, "").into_owned();
    let defaults = DEFAULTS_HEADER_RE
        .captures(&text)
        .map(|c| c[1].to_string());
    Preprocessed { text, defaults }
}
