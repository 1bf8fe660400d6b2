//! Content digests and slide boundary verification.
//!
//! A published file records the digest of its preprocessed source and the
//! offsets where slides 2..n start. Extracting slides later is only allowed
//! when the current source reproduces both exactly.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::CompileError;
use crate::lexer::tokenize;
use crate::preprocess::preprocess;
use crate::token::RawSlice;

/// Number of hex characters kept from the hash
pub const TRUNCATE_DIGEST: usize = 8;

/// Truncated hex digest of `text`
pub fn digest(text: &str) -> String {
    let hex = blake3::hash(text.as_bytes()).to_hex();
    hex.as_str()[..TRUNCATE_DIGEST].to_string()
}

#[derive(Debug, Error)]
pub enum MismatchError {
    #[error("content digest changed: recorded {recorded}, current {current}")]
    Digest { recorded: String, current: String },

    #[error("slide count changed: recorded {recorded}, current {current}")]
    SlideCount { recorded: usize, current: usize },

    #[error("slide breaks moved: recorded {recorded:?}, current {current:?}")]
    Breaks {
        recorded: Vec<usize>,
        current: Vec<usize>,
    },

    #[error("slide slices do not reproduce the source")]
    Reassembly,

    #[error("slides {first}..={last} out of range (1..={count})")]
    OutOfRange {
        first: usize,
        last: usize,
        count: usize,
    },

    #[error("current source does not tokenize")]
    Tokenize(#[source] CompileError),
}

/// The slides of a verified source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideSlices {
    text: String,
    slices: Vec<RawSlice>,
}

impl SlideSlices {
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Raw text of slide `number` (1-indexed)
    pub fn get(&self, number: usize) -> Option<&str> {
        let slice = self.slices.get(number.checked_sub(1)?)?;
        Some(slice.text(&self.text))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.slices.iter().map(|s| s.text(&self.text))
    }

    /// Contiguous raw text of slides `first..=last`
    pub fn extract(&self, range: RangeInclusive<usize>) -> Result<&str, MismatchError> {
        let (first, last) = (*range.start(), *range.end());
        if first == 0 || first > last || last > self.slices.len() {
            return Err(MismatchError::OutOfRange {
                first,
                last,
                count: self.slices.len(),
            });
        }
        let start = self.slices[first - 1].start;
        let end = self.slices[last - 1].end;
        Ok(&self.text[start..end])
    }

    /// The preprocessed source the slices cover
    pub fn source(&self) -> &str {
        &self.text
    }
}

/// Check `current_source` against a recorded digest and slide breaks
pub fn verify(
    current_source: &str,
    recorded_digest: &str,
    recorded_breaks: &[usize],
) -> Result<SlideSlices, MismatchError> {
    let text = preprocess(current_source).text;

    let current = digest(&text);
    if current != recorded_digest {
        return Err(MismatchError::Digest {
            recorded: recorded_digest.to_string(),
            current,
        });
    }

    let stream = tokenize(&text).map_err(MismatchError::Tokenize)?;
    if stream.slide_count() != recorded_breaks.len() + 1 {
        return Err(MismatchError::SlideCount {
            recorded: recorded_breaks.len() + 1,
            current: stream.slide_count(),
        });
    }
    let breaks = stream.break_offsets();
    if breaks != recorded_breaks {
        return Err(MismatchError::Breaks {
            recorded: recorded_breaks.to_vec(),
            current: breaks,
        });
    }

    let joined: String = stream.slices.iter().map(|s| s.text(&text)).collect();
    if joined != text {
        return Err(MismatchError::Reassembly);
    }

    tracing::debug!(digest = %current, slides = stream.slide_count(), "source verified");
    Ok(SlideSlices {
        text,
        slices: stream.slices,
    })
}

/// The durable per-file record a later run is verified against
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub content_digest: String,
    pub defaults_text: Option<String>,
    pub slide_break_offsets: Vec<usize>,
    /// Image paths referenced by each slide
    pub slide_images: Vec<Vec<String>>,
    pub next_image_number: usize,
}

impl IndexRecord {
    /// Verify `current_source` against this record
    pub fn verify(&self, current_source: &str) -> Result<SlideSlices, MismatchError> {
        verify(current_source, &self.content_digest, &self.slide_break_offsets)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "# One\n\nfirst\n\n---\n\nsecond\n\n## Three\n\nthird\n";

    fn record() -> (String, Vec<usize>) {
        let text = preprocess(SOURCE).text;
        let stream = tokenize(&text).unwrap();
        (digest(&text), stream.break_offsets())
    }

    #[test]
    fn test_digest_is_truncated_hex() {
        let d = digest("hello");
        assert_eq!(d.len(), TRUNCATE_DIGEST);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(d, digest("hello"));
        assert_ne!(d, digest("hello!"));
    }

    #[test]
    fn test_verify_is_idempotent() {
        let (d, breaks) = record();
        let a = verify(SOURCE, &d, &breaks).unwrap();
        let b = verify(SOURCE, &d, &breaks).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.iter().collect::<String>(), a.source());
        assert_eq!(a.get(3), Some("## Three\n\nthird\n"));
    }

    #[test]
    fn test_verify_rejects_drift() {
        let (d, breaks) = record();
        let edited = SOURCE.replace("second", "2nd");
        assert!(matches!(
            verify(&edited, &d, &breaks),
            Err(MismatchError::Digest { .. })
        ));
        assert!(matches!(
            verify(SOURCE, &d, &breaks[..1]),
            Err(MismatchError::SlideCount {
                recorded: 2,
                current: 3
            })
        ));
        assert!(matches!(
            verify(SOURCE, &d, &[breaks[0], breaks[1] + 1]),
            Err(MismatchError::Breaks { .. })
        ));
    }

    #[test]
    fn test_extract_range() {
        let (d, breaks) = record();
        let slides = verify(SOURCE, &d, &breaks).unwrap();
        assert_eq!(
            slides.extract(2..=3).unwrap(),
            "second\n\n## Three\n\nthird\n"
        );
        assert!(matches!(
            slides.extract(0..=1),
            Err(MismatchError::OutOfRange { .. })
        ));
        assert!(slides.extract(3..=4).is_err());
    }

    #[test]
    fn test_record_roundtrips_through_json() {
        let (d, breaks) = record();
        let rec = IndexRecord {
            content_digest: d,
            defaults_text: None,
            slide_break_offsets: breaks,
            slide_images: vec![vec![], vec!["plot.png".into()], vec![]],
            next_image_number: 1,
        };
        let back: IndexRecord = serde_json::from_str(&rec.to_json().unwrap()).unwrap();
        assert!(back.verify(SOURCE).is_ok());
    }
}
