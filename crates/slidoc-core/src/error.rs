//! Error types for compilation.
//!
//! Syntax errors abort the whole file; consistency errors abort the
//! operation that depends on them. Everything recoverable is a
//! [`Warning`](crate::Warning) instead.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::model::BlockKind;

/// Where in the document an error was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    /// File name (stem, without extension)
    pub file: String,
    /// Slide number (1-indexed)
    pub slide: usize,
}

impl Location {
    pub fn new(file: impl Into<String>, slide: usize) -> Self {
        Self {
            file: file.into(),
            slide,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: slide {}", self.file, self.slide)
    }
}

/// A malformed construct inside a single slide.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error("choice '{found}' out of sequence (expected '{expected}')")]
    ChoiceOutOfSequence { expected: char, found: char },

    #[error("alternative choice '{letter}*' requires the multiplicity feature")]
    AlternativeChoice { letter: char },

    #[error("choice '{letter}..' in a question of type '{qtype}'")]
    ChoiceTypeConflict { letter: char, qtype: String },

    #[error("invalid answer '{text}': {reason}")]
    InvalidAnswer { text: String, reason: String },

    #[error("answer type '{found}' conflicts with question type '{expected}'")]
    AnswerTypeConflict { expected: String, found: String },

    #[error("invalid answer option '{option}': {reason}")]
    InvalidOption { option: String, reason: String },

    #[error("duplicate Tags: line")]
    DuplicateTags,

    #[error("{kind} block opened while one is already open")]
    BlockAlreadyOpen { kind: BlockKind },

    #[error("plugin '{plugin}' embedded twice in one slide")]
    DuplicatePluginEmbed { plugin: String },

    #[error("answer is bound to plugin '{plugin}' but the slide does not embed it")]
    MissingPlugin { plugin: String },
}

/// Errors that abort compilation of a file.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{loc}: {kind}")]
    Syntax { loc: Location, kind: SyntaxError },

    #[error(
        "{loc}: forward link to '{target}' skips questions carrying grade weight {weight}"
    )]
    ForwardLinkSkipsGraded {
        loc: Location,
        target: String,
        weight: f64,
    },

    #[error("{loc}: template error in plugin '{plugin}': {reason}")]
    Template {
        loc: Location,
        plugin: String,
        reason: String,
    },

    #[error("{file}: tokenizer found {tokenizer} slides but the renderer produced {renderer}")]
    SlideCountMismatch {
        file: String,
        tokenizer: usize,
        renderer: usize,
    },

    #[error("invalid hide pattern '{pattern}'")]
    InvalidHidePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The paragraph rule matches any non-empty input, so this is a bug.
    #[error("internal tokenizer error: no rule matched at byte {offset}")]
    NoRuleMatched { offset: usize },
}

impl CompileError {
    pub fn syntax(loc: Location, kind: SyntaxError) -> Self {
        CompileError::Syntax { loc, kind }
    }

    /// The slide location, for errors that have one.
    pub fn location(&self) -> Option<&Location> {
        match self {
            CompileError::Syntax { loc, .. }
            | CompileError::ForwardLinkSkipsGraded { loc, .. }
            | CompileError::Template { loc, .. } => Some(loc),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_located_message() {
        let err = CompileError::syntax(
            Location::new("lecture01", 3),
            SyntaxError::ChoiceOutOfSequence {
                expected: 'C',
                found: 'D',
            },
        );
        assert_eq!(
            err.to_string(),
            "lecture01: slide 3: choice 'D' out of sequence (expected 'C')"
        );
        assert_eq!(err.location().map(|l| l.slide), Some(3));
    }
}
