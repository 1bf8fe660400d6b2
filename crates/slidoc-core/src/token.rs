//! Block and inline tokens.

use std::collections::HashMap;

/// A block-level token, in source order
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Paragraph text, tokenized inline when rendered
    Text { text: String },
    Heading { level: u8, text: String },
    BlockMath { text: String },
    LatexEnvironment { name: String, text: String },
    PluginDefinition { name: String, text: String },
    PluginEmbed { name: String, args: String },
    SlidocHeader { name: String, text: String },
    Answer { text: String },
    Discuss { text: String },
    Tags { text: String },
    /// Hint with its penalty in percent
    Hint { penalty: Option<f64> },
    Notes,
    Extra,
    Minirule,
    Pause,
    Hrule,
    ListItem { ordered: bool, text: String },
    BlockCode { lang: Option<String>, code: String },
    QuoteStart,
    QuoteEnd,
    Html { text: String },
}

impl Token {
    /// An explicit slide break
    pub fn ends_slide(&self) -> bool {
        matches!(self, Token::Hrule)
    }

    /// A heading that starts a new slide when the current one has content
    pub fn starts_slide(&self) -> bool {
        matches!(self, Token::Heading { level, text } if *level <= 2 && !text.trim().is_empty())
    }

    /// Whether the token makes the current slide non-empty. File metadata
    /// headers do not, so a heading right after them starts no new slide.
    pub fn is_content(&self) -> bool {
        !matches!(self, Token::SlidocHeader { .. })
    }
}

/// An inline token inside block text
#[derive(Debug, Clone, PartialEq)]
pub enum InlineToken {
    Text(String),
    ChoiceMarker { letter: char, alternative: bool },
    BlockMath(String),
    InlineMath(String),
    InlineJs {
        plugin: String,
        action: String,
        arg: String,
    },
    InternalRef { text: String, key: String },
    Link {
        text: String,
        url: String,
        title: Option<String>,
        image: bool,
    },
    RefLink { text: String, key: String, image: bool },
    AutoLink(String),
    Code(String),
    Escape(char),
    Strong(String),
    Emphasis(String),
    Html(String),
    LineBreak,
}

/// Byte range of one slide's raw text in the preprocessed source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSlice {
    pub start: usize,
    pub end: usize,
}

impl RawSlice {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Target of a `[key]: url "title"` definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDef {
    pub url: String,
    pub title: Option<String>,
}

/// Output of the block tokenizer
#[derive(Debug, Clone, Default)]
pub struct TokenStream {
    pub tokens: Vec<Token>,
    /// One slice per slide; they tile the source
    pub slices: Vec<RawSlice>,
    /// Link definitions, keyed by lower-cased key
    pub link_defs: HashMap<String, LinkDef>,
}

impl TokenStream {
    pub fn slide_count(&self) -> usize {
        self.slices.len()
    }

    /// Offsets where slides 2..n start
    pub fn break_offsets(&self) -> Vec<usize> {
        self.slices.iter().skip(1).map(|s| s.start).collect()
    }
}
