//! The document model built alongside the HTML.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of question a slide carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QType {
    Choice,
    MultiChoice,
    Number,
    Text,
    TextPlain,
    TextCode,
    /// Response collected by a plugin: `(name, args)`
    Plugin { name: String, args: String },
}

impl QType {
    /// Parse a simple type keyword as written in answers and type headers
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "choice" => Some(QType::Choice),
            "multichoice" => Some(QType::MultiChoice),
            "number" => Some(QType::Number),
            "text" | "markdown" => Some(QType::Text),
            "text/plain" => Some(QType::TextPlain),
            "text/code" | "text/x-code" => Some(QType::TextCode),
            _ => None,
        }
    }

    pub fn keyword(&self) -> String {
        match self {
            QType::Choice => "choice".into(),
            QType::MultiChoice => "multichoice".into(),
            QType::Number => "number".into(),
            QType::Text => "text".into(),
            QType::TextPlain => "text/plain".into(),
            QType::TextCode => "text/code".into(),
            QType::Plugin { name, args } if args.is_empty() => name.clone(),
            QType::Plugin { name, args } => format!("{name}/{args}"),
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, QType::Choice | QType::MultiChoice)
    }
}

impl fmt::Display for QType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keyword())
    }
}

/// The expected answer of a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CorrectSpec {
    /// Literal text or markdown
    Literal { value: String },
    /// A number with an absolute tolerance
    Number { value: f64, error: f64 },
    /// Correct choice letters
    Choices { letters: BTreeSet<char> },
    /// Response checked by calling a plugin action
    Plugin {
        name: String,
        action: String,
        arg: String,
    },
}

impl CorrectSpec {
    /// The form recorded in the sheet payload
    pub fn display_value(&self) -> String {
        match self {
            CorrectSpec::Literal { value } => value.clone(),
            CorrectSpec::Number { value, error } if *error == 0.0 => value.to_string(),
            CorrectSpec::Number { value, error } => format!("{value}+/-{error}"),
            CorrectSpec::Choices { letters } => letters.iter().collect(),
            CorrectSpec::Plugin { name, action, arg } => format!("={name}.{action}({arg})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Explain {
    Text,
    Markdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Share {
    AfterAnswering,
    AfterGrading,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    ShowCompleted,
    ShowLive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Response,
    Setup,
}

/// Enumerated answer options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOptions {
    pub disabled: bool,
    pub explain: Option<Explain>,
    pub share: Option<Share>,
    pub team: Option<Team>,
    pub vote: Option<Vote>,
    pub participation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retry {
    pub count: u32,
    pub delay: u32,
}

/// What a resolved forward link lets the reader skip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipInfo {
    /// Slide where the link target is defined
    pub target_slide: usize,
    /// Number of slides jumped over
    pub slides_skipped: usize,
    /// Score weight of the questions jumped over
    pub score_weight_skipped: f64,
}

/// A graded question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// 1-based index within the file
    pub qnumber: usize,
    pub slide: usize,
    pub slide_id: String,
    pub qtype: QType,
    pub correct: Option<CorrectSpec>,
    pub weight: f64,
    pub gweight: Option<f64>,
    pub vweight: f64,
    pub options: QuestionOptions,
    pub retry: Option<Retry>,
    /// Penalty of each hint, in percent
    pub hints: Vec<f64>,
    /// Truncated digest of the slide's raw text
    pub digest: String,
    /// Number of choices presented (choice questions)
    pub choices: usize,
    /// Letters that have alternative versions
    pub alternatives: Vec<char>,
    pub skip: Option<SkipInfo>,
}

/// Concept tags of a slide
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptTags {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
}

impl ConceptTags {
    /// Parse `primary; tags : secondary; tags`
    pub fn parse(text: &str) -> Self {
        let (primary, secondary) = match text.split_once(':') {
            Some((p, s)) => (p, s),
            None => (text, ""),
        };
        let split = |s: &str| -> Vec<String> {
            s.split(';')
                .map(str::trim)
                .filter(|t| !t.is_empty() && *t != "null")
                .map(String::from)
                .collect()
        };
        Self {
            primary: split(primary),
            secondary: split(secondary),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.secondary.is_empty()
    }

    /// All tags, primary first
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.primary
            .iter()
            .chain(self.secondary.iter())
            .map(String::as_str)
    }
}

/// Collapsible blocks inside a slide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Hidden,
    Notes,
    Hint,
    Extra,
}

impl BlockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::Hidden => "hidden",
            BlockKind::Notes => "notes",
            BlockKind::Hint => "hint",
            BlockKind::Extra => "extra",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A plugin instantiated in a slide
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginEmbed {
    pub name: String,
    pub slide: usize,
    /// First embed of this plugin in the file
    pub first_load: bool,
    pub args: String,
    /// Template fields the body refers to
    pub body_template_fields: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    /// No visible number
    Plain,
    /// Numbered by a per-key counter
    Counted,
    /// Numbered `"{file}.{n}"`
    ChapterCounted,
}

/// A reference target defined in the file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    pub kind: RefKind,
    pub label: String,
    pub owning_slide: usize,
}

/// One rendered slide
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    /// 1-based, unique within the file
    pub number: usize,
    pub id: String,
    pub header: Option<String>,
    pub concept_tags: ConceptTags,
    /// `qnumber` of the slide's question
    pub question: Option<usize>,
    /// Token index range `[token_start, token_end)`
    pub token_start: usize,
    pub token_end: usize,
    /// Blocks opened in this slide, in order
    pub blocks: Vec<BlockKind>,
    pub images: Vec<String>,
    pub discuss: bool,
    pub plugins: Vec<String>,
}

/// A plugin defined inline in the file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDefinition {
    pub name: String,
    pub text: String,
}

/// Everything the renderer learned about one file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentModel {
    pub file: String,
    pub file_number: usize,
    pub chapter_id: String,
    pub header: Option<String>,
    pub slides: Vec<Slide>,
    pub questions: Vec<Question>,
    /// Running score weight totals; index 0 is 0, index q covers questions `1..=q`
    pub cum_score: Vec<f64>,
    /// Running grade weight totals, indexed like `cum_score`
    pub cum_grade: Vec<f64>,
    pub references: Vec<Reference>,
    pub plugin_embeds: Vec<PluginEmbed>,
    pub plugin_definitions: Vec<PluginDefinition>,
    /// `(slide_id, header)` of level-2 sections
    pub toc: Vec<(String, String)>,
}

impl DocumentModel {
    pub fn total_score_weight(&self) -> f64 {
        self.cum_score.last().copied().unwrap_or(0.0)
    }

    pub fn total_grade_weight(&self) -> f64 {
        self.cum_grade.last().copied().unwrap_or(0.0)
    }

    pub fn slide(&self, number: usize) -> Option<&Slide> {
        number.checked_sub(1).and_then(|i| self.slides.get(i))
    }

    /// Section list linking into `file_url`; empty when the file has no
    /// sections. Unnumbered when `numbered` is false.
    pub fn toc_html(&self, file_url: &str, numbered: bool) -> String {
        if self.toc.is_empty() {
            return String::new();
        }
        let (open, close) = if numbered {
            ("<ol", "</ol>\n")
        } else {
            ("<ul style=\"list-style-type: none;\"", "</ul>\n")
        };
        let mut out = format!("{open} class=\"slidoc-toc {}-toc\">\n", self.chapter_id);
        for (id, header) in &self.toc {
            out.push_str(&format!(
                "<li><a class=\"header-link\" href=\"{file_url}#{id}\">{}</a></li>\n",
                crate::render::html::escape(header)
            ));
        }
        out.push_str(close);
        out
    }
}

/// `slidoc{NN}`
pub fn chapter_id(file_number: usize) -> String {
    format!("slidoc{file_number:02}")
}

/// `slidoc{NN}-{MM}`
pub fn slide_id(file_number: usize, slide_number: usize) -> String {
    format!("slidoc{file_number:02}-{slide_number:02}")
}
