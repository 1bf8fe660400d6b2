//! Non-fatal findings collected while compiling.

use std::fmt;

use serde::Serialize;

/// A warning that does not abort compilation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    /// File stem the warning belongs to
    pub file: String,
    /// Slide number (1-indexed), when the warning is tied to one slide
    pub slide: Option<usize>,
    /// What kind of warning
    pub kind: WarningKind,
}

/// Types of warnings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    /// A concept tag used by a question before any slide introduced it
    ConceptNotCovered { tag: String, primary: bool },
    /// The same reference id was defined twice
    DuplicateReference { id: String, renamed: String },
    /// A `#key` link whose target never got defined
    UnresolvedForwardLink { id: String },
    /// An inline plugin call for a plugin the slide does not embed
    MissingInlinePlugin { plugin: String },
    /// A second `Answer:` line in one slide
    DuplicateAnswer,
    /// `Tags:` after `Notes:` is ignored
    TagsAfterNotes,
    /// A plugin embed or binding naming an unregistered plugin
    UnknownPlugin { plugin: String },
    /// The image resolver could not find an image
    ImageNotFound { path: String },
    /// A concept set too large to expand into subsets
    LargeConceptSet { qnumber: usize, size: usize },
    /// An unsupported key in the file defaults header
    UnknownDefault { key: String },
}

impl Warning {
    pub fn new(file: impl Into<String>, slide: Option<usize>, kind: WarningKind) -> Self {
        Self {
            file: file.into(),
            slide,
            kind,
        }
    }

    /// Emit the warning through `tracing`
    pub fn log(&self) {
        tracing::warn!(file = %self.file, slide = ?self.slide, "{}", self.kind);
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slide {
            Some(slide) => write!(f, "{}: slide {}: {}", self.file, slide, self.kind),
            None => write!(f, "{}: {}", self.file, self.kind),
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::ConceptNotCovered { tag, primary } => {
                let which = if *primary { "primary" } else { "secondary" };
                write!(f, "{which} concept '{tag}' not covered before use")
            }
            WarningKind::DuplicateReference { id, renamed } => {
                write!(f, "duplicate reference '{id}' (renamed to '{renamed}')")
            }
            WarningKind::UnresolvedForwardLink { id } => {
                write!(f, "forward link to '{id}' never resolved")
            }
            WarningKind::MissingInlinePlugin { plugin } => {
                write!(f, "inline call to plugin '{plugin}' without an embed")
            }
            WarningKind::DuplicateAnswer => write!(f, "additional Answer: line ignored"),
            WarningKind::TagsAfterNotes => write!(f, "Tags: after Notes: ignored"),
            WarningKind::UnknownPlugin { plugin } => write!(f, "unknown plugin '{plugin}'"),
            WarningKind::ImageNotFound { path } => write!(f, "image '{path}' not found"),
            WarningKind::LargeConceptSet { qnumber, size } => write!(
                f,
                "question {qnumber} has {size} concepts; only exact variants are reported"
            ),
            WarningKind::UnknownDefault { key } => write!(f, "unknown default '--{key}'"),
        }
    }
}

/// Accumulates warnings for one file, logging each as it arrives
#[derive(Debug, Default)]
pub struct Diagnostics {
    file: String,
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, slide: Option<usize>, kind: WarningKind) {
        let warning = Warning::new(self.file.clone(), slide, kind);
        warning.log();
        self.warnings.push(warning);
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_display() {
        let w = Warning::new(
            "intro",
            Some(4),
            WarningKind::ConceptNotCovered {
                tag: "recursion".into(),
                primary: true,
            },
        );
        assert_eq!(
            w.to_string(),
            "intro: slide 4: primary concept 'recursion' not covered before use"
        );

        let w = Warning::new("intro", None, WarningKind::UnknownDefault { key: "foo".into() });
        assert_eq!(w.to_string(), "intro: unknown default '--foo'");
    }

    #[test]
    fn test_warning_json_shape() {
        let w = Warning::new(
            "intro",
            Some(2),
            WarningKind::UnknownPlugin {
                plugin: "Graph".into(),
            },
        );
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["kind"]["kind"], "unknown_plugin");
        assert_eq!(json["kind"]["plugin"], "Graph");
        assert_eq!(json["slide"], 2);
    }
}
