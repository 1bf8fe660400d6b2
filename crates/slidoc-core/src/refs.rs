//! Reference ids, labels and forward links within one file.

use std::collections::HashMap;

use crate::grammar::ID_DISALLOWED_RE;
use crate::model::{RefKind, Reference, SkipInfo};
use crate::weights::WeightLedger;

/// Normalize a reference key: collapse whitespace, lower-case
pub fn ref_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Turn arbitrary text into an id fragment
pub fn make_id(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    let replaced = ID_DISALLOWED_RE.replace_all(&lower, "-");
    let trimmed = replaced.trim_matches(|c| c == '-' || c == '.');
    urlencoding::encode(trimmed).into_owned()
}

/// Document id of a reference key
pub fn ref_id(key: &str) -> String {
    format!("slidoc-ref-{}", make_id(key))
}

/// A parsed `{#key}`, `{#:key}` or `{#::key}` target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefDecl {
    pub kind: RefKind,
    pub key: String,
}

impl RefDecl {
    /// `raw` is the text after `#`; an empty key falls back to `text`
    pub fn parse(raw: &str, text: &str) -> Self {
        let (kind, key) = if let Some(key) = raw.strip_prefix("::") {
            (RefKind::ChapterCounted, key)
        } else if let Some(key) = raw.strip_prefix(':') {
            (RefKind::Counted, key)
        } else {
            (RefKind::Plain, raw)
        };
        let key = key.trim();
        Self {
            kind,
            key: if key.is_empty() { text.trim() } else { key }.to_string(),
        }
    }

    pub fn id(&self) -> String {
        ref_id(&self.key)
    }
}

/// Outcome of defining a reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Defined {
    New { id: String, label: String },
    /// The id was taken; the definition was kept under `renamed`
    Duplicate {
        id: String,
        renamed: String,
        label: String,
    },
}

impl Defined {
    /// The id the definition is rendered under
    pub fn rendered_id(&self) -> &str {
        match self {
            Defined::New { id, .. } => id,
            Defined::Duplicate { renamed, .. } => renamed,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Defined::New { label, .. } | Defined::Duplicate { label, .. } => label,
        }
    }
}

/// References defined so far in a file
#[derive(Debug, Default)]
pub struct RefTable {
    file_number: usize,
    refs: Vec<Reference>,
    by_id: HashMap<String, usize>,
    counters: HashMap<String, usize>,
    chapter_counters: HashMap<String, usize>,
}

impl RefTable {
    pub fn new(file_number: usize) -> Self {
        Self {
            file_number,
            ..Self::default()
        }
    }

    /// Define `id`, numbering it according to `kind`. Counted kinds draw
    /// from a counter per `counter_key` (the normalized link text).
    pub fn define(&mut self, id: &str, kind: RefKind, counter_key: &str, slide: usize) -> Defined {
        let label = match kind {
            RefKind::Plain => String::new(),
            RefKind::Counted => {
                let n = self.counters.entry(counter_key.to_string()).or_insert(0);
                *n += 1;
                n.to_string()
            }
            RefKind::ChapterCounted => {
                let n = self
                    .chapter_counters
                    .entry(counter_key.to_string())
                    .or_insert(0);
                *n += 1;
                format!("{}.{}", self.file_number, n)
            }
        };

        if !self.by_id.contains_key(id) {
            self.insert(id.to_string(), kind, label.clone(), slide);
            return Defined::New {
                id: id.to_string(),
                label,
            };
        }

        let renamed = (1..)
            .map(|n| format!("{id}-duplicate-{n}"))
            .find(|candidate| !self.by_id.contains_key(candidate))
            .unwrap_or_else(|| format!("{id}-duplicate"));
        self.insert(renamed.clone(), kind, label.clone(), slide);
        Defined::Duplicate {
            id: id.to_string(),
            renamed,
            label,
        }
    }

    fn insert(&mut self, id: String, kind: RefKind, label: String, slide: usize) {
        self.by_id.insert(id.clone(), self.refs.len());
        self.refs.push(Reference {
            id,
            kind,
            label,
            owning_slide: slide,
        });
    }

    pub fn get(&self, id: &str) -> Option<&Reference> {
        self.by_id.get(id).map(|i| &self.refs[*i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn into_references(self) -> Vec<Reference> {
        self.refs
    }
}

/// A link made before its target was defined
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardLink {
    pub target: String,
    pub origin_slide: usize,
    /// Question carried by the origin slide, known once it closes
    pub origin_question: Option<usize>,
    origin_closed: bool,
    pub defined_at: Option<usize>,
}

/// A forward link that would skip graded questions
#[derive(Debug, Clone, PartialEq)]
pub struct SkipViolation {
    pub target: String,
    pub origin_slide: usize,
    pub weight: f64,
}

/// Pending forward links of one file
#[derive(Debug, Default)]
pub struct ForwardLinks {
    links: Vec<ForwardLink>,
}

impl ForwardLinks {
    pub fn add(&mut self, target: impl Into<String>, origin_slide: usize) {
        self.links.push(ForwardLink {
            target: target.into(),
            origin_slide,
            origin_question: None,
            origin_closed: false,
            defined_at: None,
        });
    }

    /// Record that `target` is now defined on `slide`
    pub fn define(&mut self, target: &str, slide: usize) {
        for link in self.links.iter_mut().filter(|l| l.target == target) {
            link.defined_at.get_or_insert(slide);
        }
    }

    /// Record that the origin slide closed, carrying `question`
    pub fn close_slide(&mut self, slide: usize, question: Option<usize>) {
        for link in self.links.iter_mut().filter(|l| l.origin_slide == slide) {
            link.origin_closed = true;
            link.origin_question = question;
        }
    }

    /// Resolve every link whose origin slide is closed and whose target is
    /// defined. Returns the skip annotation for each origin question.
    ///
    /// Skipped weight counts the questions strictly between the origin
    /// question and the target slide. The origin question's own weights
    /// are never part of it, so a graded origin question may link forward.
    pub fn settle(
        &mut self,
        weights: &WeightLedger,
    ) -> Result<Vec<(usize, SkipInfo)>, SkipViolation> {
        let (ready, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.links)
            .into_iter()
            .partition(|l| l.origin_closed && l.defined_at.is_some());
        self.links = pending;

        let mut skips = Vec::new();
        for link in ready {
            let (Some(qnumber), Some(def_slide)) = (link.origin_question, link.defined_at) else {
                continue;
            };
            if def_slide <= link.origin_slide {
                continue;
            }
            let last = weights.questions_before(def_slide);
            let (grade, score) = if last > qnumber {
                (
                    weights.grade_between(qnumber, last),
                    weights.score_between(qnumber, last),
                )
            } else {
                (0.0, 0.0)
            };
            if grade != 0.0 {
                return Err(SkipViolation {
                    target: link.target,
                    origin_slide: link.origin_slide,
                    weight: grade,
                });
            }
            skips.push((
                qnumber,
                SkipInfo {
                    target_slide: def_slide,
                    slides_skipped: def_slide - link.origin_slide,
                    score_weight_skipped: score,
                },
            ));
        }
        Ok(skips)
    }

    /// Links never resolved, one per target
    pub fn unresolved(&self) -> Vec<&ForwardLink> {
        let mut seen = std::collections::HashSet::new();
        self.links
            .iter()
            .filter(|l| l.defined_at.is_none() && seen.insert(l.target.as_str()))
            .collect()
    }
}
