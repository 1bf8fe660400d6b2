//! Run-wide concept index.
//!
//! Every slide's `Tags:` line is recorded here after its file compiles.
//! Tags from question slides go to a separate question index, and each
//! question's concept set is kept so that questions sharing concepts can
//! be cross-referenced.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::diagnostics::{Warning, WarningKind};
use crate::model::ConceptTags;
use crate::options::CompileOptions;
use crate::refs::make_id;

/// Navigation query strings longer than this are dropped
pub const MAX_QUERY: usize = 500;

/// Concept sets larger than this are not expanded into subsets
pub const MAX_SUBSET_TAGS: usize = 8;

/// Anchor prefix of the concept index page
pub const INDEX_ID: &str = "slidoc-index";

/// Anchor prefix of the question-concept index page
pub const QINDEX_ID: &str = "slidoc-qindex";

/// A slide that mentions a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub slide_id: String,
    pub header: String,
}

/// tag key -> file -> occurrences
type TagMap = BTreeMap<String, BTreeMap<String, Vec<Occurrence>>>;

/// Primary and secondary occurrences of tags
#[derive(Debug, Clone, Default)]
pub struct TagMaps {
    pub primary: TagMap,
    pub secondary: TagMap,
}

impl TagMaps {
    fn add(&mut self, key: &str, file: &str, occurrence: Occurrence, is_primary: bool) {
        let map = if is_primary {
            &mut self.primary
        } else {
            &mut self.secondary
        };
        map.entry(key.to_string())
            .or_default()
            .entry(file.to_string())
            .or_default()
            .push(occurrence);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.primary.contains_key(key) || self.secondary.contains_key(key)
    }

    fn keys(&self) -> BTreeSet<&str> {
        self.primary
            .keys()
            .chain(self.secondary.keys())
            .map(String::as_str)
            .collect()
    }
}

/// A question somewhere in the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionRef {
    pub file: String,
    pub slide_id: String,
    pub header: String,
    pub qnumber: usize,
}

/// The tags one slide declared, as produced by the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptOccurrence {
    pub file: String,
    pub slide: usize,
    pub slide_id: String,
    pub header: String,
    pub tags: ConceptTags,
    /// qnumber, when the slide carries a question
    pub question: Option<usize>,
}

/// Questions grouped by their exact concept set
#[derive(Debug, Clone, Default)]
pub struct ConceptQuestions {
    /// Every question with its concept set key, in run order
    order: Vec<(QuestionRef, String)>,
    by_set: BTreeMap<String, Vec<QuestionRef>>,
}

impl ConceptQuestions {
    /// Record a question tagged with `tags`
    pub fn add<'a>(&mut self, question: QuestionRef, tags: impl IntoIterator<Item = &'a str>) {
        let key = concept_set_key(tags);
        if key.is_empty() {
            return;
        }
        self.by_set
            .entry(key.clone())
            .or_default()
            .push(question.clone());
        self.order.push((question, key));
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Sorted, lower-cased, `;`-joined
fn concept_set_key<'a>(tags: impl IntoIterator<Item = &'a str>) -> String {
    let set: BTreeSet<String> = tags.into_iter().map(|t| t.to_lowercase()).collect();
    set.into_iter().collect::<Vec<_>>().join(";")
}

/// Concept index accumulated over a run
#[derive(Debug, Default)]
pub struct ConceptIndex {
    general: TagMaps,
    questions: TagMaps,
    display_case: HashMap<String, String>,
    concept_questions: ConceptQuestions,
}

impl ConceptIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn remember_case(&mut self, tag: &str) -> String {
        let key = tag.to_lowercase();
        self.display_case
            .entry(key.clone())
            .or_insert_with(|| tag.to_string());
        key
    }

    /// Record a tag on a non-question slide
    pub fn add_occurrence(
        &mut self,
        tag: &str,
        file: &str,
        slide_id: &str,
        header: &str,
        is_primary: bool,
    ) {
        let key = self.remember_case(tag);
        self.general.add(&key, file, occurrence(slide_id, header), is_primary);
    }

    /// Record a tag on a question slide
    pub fn add_question_occurrence(
        &mut self,
        tag: &str,
        file: &str,
        slide_id: &str,
        header: &str,
        is_primary: bool,
    ) {
        let key = self.remember_case(tag);
        self.questions.add(&key, file, occurrence(slide_id, header), is_primary);
    }

    /// Merge one file's occurrences, in slide order. Question tags never
    /// seen on an earlier slide of the run are reported, unless
    /// `assessment` is set.
    pub fn merge_file(&mut self, occurrences: &[ConceptOccurrence], assessment: bool) -> Vec<Warning> {
        let mut warnings = Vec::new();
        for occ in occurrences {
            let Some(qnumber) = occ.question else {
                for tag in &occ.tags.primary {
                    self.add_occurrence(tag, &occ.file, &occ.slide_id, &occ.header, true);
                }
                for tag in &occ.tags.secondary {
                    self.add_occurrence(tag, &occ.file, &occ.slide_id, &occ.header, false);
                }
                continue;
            };

            if !assessment {
                let tagged = occ
                    .tags
                    .primary
                    .iter()
                    .map(|t| (t, true))
                    .chain(occ.tags.secondary.iter().map(|t| (t, false)));
                for (tag, primary) in tagged {
                    if !self.general.contains(&tag.to_lowercase()) {
                        let warning = Warning::new(
                            occ.file.clone(),
                            Some(occ.slide),
                            WarningKind::ConceptNotCovered {
                                tag: tag.clone(),
                                primary,
                            },
                        );
                        warning.log();
                        warnings.push(warning);
                    }
                }
            }

            for tag in &occ.tags.primary {
                self.add_question_occurrence(tag, &occ.file, &occ.slide_id, &occ.header, true);
            }
            for tag in &occ.tags.secondary {
                self.add_question_occurrence(tag, &occ.file, &occ.slide_id, &occ.header, false);
            }
            self.concept_questions.add(
                QuestionRef {
                    file: occ.file.clone(),
                    slide_id: occ.slide_id.clone(),
                    header: occ.header.clone(),
                    qnumber,
                },
                occ.tags.all(),
            );
        }
        warnings
    }

    pub fn concept_questions(&self) -> &ConceptQuestions {
        &self.concept_questions
    }

    /// Index of tags on content slides
    pub fn build_index(&self, opts: &IndexOptions) -> IndexView {
        build_view(&self.general, &self.display_case, opts)
    }

    /// Index of tags on question slides
    pub fn build_question_index(&self, opts: &IndexOptions) -> IndexView {
        build_view(&self.questions, &self.display_case, opts)
    }
}

fn occurrence(slide_id: &str, header: &str) -> Occurrence {
    Occurrence {
        slide_id: slide_id.to_string(),
        header: header.to_string(),
    }
}

/// Where an index page lives and how it links back to slides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    /// Anchor prefix of the index page
    pub index_id: String,
    /// File name of the index page
    pub index_file: String,
    pub site_url: String,
}

impl IndexOptions {
    pub fn concepts(opts: &CompileOptions) -> Self {
        Self {
            index_id: INDEX_ID.to_string(),
            index_file: opts.index_file.clone(),
            site_url: opts.site_url.clone(),
        }
    }

    pub fn questions(opts: &CompileOptions) -> Self {
        Self {
            index_id: QINDEX_ID.to_string(),
            index_file: opts.qindex_file.clone(),
            site_url: opts.site_url.clone(),
        }
    }
}

/// One slide linked from an index entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexRef {
    pub file: String,
    pub slide_id: String,
    pub header: String,
    pub primary: bool,
    /// Navigation query, absent when it would exceed [`MAX_QUERY`]
    pub query: Option<String>,
}

/// Anchor of a tag's entry on an index page
pub fn concept_anchor(index_id: &str, tag: &str) -> String {
    format!("{index_id}-concept-{}", make_id(tag))
}

/// One tag of the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    /// Tag in its display case
    pub tag: String,
    /// Display label, compressed to `___, rest` after a sibling
    pub label: String,
    pub id: String,
    /// Set on the first entry of a letter group
    pub letter: Option<char>,
    /// A new compound prefix within the same letter group
    pub spacer: bool,
    pub refs: Vec<IndexRef>,
}

/// A rendered-ready concept index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexView {
    pub index_id: String,
    pub letters: Vec<char>,
    pub entries: Vec<IndexEntry>,
    /// tag -> first reference in each file
    pub first_references: BTreeMap<String, Vec<IndexRef>>,
    /// file -> tags it covers as primary, with the first slide covering each
    pub covered_first: BTreeMap<String, BTreeMap<String, Occurrence>>,
}

fn build_view(maps: &TagMaps, display_case: &HashMap<String, String>, opts: &IndexOptions) -> IndexView {
    let mut view = IndexView {
        index_id: opts.index_id.clone(),
        ..IndexView::default()
    };
    let mut prev: Option<(char, String)> = None;

    for key in maps.keys() {
        let tag = display_case.get(key).cloned().unwrap_or_else(|| key.to_string());
        let letter = tag.chars().next().unwrap_or('_').to_ascii_uppercase();
        let first_comp = key.split(',').next().unwrap_or(key).trim().to_string();

        let mut entry = IndexEntry {
            tag: tag.clone(),
            label: tag.clone(),
            id: concept_anchor(&opts.index_id, key),
            letter: None,
            spacer: false,
            refs: Vec::new(),
        };
        match &prev {
            Some((l, _)) if *l != letter => entry.letter = Some(letter),
            None => entry.letter = Some(letter),
            Some((_, comp)) if *comp != first_comp => entry.spacer = true,
            Some(_) => {
                if let Some((_, rest)) = tag.split_once(',') {
                    entry.label = format!("___, {}", rest.trim());
                }
            }
        }
        if let Some(l) = entry.letter {
            view.letters.push(l);
        }
        prev = Some((letter, first_comp));

        let empty = BTreeMap::new();
        let primary = maps.primary.get(key).unwrap_or(&empty);
        let secondary = maps.secondary.get(key).unwrap_or(&empty);

        for (file, occs) in primary {
            if let Some(first) = occs.first() {
                view.covered_first
                    .entry(file.clone())
                    .or_default()
                    .entry(tag.clone())
                    .or_insert_with(|| first.clone());
            }
        }

        let files: BTreeSet<&String> = primary.keys().chain(secondary.keys()).collect();
        let mut refs: Vec<IndexRef> = Vec::new();
        let mut first_refs = Vec::new();
        for file in files {
            let tagged = primary
                .get(file)
                .into_iter()
                .flatten()
                .map(|o| (o, true))
                .chain(secondary.get(file).into_iter().flatten().map(|o| (o, false)));
            let start = refs.len();
            for (occ, is_primary) in tagged {
                if refs.iter().any(|r| r.file == *file && r.slide_id == occ.slide_id) {
                    continue;
                }
                refs.push(IndexRef {
                    file: file.clone(),
                    slide_id: occ.slide_id.clone(),
                    header: occ.header.clone(),
                    primary: is_primary,
                    query: None,
                });
            }
            if let Some(first) = refs.get(start) {
                first_refs.push(first.clone());
            }
        }

        let taglist = refs
            .iter()
            .map(|r| format!("{}#{}", r.file, r.slide_id))
            .collect::<Vec<_>>()
            .join(";");
        let taglist = urlencoding::encode(&taglist).into_owned();
        let conceptref = urlencoding::encode(&format!("{}#{}", opts.index_file, entry.id)).into_owned();
        let concept = urlencoding::encode(&tag).into_owned();
        for (j, r) in refs.iter_mut().enumerate() {
            let query = format!(
                "?tagindex={}&tagconcept={concept}&tagconceptref={conceptref}&taglist={taglist}",
                j + 1
            );
            r.query = (query.len() <= MAX_QUERY).then_some(query);
        }

        entry.refs = refs;
        view.first_references.insert(tag, first_refs);
        view.entries.push(entry);
    }
    view
}

impl IndexView {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// HTML fragment for the index page
    pub fn to_html(&self, site_url: &str) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "<div id=\"{}\" class=\"slidoc-index\">\n<b>INDEX</b><blockquote>\n",
            self.index_id
        ));
        let letters: Vec<String> = self
            .letters
            .iter()
            .map(|l| format!("<a href=\"#{}-letter-{l}\">{l}</a>", self.index_id))
            .collect();
        out.push_str(&letters.join("&nbsp;&nbsp;"));
        out.push_str("\n</blockquote>\n");

        let mut open = false;
        for entry in &self.entries {
            if let Some(l) = entry.letter {
                if open {
                    out.push_str("</ul>\n");
                }
                out.push_str(&format!(
                    "<b id=\"{}-letter-{l}\">{l}</b>\n<ul class=\"slidoc-index-list\">\n",
                    self.index_id
                ));
                open = true;
            } else if entry.spacer {
                out.push_str("<li class=\"slidoc-index-spacer\">&nbsp;</li>\n");
            }

            let links: Vec<String> = entry
                .refs
                .iter()
                .map(|r| {
                    let header = if r.header.is_empty() { "slide" } else { &r.header };
                    let header = crate::render::html::escape(header);
                    let text = if r.primary {
                        format!("<b>{header}</b>")
                    } else {
                        header
                    };
                    format!(
                        "<a href=\"{site_url}{}.html{}#{}\" target=\"_blank\">{text}</a>",
                        r.file,
                        r.query.as_deref().unwrap_or(""),
                        r.slide_id
                    )
                })
                .collect();
            out.push_str(&format!(
                "<li id=\"{}\"><b>{}</b>: {}</li>\n",
                entry.id,
                crate::render::html::escape(&entry.label),
                links.join(", ")
            ));
        }
        if open {
            out.push_str("</ul>\n");
        }
        out.push_str("</div>\n");
        out
    }
}

/// A question and the questions that share some of its concepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubquestionEntry {
    pub question: QuestionRef,
    pub concept_set: String,
    /// `(mark, question)`: mark is the shared subset size, `*` for the full set
    pub related: Vec<(String, QuestionRef)>,
}

/// Cross-reference of questions by concept overlap
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubquestionReport {
    pub entries: Vec<SubquestionEntry>,
    /// Questions whose concept sets were too large to expand: `(question, size)`
    pub oversized: Vec<(QuestionRef, usize)>,
}

impl SubquestionReport {
    /// Sub-question listing for the cross-reference page
    pub fn to_html(&self, site_url: &str) -> String {
        let mut out = String::from(concat!(
            "<p><b>CONCEPT SUB-QUESTIONS</b><br>Sub-questions address a subset of the ",
            "original question's concepts. (*) marks a variant covering the same concepts; ",
            "a number gives how many concepts are shared.</p>\n",
            "<ul class=\"slidoc-subquestions\" style=\"list-style-type: none;\">\n",
        ));
        for entry in &self.entries {
            let related: Vec<String> = entry
                .related
                .iter()
                .map(|(mark, q)| format!("{}<sup>{mark}</sup>", question_link(site_url, q)))
                .collect();
            out.push_str(&format!(
                "<li><b>{}</b>: {}</li>\n",
                question_link(site_url, &entry.question),
                related.join(", ")
            ));
        }
        out.push_str("</ul>\n");
        out
    }
}

fn question_link(site_url: &str, q: &QuestionRef) -> String {
    let header = if q.header.is_empty() { "question" } else { q.header.as_str() };
    format!(
        "<a href=\"{site_url}{}.html#{}\" target=\"_blank\">{}.Q{}: {}</a>",
        q.file,
        q.slide_id,
        crate::render::html::escape(&q.file),
        q.qnumber,
        crate::render::html::escape(header)
    )
}

/// For each question, list the questions whose concept set is exactly a
/// subset of its own, largest subsets first.
pub fn build_subquestion_table(concept_questions: &ConceptQuestions) -> SubquestionReport {
    let mut report = SubquestionReport::default();
    for (question, key) in &concept_questions.order {
        let tags: Vec<&str> = key.split(';').collect();
        let n = tags.len();
        let mut related = Vec::new();

        let sizes: Vec<usize> = if n > MAX_SUBSET_TAGS {
            tracing::warn!(
                file = %question.file,
                qnumber = question.qnumber,
                size = n,
                "concept set too large to expand into subsets"
            );
            report.oversized.push((question.clone(), n));
            vec![n]
        } else {
            (1..=n).rev().collect()
        };

        for size in sizes {
            let mark = if size == n {
                "*".to_string()
            } else {
                size.to_string()
            };
            for subset in combinations(&tags, size) {
                let Some(others) = concept_questions.by_set.get(&subset.join(";")) else {
                    continue;
                };
                for other in others.iter().filter(|o| *o != question) {
                    related.push((mark.clone(), other.clone()));
                }
            }
        }

        report.entries.push(SubquestionEntry {
            question: question.clone(),
            concept_set: key.clone(),
            related,
        });
    }
    report
}

/// All `k`-element combinations of `items`, in lexicographic index order
fn combinations<'a>(items: &[&'a str], k: usize) -> Vec<Vec<&'a str>> {
    let n = items.len();
    if k == 0 || k > n {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.iter().map(|&i| items[i]).collect());
        let Some(i) = (0..k).rev().find(|&i| idx[i] != i + n - k) else {
            break;
        };
        idx[i] += 1;
        for j in i + 1..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occ(file: &str, slide: usize, primary: &[&str], question: Option<usize>) -> ConceptOccurrence {
        ConceptOccurrence {
            file: file.to_string(),
            slide,
            slide_id: format!("{file}-{slide:02}"),
            header: format!("Slide {slide}"),
            tags: ConceptTags {
                primary: primary.iter().map(|s| s.to_string()).collect(),
                secondary: Vec::new(),
            },
            question,
        }
    }

    fn opts() -> IndexOptions {
        IndexOptions::concepts(&CompileOptions::default())
    }

    #[test]
    fn test_compound_prefix_compression() {
        let mut index = ConceptIndex::new();
        index.add_occurrence("arrays", "a", "a-01", "Arrays", true);
        index.add_occurrence("arrays,sorting", "a", "a-02", "Sorting", true);
        index.add_occurrence("Algorithms", "a", "a-03", "", false);
        index.add_occurrence("binary search", "b", "b-01", "Search", true);
        index.add_occurrence("asymptotics", "a", "a-04", "", true);

        let view = index.build_index(&opts());
        let labels: Vec<&str> = view.entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Algorithms", "arrays", "___, sorting", "asymptotics", "binary search"]
        );
        assert_eq!(view.letters, vec!['A', 'B']);
        assert!(view.entries[1].spacer);
        assert!(view.entries[3].spacer);
        assert_eq!(view.entries[4].letter, Some('B'));
        assert_eq!(view.entries[1].id, "slidoc-index-concept-arrays");
    }

    #[test]
    fn test_refs_and_queries() {
        let mut index = ConceptIndex::new();
        index.add_occurrence("loops", "b", "b-02", "While", false);
        index.add_occurrence("loops", "a", "a-01", "For", true);
        index.add_occurrence("loops", "a", "a-01", "For", false);

        let view = index.build_index(&opts());
        let refs = &view.entries[0].refs;
        assert_eq!(refs.len(), 2);
        assert_eq!((refs[0].file.as_str(), refs[0].primary), ("a", true));
        assert_eq!((refs[1].file.as_str(), refs[1].primary), ("b", false));
        let query = refs[1].query.as_deref().unwrap();
        assert!(query.starts_with("?tagindex=2&tagconcept=loops&tagconceptref=ind.html%23"));
        assert!(query.ends_with("taglist=a%23a-01%3Bb%23b-02"));

        assert_eq!(view.covered_first["a"]["loops"].slide_id, "a-01");
        assert!(!view.covered_first.contains_key("b"));
        assert_eq!(view.first_references["loops"].len(), 2);
    }

    #[test]
    fn test_long_query_dropped() {
        let mut index = ConceptIndex::new();
        for i in 0..60 {
            index.add_occurrence("recursion", &format!("file{i:02}"), "slidoc01-01", "", true);
        }
        let view = index.build_index(&opts());
        assert!(view.entries[0].refs.iter().all(|r| r.query.is_none()));
    }

    #[test]
    fn test_display_case_first_wins() {
        let mut index = ConceptIndex::new();
        index.add_occurrence("Recursion", "a", "a-01", "", true);
        index.add_occurrence("recursion", "a", "a-02", "", true);
        let view = index.build_index(&opts());
        assert_eq!(view.entries.len(), 1);
        assert_eq!(view.entries[0].tag, "Recursion");
        assert_eq!(view.entries[0].refs.len(), 2);
    }

    #[test]
    fn test_coverage_warnings() {
        let mut index = ConceptIndex::new();
        let warnings = index.merge_file(
            &[
                occ("a", 1, &["loops"], None),
                occ("a", 2, &["Loops", "recursion"], Some(1)),
            ],
            false,
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].slide, Some(2));
        assert_eq!(
            warnings[0].kind,
            WarningKind::ConceptNotCovered {
                tag: "recursion".into(),
                primary: true
            }
        );

        let mut index = ConceptIndex::new();
        let warnings = index.merge_file(&[occ("a", 2, &["recursion"], Some(1))], true);
        assert!(warnings.is_empty());
        assert_eq!(index.concept_questions().len(), 1);
    }

    #[test]
    fn test_subquestions() {
        let mut index = ConceptIndex::new();
        index.merge_file(
            &[
                occ("a", 1, &["a", "b", "c"], Some(1)),
                occ("a", 2, &["b", "a"], Some(2)),
                occ("a", 3, &["c", "b", "a"], Some(3)),
                occ("a", 4, &["d"], Some(4)),
            ],
            true,
        );
        let report = build_subquestion_table(index.concept_questions());
        let first = &report.entries[0];
        assert_eq!(first.concept_set, "a;b;c");
        let marks: Vec<(&str, usize)> = first
            .related
            .iter()
            .map(|(m, q)| (m.as_str(), q.qnumber))
            .collect();
        assert_eq!(marks, vec![("*", 3), ("2", 2)]);

        // the {a,b} question sees no larger sets
        assert!(report.entries[1].related.is_empty());
        assert!(report.entries[3].related.is_empty());

        let html = report.to_html("/site/");
        assert!(html.contains(concat!(
            "<li><b><a href=\"/site/a.html#a-01\" target=\"_blank\">a.Q1: Slide 1</a></b>: ",
            "<a href=\"/site/a.html#a-03\" target=\"_blank\">a.Q3: Slide 3</a><sup>*</sup>, ",
            "<a href=\"/site/a.html#a-02\" target=\"_blank\">a.Q2: Slide 2</a><sup>2</sup></li>"
        )));
        assert!(html.contains("<li><b><a href=\"/site/a.html#a-04\" target=\"_blank\">a.Q4: Slide 4</a></b>: </li>"));
    }

    #[test]
    fn test_oversized_sets_only_match_exactly() {
        let tags: Vec<String> = (0..10).map(|i| format!("t{i}")).collect();
        let mut questions = ConceptQuestions::default();
        let q = |n| QuestionRef {
            file: "a".into(),
            slide_id: format!("a-{n}"),
            header: String::new(),
            qnumber: n,
        };
        questions.add(q(1), tags.iter().map(String::as_str));
        questions.add(q(2), tags.iter().map(String::as_str));
        questions.add(q(3), ["t0"]);

        let report = build_subquestion_table(&questions);
        assert_eq!(report.oversized.len(), 2);
        assert_eq!(report.entries[0].related.len(), 1);
        assert_eq!(report.entries[0].related[0].0, "*");
    }

    #[test]
    fn test_combinations() {
        let items = ["a", "b", "c"];
        assert_eq!(
            combinations(&items, 2),
            vec![vec!["a", "b"], vec!["a", "c"], vec!["b", "c"]]
        );
        assert_eq!(combinations(&items, 3).len(), 1);
        assert!(combinations(&items, 4).is_empty());
    }

    #[test]
    fn test_index_html() {
        let mut index = ConceptIndex::new();
        index.add_occurrence("arrays", "a", "slidoc01-01", "Arrays", true);
        let html = index.build_index(&opts()).to_html("");
        assert!(html.contains("<b id=\"slidoc-index-letter-A\">A</b>"));
        assert!(html.contains("<li id=\"slidoc-index-concept-arrays\"><b>arrays</b>: <a href=\"a.html?tagindex=1"));
        assert!(html.contains("#slidoc01-01\" target=\"_blank\"><b>Arrays</b></a>"));
    }
}
