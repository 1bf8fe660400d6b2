//! Slide renderer.
//!
//! Consumes a file's token stream in order and produces both the slide
//! HTML ([`Document`]) and the [`DocumentModel`]. State is split in two:
//! [`FileState`] holds cross-slide accumulators (references, weights,
//! questions), [`SlideState`] is rebuilt at every slide boundary.
//!
//! Slide boundaries are detected here with the same rule the tokenizer
//! uses for raw slices; the two counts are compared at the end of the file.

pub mod html;
mod inline;

use std::collections::BTreeSet;

use regex::Regex;

use crate::answer::{AnswerOptions, AnswerSpec, parse_answer};
use crate::concepts::ConceptOccurrence;
use crate::diagnostics::{Diagnostics, Warning, WarningKind};
use crate::digest::digest;
use crate::doc::{Document, Fragment, SlideHtml};
use crate::error::{CompileError, Location, Result, SyntaxError};
use crate::grammar::HEADING_ID_RE;
use crate::inline::tokenize_inline;
use crate::model::{
    BlockKind, ConceptTags, CorrectSpec, DocumentModel, PluginDefinition, PluginEmbed, QType,
    Question, RefKind, Slide, chapter_id, slide_id,
};
use crate::options::{CompileOptions, Feature, Strip};
use crate::plugin::{
    Highlighter, ImageResolver, PluginRegistry, TemplateFields, substitute, template_fields,
};
use crate::refs::{Defined, ForwardLinks, RefDecl, RefTable, ref_id, ref_key};
use crate::token::{InlineToken, Token, TokenStream};
use crate::weights::WeightLedger;

use html::{escape, escape_attr};

/// Everything the renderer reads but never changes
pub struct RenderContext<'a> {
    pub file: &'a str,
    pub file_number: usize,
    /// Run options merged with the file's defaults header
    pub options: &'a CompileOptions,
    pub plugins: &'a PluginRegistry,
    pub hide: Option<&'a Regex>,
    pub highlighter: Option<&'a dyn Highlighter>,
    pub images: Option<&'a dyn ImageResolver>,
}

/// Result of rendering one file
#[derive(Debug)]
pub struct Rendered {
    pub model: DocumentModel,
    pub document: Document,
    /// Tags declared on each slide, in slide order
    pub concepts: Vec<ConceptOccurrence>,
    pub warnings: Vec<Warning>,
}

/// Render a tokenized, preprocessed file
pub fn render(ctx: &RenderContext<'_>, source: &str, stream: &TokenStream) -> Result<Rendered> {
    let _span = tracing::debug_span!("render", file = ctx.file).entered();
    let mut renderer = Renderer::new(ctx, source, stream);
    renderer.run()?;
    renderer.finish()
}

/// Accumulators that live for the whole file
struct FileState {
    refs: RefTable,
    forward: ForwardLinks,
    weights: WeightLedger,
    questions: Vec<Question>,
    slides: Vec<Slide>,
    html: Vec<SlideHtml>,
    concepts: Vec<ConceptOccurrence>,
    diagnostics: Diagnostics,
    header: Option<String>,
    sections: usize,
    toc: Vec<(String, String)>,
    embeds: Vec<PluginEmbed>,
    definitions: Vec<PluginDefinition>,
    /// Plugins whose `top` template has been emitted
    loaded: BTreeSet<String>,
    head: Vec<String>,
}

#[derive(Debug)]
struct ChoiceState {
    next: char,
    count: usize,
    restatements: usize,
    alternatives: Vec<char>,
    /// The choice blockquote is open
    open: bool,
}

impl Default for ChoiceState {
    fn default() -> Self {
        Self {
            next: 'A',
            count: 0,
            restatements: 0,
            alternatives: Vec::new(),
            open: false,
        }
    }
}

/// State of the slide being rendered
#[derive(Debug, Default)]
struct SlideState {
    number: usize,
    id: String,
    token_start: usize,
    header: Option<String>,
    headings: usize,
    has_content: bool,
    /// Block quote nesting
    depth: usize,
    /// Open blocks, outermost first
    blocks: Vec<BlockKind>,
    /// Every block opened on this slide
    opened: Vec<BlockKind>,
    /// Hint or Notes after Extra: parsed, output dropped
    discarding: bool,
    notes_seen: bool,
    hint_count: usize,
    /// Open list, `true` when ordered
    list: Option<bool>,
    choice: ChoiceState,
    answer: Option<AnswerSpec>,
    tags: Option<ConceptTags>,
    hints: Vec<f64>,
    embeds: Vec<String>,
    inline_plugins: Vec<String>,
    images: Vec<String>,
    discuss: bool,
    html: SlideHtml,
    discard: Vec<Fragment>,
}

impl SlideState {
    fn new(file_number: usize, number: usize, token_start: usize) -> Self {
        let id = slide_id(file_number, number);
        Self {
            number,
            html: SlideHtml::new(number, id.clone()),
            id,
            token_start,
            ..Self::default()
        }
    }
}

struct Renderer<'a> {
    ctx: &'a RenderContext<'a>,
    source: &'a str,
    stream: &'a TokenStream,
    file: FileState,
    slide: SlideState,
}

impl<'a> Renderer<'a> {
    fn new(ctx: &'a RenderContext<'a>, source: &'a str, stream: &'a TokenStream) -> Self {
        Self {
            ctx,
            source,
            stream,
            file: FileState {
                refs: RefTable::new(ctx.file_number),
                forward: ForwardLinks::default(),
                weights: WeightLedger::new(),
                questions: Vec::new(),
                slides: Vec::new(),
                html: Vec::new(),
                concepts: Vec::new(),
                diagnostics: Diagnostics::new(ctx.file),
                header: None,
                sections: 0,
                toc: Vec::new(),
                embeds: Vec::new(),
                definitions: Vec::new(),
                loaded: BTreeSet::new(),
                head: Vec::new(),
            },
            slide: SlideState::new(ctx.file_number, 1, 0),
        }
    }

    fn run(&mut self) -> Result<()> {
        for (i, token) in self.stream.tokens.iter().enumerate() {
            if self.slide.depth == 0 {
                if token.ends_slide() {
                    self.close_slide(i + 1)?;
                    self.open_slide(i + 1);
                    continue;
                }
                if token.starts_slide() && self.slide.has_content {
                    self.close_slide(i)?;
                    self.open_slide(i);
                }
                if token.is_content() {
                    self.slide.has_content = true;
                }
            }
            self.token(token)?;
        }
        self.close_slide(self.stream.tokens.len())
    }

    fn finish(mut self) -> Result<Rendered> {
        let ctx = self.ctx;
        if self.file.slides.len() != self.stream.slide_count() {
            return Err(CompileError::SlideCountMismatch {
                file: ctx.file.to_string(),
                tokenizer: self.stream.slide_count(),
                renderer: self.file.slides.len(),
            });
        }

        let unresolved: Vec<(String, usize)> = self
            .file
            .forward
            .unresolved()
            .into_iter()
            .map(|l| (l.target.clone(), l.origin_slide))
            .collect();
        for (id, slide) in unresolved {
            self.file
                .diagnostics
                .warn(Some(slide), WarningKind::UnresolvedForwardLink { id });
        }

        let refs = self.file.refs;
        let mut document = Document {
            chapter_id: chapter_id(ctx.file_number),
            head: self.file.head,
            slides: self.file.html,
            rules: !ctx.options.strips(Strip::Rule),
        };
        document.resolve(|id| refs.get(id).map(|r| r.label.clone()));

        let (cum_score, cum_grade) = self.file.weights.into_arrays();
        let model = DocumentModel {
            file: ctx.file.to_string(),
            file_number: ctx.file_number,
            chapter_id: chapter_id(ctx.file_number),
            header: self.file.header,
            slides: self.file.slides,
            questions: self.file.questions,
            cum_score,
            cum_grade,
            references: refs.into_references(),
            plugin_embeds: self.file.embeds,
            plugin_definitions: self.file.definitions,
            toc: self.file.toc,
        };
        tracing::debug!(
            slides = model.slides.len(),
            questions = model.questions.len(),
            "rendered"
        );
        Ok(Rendered {
            model,
            document,
            concepts: self.file.concepts,
            warnings: self.file.diagnostics.into_warnings(),
        })
    }

    fn loc(&self) -> Location {
        Location::new(self.ctx.file, self.slide.number)
    }

    fn syntax(&self, kind: SyntaxError) -> CompileError {
        CompileError::syntax(self.loc(), kind)
    }

    fn warn(&mut self, kind: WarningKind) {
        let slide = self.slide.number;
        self.file.diagnostics.warn(Some(slide), kind);
    }

    fn stripped(&self, kind: BlockKind) -> bool {
        match kind {
            BlockKind::Notes => self.ctx.options.strips(Strip::Notes),
            BlockKind::Hidden => self.ctx.options.strips(Strip::Hidden),
            BlockKind::Hint | BlockKind::Extra => false,
        }
    }

    /// Where output currently goes
    fn sink(&mut self) -> &mut Vec<Fragment> {
        let discard = self.slide.discarding
            || self.slide.blocks.iter().any(|kind| self.stripped(*kind));
        if discard {
            &mut self.slide.discard
        } else {
            &mut self.slide.html.fragments
        }
    }

    fn emit(&mut self, html: impl Into<String>) {
        let html = html.into();
        self.sink().push(Fragment::Html(html));
    }

    fn emit_all(&mut self, fragments: Vec<Fragment>) {
        self.sink().extend(fragments);
    }

    // === Slides ===

    fn open_slide(&mut self, token_start: usize) {
        let number = self.slide.number + 1;
        self.slide = SlideState::new(self.ctx.file_number, number, token_start);
    }

    fn close_slide(&mut self, token_end: usize) -> Result<()> {
        self.slide.discarding = false;
        self.close_list();
        self.close_choices();
        for kind in [BlockKind::Extra, BlockKind::Hint, BlockKind::Notes, BlockKind::Hidden] {
            self.close_block(kind);
        }

        let question = self.finish_question()?;

        let mut missing: Vec<String> = Vec::new();
        for plugin in &self.slide.inline_plugins {
            if !self.slide.embeds.contains(plugin) && !missing.contains(plugin) {
                missing.push(plugin.clone());
            }
        }
        for plugin in missing {
            self.warn(WarningKind::MissingInlinePlugin { plugin });
        }

        let slide = std::mem::take(&mut self.slide);
        let tags = slide.tags.unwrap_or_default();
        if !tags.is_empty() {
            self.file.concepts.push(ConceptOccurrence {
                file: self.ctx.file.to_string(),
                slide: slide.number,
                slide_id: slide.id.clone(),
                header: slide.header.clone().unwrap_or_default(),
                tags: tags.clone(),
                question,
            });
        }

        let mut html = slide.html;
        if self.ctx.options.number && slide.header.is_none() {
            html.fragments.insert(
                0,
                Fragment::Html(format!(
                    "<h3 class=\"slidoc-untitled\">Slide {}.{}</h3>\n",
                    self.ctx.file_number, slide.number
                )),
            );
        }
        self.file.html.push(html);
        self.file.slides.push(Slide {
            number: slide.number,
            id: slide.id,
            header: slide.header,
            concept_tags: tags,
            question,
            token_start: slide.token_start,
            token_end,
            blocks: slide.opened,
            images: slide.images,
            discuss: slide.discuss,
            plugins: slide.embeds,
        });
        // restore the number so open_slide can advance it
        self.slide.number = self.file.slides.len();

        self.file.forward.close_slide(self.file.slides.len(), question);
        self.settle()
    }

    /// Validate and record the slide's question, if it has one
    fn finish_question(&mut self) -> Result<Option<usize>> {
        let choices = self.slide.choice.count;
        let spec = match self.slide.answer.take() {
            Some(spec) => spec,
            None if choices > 0 => AnswerSpec {
                qtype: None,
                correct: None,
                required_plugin: None,
                options: AnswerOptions::default(),
            },
            None => return Ok(None),
        };

        let qtype = match spec.qtype {
            Some(qtype) => qtype,
            None if choices > 0 => QType::Choice,
            None => QType::Text,
        };
        let shown = spec
            .correct
            .as_ref()
            .map(CorrectSpec::display_value)
            .unwrap_or_default();
        if qtype.is_choice() {
            if choices == 0 {
                return Err(self.syntax(SyntaxError::InvalidAnswer {
                    text: shown,
                    reason: "no choices presented".into(),
                }));
            }
            if let Some(CorrectSpec::Choices { letters }) = &spec.correct
                && let Some(bad) = letters.iter().find(|l| !presented(**l, choices))
            {
                return Err(self.syntax(SyntaxError::InvalidAnswer {
                    text: shown,
                    reason: format!("choice '{bad}' was not presented"),
                }));
            }
        }
        if let Some(plugin) = &spec.required_plugin
            && !self.slide.embeds.contains(plugin)
        {
            return Err(self.syntax(SyntaxError::MissingPlugin {
                plugin: plugin.clone(),
            }));
        }

        let opts = spec.options;
        let qnumber = self
            .file
            .weights
            .push(self.slide.number, opts.weight, opts.gweight);
        let raw = self
            .stream
            .slices
            .get(self.slide.number - 1)
            .map_or("", |s| s.text(self.source));
        self.file.questions.push(Question {
            qnumber,
            slide: self.slide.number,
            slide_id: self.slide.id.clone(),
            qtype,
            correct: spec.correct,
            weight: opts.weight,
            gweight: opts.gweight,
            vweight: opts.vweight,
            options: opts.question,
            retry: opts.retry,
            hints: std::mem::take(&mut self.slide.hints),
            digest: digest(raw),
            choices,
            alternatives: std::mem::take(&mut self.slide.choice.alternatives),
            skip: None,
        });
        tracing::trace!(qnumber, slide = self.slide.number, "question");
        Ok(Some(qnumber))
    }

    /// Apply every forward link that can now be resolved
    fn settle(&mut self) -> Result<()> {
        match self.file.forward.settle(&self.file.weights) {
            Ok(skips) => {
                for (qnumber, skip) in skips {
                    if let Some(q) = self.file.questions.get_mut(qnumber - 1) {
                        q.skip = Some(skip);
                    }
                }
                Ok(())
            }
            Err(violation) => Err(CompileError::ForwardLinkSkipsGraded {
                loc: Location::new(self.ctx.file, violation.origin_slide),
                target: violation.target,
                weight: violation.weight,
            }),
        }
    }

    /// Define a reference on the current slide
    fn define_ref(&mut self, id: &str, kind: RefKind, counter: &str) -> Result<Defined> {
        let defined = self
            .file
            .refs
            .define(id, kind, counter, self.slide.number);
        if let Defined::Duplicate { id, renamed, .. } = &defined {
            self.warn(WarningKind::DuplicateReference {
                id: id.clone(),
                renamed: renamed.clone(),
            });
        } else {
            self.file.forward.define(id, self.slide.number);
            self.settle()?;
        }
        Ok(defined)
    }

    // === Blocks ===

    fn open_block(&mut self, kind: BlockKind) -> Result<()> {
        if self.slide.blocks.contains(&kind) {
            return Err(self.syntax(SyntaxError::BlockAlreadyOpen { kind }));
        }
        self.slide.blocks.push(kind);
        self.slide.opened.push(kind);
        let id = match kind {
            BlockKind::Hint => {
                self.slide.hint_count += 1;
                format!("{}-hint-{}", self.slide.id, self.slide.hint_count)
            }
            _ => format!("{}-{kind}", self.slide.id),
        };
        self.emit(format!(
            "<!--slidoc-{kind}-block-begin[{id}]--><div id=\"{id}\" class=\"slidoc-{kind} {id}\">\n"
        ));
        Ok(())
    }

    /// Close `kind` and anything opened inside it
    fn close_block(&mut self, kind: BlockKind) {
        let Some(pos) = self.slide.blocks.iter().position(|k| *k == kind) else {
            return;
        };
        while self.slide.blocks.len() > pos {
            let Some(&inner) = self.slide.blocks.last() else {
                break;
            };
            let id = match inner {
                BlockKind::Hint => format!("{}-hint-{}", self.slide.id, self.slide.hint_count),
                _ => format!("{}-{inner}", self.slide.id),
            };
            self.emit(format!("</div><!--slidoc-{inner}-block-end[{id}]-->\n"));
            self.slide.blocks.pop();
        }
    }

    fn close_list(&mut self) {
        if let Some(ordered) = self.slide.list.take() {
            self.emit(if ordered { "</ol>\n" } else { "</ul>\n" });
        }
    }

    fn close_choices(&mut self) {
        if self.slide.choice.open {
            self.slide.choice.open = false;
            self.emit("</blockquote>\n");
        }
    }

    // === Tokens ===

    fn token(&mut self, token: &Token) -> Result<()> {
        if !matches!(token, Token::ListItem { .. }) {
            self.close_list();
        }
        match token {
            Token::Text { text } => self.text(text)?,
            Token::Heading { level, text } => self.heading(*level, text)?,
            Token::BlockMath { text } => self.emit(format!(
                "<div class=\"slidoc-block-math\">$${}$$</div>\n",
                escape(text)
            )),
            Token::LatexEnvironment { name, text } => self.emit(format!(
                "<div class=\"slidoc-latex slidoc-latex-{}\">{}</div>\n",
                escape_attr(name),
                escape(text)
            )),
            Token::PluginDefinition { name, text } => {
                if !self.ctx.plugins.contains(name) {
                    tracing::debug!(plugin = %name, "inline plugin definition");
                }
                self.file.definitions.push(PluginDefinition {
                    name: name.clone(),
                    text: text.clone(),
                });
            }
            Token::PluginEmbed { name, args } => self.embed(name, args)?,
            Token::SlidocHeader { name, text } => {
                if name != "defaults" {
                    self.emit(format!("<!--slidoc-{name} {}-->\n", text.replace("--", "- -")));
                }
            }
            Token::Answer { text } => self.answer(text)?,
            Token::Discuss { text } => self.discuss(text)?,
            Token::Tags { text } => self.tags(text)?,
            Token::Hint { penalty } => self.hint(*penalty)?,
            Token::Notes => self.notes()?,
            Token::Extra => self.extra()?,
            Token::Minirule => self.emit("<hr class=\"slidoc-minirule\">\n"),
            Token::Pause => self.emit("<span class=\"slidoc-pause\"></span>\n"),
            Token::Hrule => self.emit("<hr>\n"),
            Token::ListItem { ordered, text } => {
                if self.slide.list.is_some_and(|o| o != *ordered) {
                    self.close_list();
                }
                if self.slide.list.is_none() {
                    self.slide.list = Some(*ordered);
                    self.emit(if *ordered { "<ol>\n" } else { "<ul>\n" });
                }
                let body = self.inline(tokenize_inline(text))?;
                self.emit("<li>");
                self.emit_all(body);
                self.emit("</li>\n");
            }
            Token::BlockCode { lang, code } => {
                let highlighted = self
                    .ctx
                    .highlighter
                    .and_then(|h| h.highlight(code, lang.as_deref()));
                let html = highlighted.unwrap_or_else(|| match lang {
                    Some(lang) => format!(
                        "<pre><code class=\"language-{}\">{}</code></pre>\n",
                        escape_attr(lang),
                        escape(code)
                    ),
                    None => format!("<pre><code>{}</code></pre>\n", escape(code)),
                });
                self.emit(html);
            }
            Token::QuoteStart => {
                self.slide.depth += 1;
                self.emit("<blockquote>\n");
            }
            Token::QuoteEnd => {
                self.slide.depth = self.slide.depth.saturating_sub(1);
                self.emit("</blockquote>\n");
            }
            Token::Html { text } => self.emit(format!("{text}\n")),
        }
        Ok(())
    }

    /// A paragraph, possibly carrying choice lines
    fn text(&mut self, text: &str) -> Result<()> {
        let tokens = tokenize_inline(text);
        if !tokens
            .iter()
            .any(|t| matches!(t, InlineToken::ChoiceMarker { .. }))
        {
            let body = self.inline(tokens)?;
            self.emit("<p>");
            self.emit_all(body);
            self.emit("</p>\n");
            return Ok(());
        }

        let mut current: Vec<InlineToken> = Vec::new();
        let mut marker: Option<char> = None;
        for token in tokens {
            if let InlineToken::ChoiceMarker { letter, alternative } = token {
                self.choice_item(marker, std::mem::take(&mut current))?;
                self.choice(letter, alternative)?;
                marker = Some(letter);
            } else {
                current.push(token);
            }
        }
        self.choice_item(marker, current)
    }

    /// Emit the text following a choice marker, or the lead-in before any
    fn choice_item(&mut self, marker: Option<char>, tokens: Vec<InlineToken>) -> Result<()> {
        let body = self.inline(tokens)?;
        match marker {
            None if body.is_empty() => {}
            None => {
                self.emit("<p>");
                self.emit_all(body);
                self.emit("</p>\n");
            }
            Some('Q') => {
                self.emit("<div class=\"slidoc-choice-question\">");
                self.emit_all(body);
                self.emit("</div>\n");
            }
            Some(letter) => {
                self.emit(format!(
                    "<div class=\"slidoc-choice-item\" data-choice=\"{letter}\"><span class=\"slidoc-choice\">{letter}</span>. "
                ));
                self.emit_all(body);
                self.emit("</div>\n");
            }
        }
        Ok(())
    }

    /// Sequence a choice marker
    fn choice(&mut self, letter: char, alternative: bool) -> Result<()> {
        if let Some(qtype) = self.slide.answer.as_ref().and_then(|a| a.qtype.as_ref())
            && !qtype.is_choice()
        {
            return Err(self.syntax(SyntaxError::ChoiceTypeConflict {
                letter,
                qtype: qtype.keyword(),
            }));
        }

        let multiplicity = self.ctx.options.has(Feature::Multiplicity);
        let state = &mut self.slide.choice;
        let expected = state.next;
        let previous = char::from_u32(expected as u32 - 1).unwrap_or('A');
        let result = if letter == 'Q' {
            if state.count > 0 || state.restatements >= 2 {
                Err(SyntaxError::ChoiceOutOfSequence {
                    expected,
                    found: letter,
                })
            } else {
                state.restatements += 1;
                Ok(())
            }
        } else if letter == expected {
            state.count += 1;
            state.next = char::from_u32(expected as u32 + 1).unwrap_or(expected);
            Ok(())
        } else if alternative && state.count > 0 && letter == previous {
            if multiplicity {
                state.alternatives.push(letter);
                Ok(())
            } else {
                Err(SyntaxError::AlternativeChoice { letter })
            }
        } else {
            Err(SyntaxError::ChoiceOutOfSequence {
                expected,
                found: letter,
            })
        };
        result.map_err(|kind| self.syntax(kind))?;

        if !self.slide.choice.open {
            self.slide.choice.open = true;
            self.emit("<blockquote class=\"slidoc-choice-question\">\n");
        }
        Ok(())
    }

    fn heading(&mut self, level: u8, raw: &str) -> Result<()> {
        let (text, explicit) = match HEADING_ID_RE.captures(raw) {
            Some(c) => (
                raw[..c.get(0).map_or(raw.len(), |m| m.start())].trim(),
                c.get(1).map(|m| m.as_str().to_string()),
            ),
            None => (raw.trim(), None),
        };

        self.slide.headings += 1;
        if self.slide.headings == 1
            && matches!(level, 2 | 3)
            && self.ctx.hide.is_some_and(|re| re.is_match(text))
        {
            self.open_block(BlockKind::Hidden)?;
        }

        let opts = self.ctx.options;
        let mut prefix = String::new();
        match level {
            1 if self.file.header.is_none() => {
                self.file.header = Some(text.to_string());
                if !opts.strips(Strip::Chapters) {
                    prefix = format!("{}. ", self.ctx.file_number);
                }
            }
            2 => {
                self.file.sections += 1;
                self.file.toc.push((self.slide.id.clone(), text.to_string()));
                if !opts.strips(Strip::Sections) {
                    prefix = format!("{}.{} ", self.ctx.file_number, self.file.sections);
                }
            }
            _ => {}
        }
        if self.slide.header.is_none() && !text.is_empty() {
            self.slide.header = Some(text.to_string());
        }

        let id = match explicit {
            Some(raw_id) => {
                let decl = RefDecl::parse(&raw_id, text);
                let defined = self.define_ref(&decl.id(), decl.kind, &ref_key(text))?;
                Some(defined.rendered_id().to_string())
            }
            None if !text.is_empty() => {
                let id = ref_id(text);
                if self.file.refs.contains(&id) {
                    None
                } else {
                    let defined =
                        self.define_ref(&id, RefKind::Plain, &ref_key(text))?;
                    Some(defined.rendered_id().to_string())
                }
            }
            None => None,
        };

        let body = self.inline(tokenize_inline(text))?;
        let id_attr = id.map_or(String::new(), |id| format!(" id=\"{id}\""));
        self.emit(format!("<h{level}{id_attr}>{}", escape(&prefix)));
        self.emit_all(body);
        self.emit(format!("</h{level}>\n"));
        Ok(())
    }

    fn embed(&mut self, name: &str, args: &str) -> Result<()> {
        if self.slide.embeds.iter().any(|n| n == name) {
            return Err(self.syntax(SyntaxError::DuplicatePluginEmbed {
                plugin: name.to_string(),
            }));
        }
        self.slide.embeds.push(name.to_string());

        let Some(def) = self.ctx.plugins.get(name) else {
            self.warn(WarningKind::UnknownPlugin {
                plugin: name.to_string(),
            });
            self.emit(format!(
                "<div class=\"slidoc-plugin-missing\">={}({})</div>\n",
                escape(name),
                escape(args)
            ));
            return Ok(());
        };

        let slide_id = self.slide.id.clone();
        let fields = TemplateFields {
            name,
            slide_id: &slide_id,
            args,
            file_number: self.ctx.file_number,
        };
        let loc = self.loc();
        let fill = |template: &str| {
            substitute(template, &fields).map_err(|reason| CompileError::Template {
                loc: loc.clone(),
                plugin: name.to_string(),
                reason,
            })
        };

        let first_load = !self.file.loaded.contains(name);
        let head = if first_load && !def.head.is_empty() {
            Some(fill(&def.head)?)
        } else {
            None
        };
        let top = if first_load { fill(&def.top)? } else { String::new() };
        let body = fill(&def.body)?;
        let button = fill(&def.button)?;

        self.file.loaded.insert(name.to_string());
        if let Some(head) = head {
            self.file.head.push(head);
        }
        self.emit(format!(
            "<div id=\"{slide_id}-plugin-{name}\" class=\"slidoc-plugin slidoc-plugin-{name}\">\n{top}{body}{button}</div>\n"
        ));
        self.file.embeds.push(PluginEmbed {
            name: name.to_string(),
            slide: self.slide.number,
            first_load,
            args: args.to_string(),
            body_template_fields: template_fields(&def.body),
        });
        Ok(())
    }

    fn answer(&mut self, text: &str) -> Result<()> {
        self.close_block(BlockKind::Hint);
        self.close_choices();
        if self.slide.answer.is_some() {
            self.warn(WarningKind::DuplicateAnswer);
            return Ok(());
        }

        let has_choices = self.slide.choice.count > 0;
        let spec = parse_answer(text, has_choices, self.ctx.plugins)
            .map_err(|kind| self.syntax(kind))?;
        if has_choices
            && let Some(qtype) = &spec.qtype
            && !qtype.is_choice()
        {
            return Err(self.syntax(SyntaxError::AnswerTypeConflict {
                expected: QType::Choice.keyword(),
                found: qtype.keyword(),
            }));
        }

        let qtype = spec
            .qtype
            .as_ref()
            .map_or_else(|| "choice".to_string(), QType::keyword);
        let value = match (&spec.correct, self.ctx.options.strips(Strip::Answers)) {
            (Some(correct), false) => format!(
                " <span class=\"slidoc-answer-value\">{}</span>",
                escape(&correct.display_value())
            ),
            _ => String::new(),
        };
        self.emit(format!(
            "<div id=\"{}-answer\" class=\"slidoc-answer\" data-qtype=\"{}\">Answer:{value}</div>\n",
            self.slide.id,
            escape_attr(&qtype)
        ));
        self.slide.answer = Some(spec);
        Ok(())
    }

    fn discuss(&mut self, text: &str) -> Result<()> {
        self.close_choices();
        self.slide.discuss = true;
        let body = self.inline(tokenize_inline(text))?;
        self.emit(format!(
            "<div id=\"{}-discuss\" class=\"slidoc-discuss\">",
            self.slide.id
        ));
        self.emit_all(body);
        self.emit("</div>\n");
        Ok(())
    }

    fn tags(&mut self, text: &str) -> Result<()> {
        self.close_choices();
        if self.slide.notes_seen {
            self.warn(WarningKind::TagsAfterNotes);
            return Ok(());
        }
        if self.slide.tags.is_some() {
            return Err(self.syntax(SyntaxError::DuplicateTags));
        }
        let tags = ConceptTags::parse(text);
        if !self.ctx.options.strips(Strip::Concepts) && !tags.is_empty() {
            let links: Vec<String> = tags
                .all()
                .map(|tag| {
                    format!(
                        "<a class=\"slidoc-concept\" href=\"{}{}#{}\">{}</a>",
                        self.ctx.options.site_url,
                        self.ctx.options.index_file,
                        crate::concepts::concept_anchor(crate::concepts::INDEX_ID, tag),
                        escape(tag)
                    )
                })
                .collect();
            self.emit(format!(
                "<div class=\"slidoc-concepts\">Concepts: {}</div>\n",
                links.join("; ")
            ));
        }
        self.slide.tags = Some(tags);
        Ok(())
    }

    fn hint(&mut self, penalty: Option<f64>) -> Result<()> {
        self.close_choices();
        if self.slide.discarding || self.slide.blocks.contains(&BlockKind::Extra) {
            self.slide.discarding = true;
            return Ok(());
        }
        self.close_block(BlockKind::Hint);
        self.slide.hints.push(penalty.unwrap_or(0.0));
        self.open_block(BlockKind::Hint)
    }

    fn notes(&mut self) -> Result<()> {
        self.close_block(BlockKind::Hint);
        self.close_choices();
        if self.slide.discarding || self.slide.blocks.contains(&BlockKind::Extra) {
            self.slide.discarding = true;
            return Ok(());
        }
        self.slide.notes_seen = true;
        if self.slide.blocks.contains(&BlockKind::Notes) {
            return Ok(());
        }
        self.open_block(BlockKind::Notes)
    }

    fn extra(&mut self) -> Result<()> {
        self.close_block(BlockKind::Hint);
        self.close_choices();
        self.open_block(BlockKind::Extra)
    }
}

/// Whether `letter` is among the first `count` choices
fn presented(letter: char, count: usize) -> bool {
    letter >= 'A' && (letter as usize) < ('A' as usize + count)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::lexer::tokenize;
    use crate::plugin::PluginDef;
    use crate::preprocess::preprocess;

    fn render_with(
        src: &str,
        options: &CompileOptions,
        plugins: &PluginRegistry,
    ) -> Result<Rendered> {
        let text = preprocess(src).text;
        let stream = tokenize(&text)?;
        let hide = options.hide.as_deref().map(|h| Regex::new(h).unwrap());
        let ctx = RenderContext {
            file: "lecture",
            file_number: 1,
            options,
            plugins,
            hide: hide.as_ref(),
            highlighter: None,
            images: None,
        };
        render(&ctx, &text, &stream)
    }

    fn render_src(src: &str) -> Result<Rendered> {
        render_with(src, &CompileOptions::default(), &PluginRegistry::new())
    }

    fn syntax_kind(err: CompileError) -> SyntaxError {
        match err {
            CompileError::Syntax { kind, .. } => kind,
            other => panic!("expected a syntax error, got {other}"),
        }
    }

    fn graph_plugins() -> PluginRegistry {
        PluginRegistry::new().with(
            "MyPlugin",
            PluginDef {
                head: "<script src=\"myplugin.js\"></script>".into(),
                top: "<div class=\"{{pluginLabel}}-top\"></div>".into(),
                body: "<canvas id=\"{{pluginId}}-canvas\" data-args=\"{{pluginArgs}}\"></canvas>"
                    .into(),
                ..PluginDef::default()
            },
        )
    }

    #[test]
    fn test_slides_headers_and_toc() {
        let out = render_src(indoc! {"
            # Intro

            Hello

            ---

            Second

            ## Part two

            Text
        "})
        .unwrap();
        let model = &out.model;
        assert_eq!(model.slides.len(), 3);
        assert_eq!(model.header.as_deref(), Some("Intro"));
        assert_eq!(model.slides[0].header.as_deref(), Some("Intro"));
        assert_eq!(model.slides[1].header, None);
        assert_eq!(
            model.toc,
            vec![("slidoc01-03".to_string(), "Part two".to_string())]
        );
        let html = out.document.to_html();
        assert!(html.contains("<h1 id=\"slidoc-ref-intro\">1. Intro</h1>"));
        assert!(html.contains("<h2 id=\"slidoc-ref-part-two\">1.1 Part two</h2>"));
        assert!(html.contains("<div id=\"slidoc01-02\" class=\"slidoc-slide slidoc01-slide\">"));
    }

    #[test]
    fn test_strip_chapters_and_sections() {
        let options = CompileOptions {
            strip: BTreeSet::from([Strip::Chapters, Strip::Sections]),
            ..CompileOptions::default()
        };
        let out = render_with("# Intro\n\n## Part\n", &options, &PluginRegistry::new()).unwrap();
        let html = out.document.to_html();
        assert!(html.contains(">Intro</h1>"));
        assert!(html.contains(">Part</h2>"));
    }

    #[test]
    fn test_choice_question() {
        let out = render_src(indoc! {"
            Which is largest?
            A.. one
            B.. two
            C.. three

            Answer: C; weight=2
        "})
        .unwrap();
        let q = &out.model.questions[0];
        assert_eq!(q.qtype, QType::Choice);
        assert_eq!(q.choices, 3);
        assert_eq!(
            q.correct,
            Some(CorrectSpec::Choices {
                letters: BTreeSet::from(['C'])
            })
        );
        assert_eq!(q.weight, 2.0);
        assert_eq!(out.model.cum_score, vec![0.0, 2.0]);
        assert_eq!(out.model.slides[0].question, Some(1));
        let html = out.document.to_html();
        assert!(html.contains("<blockquote class=\"slidoc-choice-question\">"));
        assert!(html.contains("data-choice=\"B\""));
    }

    #[test]
    fn test_choice_out_of_sequence() {
        let err = render_src("Pick\nA.. one\nB.. two\nD.. four\n\nAnswer: A\n").unwrap_err();
        assert_eq!(err.location().map(|l| l.slide), Some(1));
        assert_eq!(
            syntax_kind(err),
            SyntaxError::ChoiceOutOfSequence {
                expected: 'C',
                found: 'D'
            }
        );
    }

    #[test]
    fn test_restatement_and_alternatives() {
        let src = "Q.. Restated\nA.. one\nA*.. uno\nB.. two\n\nAnswer: B\n";
        let err = render_src(src).unwrap_err();
        assert_eq!(syntax_kind(err), SyntaxError::AlternativeChoice { letter: 'A' });

        let options = CompileOptions {
            features: BTreeSet::from([Feature::Multiplicity]),
            ..CompileOptions::default()
        };
        let out = render_with(src, &options, &PluginRegistry::new()).unwrap();
        let q = &out.model.questions[0];
        assert_eq!(q.choices, 2);
        assert_eq!(q.alternatives, vec!['A']);

        let err = render_src("A.. one\nQ.. late\n\nAnswer: A\n").unwrap_err();
        assert!(matches!(
            syntax_kind(err),
            SyntaxError::ChoiceOutOfSequence { found: 'Q', .. }
        ));
    }

    #[test]
    fn test_answer_must_name_presented_choice() {
        let err = render_src("Pick\nA.. one\nB.. two\n\nAnswer: C\n").unwrap_err();
        assert!(matches!(syntax_kind(err), SyntaxError::InvalidAnswer { .. }));

        let err = render_src("Pick\nA.. one\n\nAnswer: 42\n").unwrap_err();
        assert!(matches!(
            syntax_kind(err),
            SyntaxError::AnswerTypeConflict { .. }
        ));

        let err = render_src("What?\n\nAnswer: choice=A\n").unwrap_err();
        assert!(matches!(syntax_kind(err), SyntaxError::InvalidAnswer { .. }));
    }

    #[test]
    fn test_number_answer() {
        let out = render_src("Pi?\n\nAnswer: 3.5 +/- 0.2\n").unwrap();
        let q = &out.model.questions[0];
        assert_eq!(q.qtype, QType::Number);
        assert_eq!(
            q.correct,
            Some(CorrectSpec::Number {
                value: 3.5,
                error: 0.2
            })
        );
        assert_eq!(q.digest.len(), crate::digest::TRUNCATE_DIGEST);
    }

    #[test]
    fn test_plugin_answer_requires_embed() {
        let err = render_src("Plot it\n\nAnswer: =MyPlugin.expect(2)\n").unwrap_err();
        assert_eq!(
            syntax_kind(err),
            SyntaxError::MissingPlugin {
                plugin: "MyPlugin".into()
            }
        );

        let src = "Plot it\n\n=MyPlugin(1, 2)\n\nAnswer: =MyPlugin.expect(2)\n\n---\n\n=MyPlugin(3)\n";
        let out = render_with(src, &CompileOptions::default(), &graph_plugins()).unwrap();
        let q = &out.model.questions[0];
        assert_eq!(
            q.correct,
            Some(CorrectSpec::Plugin {
                name: "MyPlugin".into(),
                action: "expect".into(),
                arg: "2".into()
            })
        );
        let embeds = &out.model.plugin_embeds;
        assert_eq!(embeds.len(), 2);
        assert!(embeds[0].first_load);
        assert!(!embeds[1].first_load);
        assert_eq!(embeds[0].body_template_fields, vec!["pluginId", "pluginArgs"]);
        assert_eq!(out.document.head.len(), 1);
        let html = out.document.to_html();
        assert!(html.contains("<canvas id=\"slidoc01-01-plugin-MyPlugin-canvas\" data-args=\"1, 2\">"));
        assert_eq!(html.matches("slidoc-plugin-MyPlugin-top").count(), 1);
    }

    #[test]
    fn test_plugin_embed_errors() {
        let err = render_with(
            "=MyPlugin()\n=MyPlugin()\n",
            &CompileOptions::default(),
            &graph_plugins(),
        )
        .unwrap_err();
        assert!(matches!(
            syntax_kind(err),
            SyntaxError::DuplicatePluginEmbed { .. }
        ));

        let plugins = PluginRegistry::new().with(
            "Bad",
            PluginDef {
                body: "{{pluginColor}}".into(),
                ..PluginDef::default()
            },
        );
        let err = render_with("=Bad()\n", &CompileOptions::default(), &plugins).unwrap_err();
        assert!(matches!(err, CompileError::Template { ref plugin, .. } if plugin == "Bad"));

        let out = render_src("=Unknown()\n\nCall `=Other.run(1)`\n").unwrap();
        let kinds: Vec<&WarningKind> = out.warnings.iter().map(|w| &w.kind).collect();
        assert!(kinds.contains(&&WarningKind::UnknownPlugin {
            plugin: "Unknown".into()
        }));
        assert!(kinds.contains(&&WarningKind::MissingInlinePlugin {
            plugin: "Other".into()
        }));
    }

    const FORWARD: &str = indoc! {"
        Skip ahead? [skip](#target)

        Answer: 42

        ---

        Filler

        ---

        Middle question

        Answer: 7; weight=1,GRADE

        ---

        ## Target {#target}

        Done
    "};

    #[test]
    fn test_forward_link_skip() {
        let out = render_src(&FORWARD.replace("GRADE", "0")).unwrap();
        let skip = out.model.questions[0].skip.clone().unwrap();
        assert_eq!(skip.target_slide, 4);
        assert_eq!(skip.slides_skipped, 3);
        assert_eq!(skip.score_weight_skipped, 1.0);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_forward_link_over_graded_question_fails() {
        let err = render_src(&FORWARD.replace("GRADE", "2")).unwrap_err();
        match err {
            CompileError::ForwardLinkSkipsGraded { loc, target, weight } => {
                assert_eq!(loc.slide, 1);
                assert_eq!(target, "slidoc-ref-target");
                assert_eq!(weight, 2.0);
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn test_pending_labels_resolve() {
        let out = render_src(indoc! {"
            See [Figure](#:fig) and [x](#:nowhere).

            ---

            [Figure]{#:fig} here and [Figure]{#:fig2} there, [Eq]{#::eq}
        "})
        .unwrap();
        let html = out.document.to_html();
        assert!(html.contains("<a class=\"slidoc-ref-link\" href=\"#slidoc-ref-fig\">Figure 1</a>"));
        assert!(html.contains("(slidoc-ref-nowhere)??"));
        assert!(html.contains("<span id=\"slidoc-ref-fig2\" class=\"slidoc-ref slidoc-ref-counted\">Figure 2</span>"));
        assert!(html.contains("Eq 1.1</span>"));
        assert_eq!(
            out.warnings[0].kind,
            WarningKind::UnresolvedForwardLink {
                id: "slidoc-ref-nowhere".into()
            }
        );
    }

    #[test]
    fn test_duplicate_reference_warns() {
        let out = render_src("[A]{#same} and [B]{#same}\n").unwrap();
        assert_eq!(
            out.warnings[0].kind,
            WarningKind::DuplicateReference {
                id: "slidoc-ref-same".into(),
                renamed: "slidoc-ref-same-duplicate-1".into()
            }
        );
        assert_eq!(out.model.references.len(), 2);
    }

    #[test]
    fn test_blocks_and_strip_notes() {
        let src = "Body\n\nHint: 10%\nTry harder\n\nNotes:\nsecret\n";
        let out = render_src(src).unwrap();
        let html = out.document.to_html();
        assert!(html.contains("<!--slidoc-hint-block-begin[slidoc01-01-hint-1]-->"));
        assert!(html.contains("</div><!--slidoc-hint-block-end[slidoc01-01-hint-1]-->"));
        assert!(html.contains("<!--slidoc-notes-block-begin[slidoc01-01-notes]-->"));
        assert!(html.contains("secret"));
        assert_eq!(
            out.model.slides[0].blocks,
            vec![BlockKind::Hint, BlockKind::Notes]
        );

        let options = CompileOptions {
            strip: BTreeSet::from([Strip::Notes]),
            ..CompileOptions::default()
        };
        let out = render_with(src, &options, &PluginRegistry::new()).unwrap();
        let html = out.document.to_html();
        assert!(!html.contains("secret"));
        assert!(!html.contains("slidoc-notes-block"));
        assert!(html.contains("Try harder"));
    }

    #[test]
    fn test_same_line_notes_are_stripped() {
        let src = "Body\n\nNotes: secret stuff\n";
        let out = render_src(src).unwrap();
        assert_eq!(out.model.slides[0].blocks, vec![BlockKind::Notes]);
        assert!(
            out.document
                .to_html()
                .contains("<!--slidoc-notes-block-begin[slidoc01-01-notes]-->")
        );

        let options = CompileOptions {
            strip: BTreeSet::from([Strip::Notes]),
            ..CompileOptions::default()
        };
        let html = render_with(src, &options, &PluginRegistry::new())
            .unwrap()
            .document
            .to_html();
        assert!(html.contains("Body"));
        assert!(!html.contains("secret stuff"));
        assert!(!html.contains("Notes:"));
    }

    #[test]
    fn test_same_line_hint_keeps_its_penalty() {
        let out = render_src("Q?\n\nHint: 10% think harder\n\nAnswer: 4\n").unwrap();
        assert_eq!(out.model.questions[0].hints, vec![10.0]);
        let html = out.document.to_html();
        assert!(html.contains("slidoc01-01-hint-1"));
        assert!(html.contains("think harder"));
    }

    #[test]
    fn test_hints_are_recorded_on_the_question() {
        let out = render_src("Q?\n\nHint: 25%\nfirst\n\nHint:\nsecond\n\nAnswer: 4\n").unwrap();
        assert_eq!(out.model.questions[0].hints, vec![25.0, 0.0]);
        let html = out.document.to_html();
        assert!(html.contains("slidoc01-01-hint-2"));
    }

    #[test]
    fn test_extra_suppresses_later_notes() {
        let out = render_src("Body\n\nExtra:\nmore\n\nNotes:\nhidden away\n").unwrap();
        let html = out.document.to_html();
        assert!(html.contains("more"));
        assert!(!html.contains("hidden away"));
        assert!(html.contains("<!--slidoc-extra-block-end[slidoc01-01-extra]-->"));

        let err = render_src("Extra:\none\n\nExtra:\ntwo\n").unwrap_err();
        assert_eq!(
            syntax_kind(err),
            SyntaxError::BlockAlreadyOpen {
                kind: BlockKind::Extra
            }
        );
    }

    #[test]
    fn test_hide_pattern_opens_hidden_block() {
        let src = "## Answer key\n\nsolution\n\n---\n\n## Answer again\n";
        let options = CompileOptions {
            hide: Some("^Answer".into()),
            ..CompileOptions::default()
        };
        let out = render_with(src, &options, &PluginRegistry::new()).unwrap();
        let html = out.document.to_html();
        assert!(html.contains("<!--slidoc-hidden-block-begin[slidoc01-01-hidden]-->"));
        assert_eq!(out.model.slides[1].blocks, vec![BlockKind::Hidden]);

        let options = CompileOptions {
            strip: BTreeSet::from([Strip::Hidden]),
            ..options
        };
        let out = render_with(src, &options, &PluginRegistry::new()).unwrap();
        assert!(!out.document.to_html().contains("solution"));
    }

    #[test]
    fn test_directive_discipline() {
        let err = render_src("Q?\n\nAnswer: 1\nTags: a\nTags: b\n").unwrap_err();
        assert_eq!(syntax_kind(err), SyntaxError::DuplicateTags);

        let out = render_src("Q?\n\nAnswer: 1\nAnswer: 2\n").unwrap();
        assert_eq!(out.warnings[0].kind, WarningKind::DuplicateAnswer);
        assert_eq!(
            out.model.questions[0].correct,
            Some(CorrectSpec::Number {
                value: 1.0,
                error: 0.0
            })
        );
    }

    #[test]
    fn test_concept_occurrences() {
        let out = render_src(indoc! {"
            # Loops

            Tags: loops; Iteration : counters

            ---

            Count?

            Answer: 3
            Tags: loops
        "})
        .unwrap();
        assert_eq!(out.concepts.len(), 2);
        assert_eq!(out.concepts[0].question, None);
        assert_eq!(out.concepts[0].header, "Loops");
        assert_eq!(out.concepts[0].tags.secondary, vec!["counters"]);
        assert_eq!(out.concepts[1].question, Some(1));
        let html = out.document.to_html();
        assert!(html.contains("href=\"ind.html#slidoc-index-concept-iteration\""));
    }

    #[test]
    fn test_quoted_headings_do_not_split_slides() {
        let out = render_src("Intro\n\n> ## Quoted\n> text\n\nafter\n").unwrap();
        assert_eq!(out.model.slides.len(), 1);
        assert!(out.document.to_html().contains("<blockquote>\n<h2"));
    }

    #[test]
    fn test_images_recorded() {
        let out = render_src("![plot](figs/plot.png) ![web](http://x.org/a.png)\n").unwrap();
        assert_eq!(out.model.slides[0].images, vec!["figs/plot.png"]);
        assert!(out.document.to_html().contains("<img src=\"figs/plot.png\" alt=\"plot\">"));
    }

    #[test]
    fn test_number_untitled_slides() {
        let options = CompileOptions {
            number: true,
            ..CompileOptions::default()
        };
        let out = render_with("# Title\n\n---\n\nuntitled\n", &options, &PluginRegistry::new())
            .unwrap();
        let html = out.document.to_html();
        assert!(html.contains("Slide 1.2</h3>"));
        assert!(!html.contains("Slide 1.1</h3>"));
    }
}
