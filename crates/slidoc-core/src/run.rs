//! Run driver.
//!
//! A [`RunContext`] is built once per invocation and shared by every file.
//! Files compile independently (in parallel with the `parallel` feature);
//! the concept index is merged afterwards, in file order, so coverage
//! warnings do not depend on scheduling.

use regex::Regex;

use crate::concepts::{
    ConceptIndex, ConceptOccurrence, IndexOptions, IndexView, SubquestionReport,
    build_subquestion_table,
};
use crate::diagnostics::{Warning, WarningKind};
use crate::digest::{IndexRecord, digest};
use crate::doc::Document;
use crate::error::{CompileError, Result};
use crate::lexer::tokenize;
use crate::model::DocumentModel;
use crate::options::{CompileOptions, Feature, FileDefaults, Strip};
use crate::plugin::{Highlighter, ImageResolver, PluginRegistry};
use crate::preprocess::preprocess;
use crate::render::html::escape;
use crate::render::{RenderContext, render};
use crate::sources::SourceFile;

/// Shared, read-only state of one compile run
pub struct RunContext {
    options: CompileOptions,
    plugins: PluginRegistry,
    hide: Option<Regex>,
    highlighter: Option<Box<dyn Highlighter>>,
    images: Option<Box<dyn ImageResolver>>,
}

fn compile_hide(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| CompileError::InvalidHidePattern {
        pattern: pattern.to_string(),
        source,
    })
}

impl RunContext {
    pub fn new(options: CompileOptions, plugins: PluginRegistry) -> Result<Self> {
        let hide = options.hide.as_deref().map(compile_hide).transpose()?;
        Ok(Self {
            options,
            plugins,
            hide,
            highlighter: None,
            images: None,
        })
    }

    pub fn with_highlighter(mut self, highlighter: impl Highlighter + 'static) -> Self {
        self.highlighter = Some(Box::new(highlighter));
        self
    }

    pub fn with_image_resolver(mut self, images: impl ImageResolver + 'static) -> Self {
        self.images = Some(Box::new(images));
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }
}

/// Everything produced for one file
#[derive(Debug)]
pub struct FileOutput {
    pub name: String,
    pub file_number: usize,
    /// Run options with the file's defaults header applied
    pub options: CompileOptions,
    pub model: DocumentModel,
    pub document: Document,
    /// Plugin head templates followed by the slide container
    pub html: String,
    pub record: IndexRecord,
    pub concepts: Vec<ConceptOccurrence>,
    pub warnings: Vec<Warning>,
}

/// Everything produced by a run
#[derive(Debug)]
pub struct RunOutput {
    pub files: Vec<FileOutput>,
    pub index: IndexView,
    pub qindex: IndexView,
    pub subquestions: SubquestionReport,
    /// Warnings that only exist at run scope (concept coverage, large sets)
    pub warnings: Vec<Warning>,
}

impl RunOutput {
    /// File warnings in file order, then run warnings
    pub fn all_warnings(&self) -> impl Iterator<Item = &Warning> {
        self.files
            .iter()
            .flat_map(|f| f.warnings.iter())
            .chain(self.warnings.iter())
    }

    /// Contents page: every file with its section list
    pub fn toc_html(&self, options: &CompileOptions) -> String {
        let site = &options.site_url;
        let numbered = !options.strips(Strip::Sections);
        let mut out = String::from("<div class=\"slidoc-toc-container\">\n");
        if !self.index.is_empty() {
            out.push_str(&format!(
                "<a href=\"{site}{}#{}\">INDEX</a><p></p>\n",
                options.index_file, self.index.index_id
            ));
        }
        out.push_str(if numbered {
            "<ol>\n"
        } else {
            "<ul style=\"list-style-type: none;\">\n"
        });
        for file in &self.files {
            let url = format!("{site}{}.html", file.name);
            let title = file.model.header.as_deref().unwrap_or(&file.name);
            out.push_str(&format!(
                "<li><a href=\"{url}#{}\"><b>{}</b></a>\n{}</li>\n",
                file.model.chapter_id,
                escape(title),
                file.model.toc_html(&url, numbered)
            ));
        }
        out.push_str(if numbered { "</ol>\n" } else { "</ul>\n" });
        out.push_str("</div>\n");
        out
    }

    /// Cross-reference page: where each concept first appears, what each
    /// file covers, the coverage warnings and the sub-question table
    pub fn crossref_html(&self, options: &CompileOptions) -> String {
        let site = &options.site_url;
        let mut out = format!(
            "<a href=\"{site}{}\">BACK TO CONTENTS</a><p></p>\n<h3>Concepts cross-reference</h3><p></p>\n",
            options.toc_file
        );

        out.push_str("<b>Concepts -> files mapping:</b><br>\n");
        for (tag, refs) in &self.index.first_references {
            let links: Vec<String> = refs
                .iter()
                .map(|r| {
                    format!(
                        "<a href=\"{site}{}.html#{}\" target=\"_blank\">{}</a>",
                        r.file,
                        r.slide_id,
                        escape(&r.file)
                    )
                })
                .collect();
            out.push_str(&format!("{}: {}<br>\n", escape(tag), links.join(", ")));
        }

        out.push_str("<p></p><b>Primary concepts covered in each file:</b><br>\n");
        for file in &self.files {
            let Some(covered) = self.index.covered_first.get(&file.name) else {
                continue;
            };
            let links: Vec<String> = covered
                .iter()
                .map(|(tag, occ)| {
                    format!(
                        "<a href=\"{site}{}.html#{}\" target=\"_blank\">{}</a>",
                        file.name,
                        occ.slide_id,
                        escape(tag)
                    )
                })
                .collect();
            out.push_str(&format!("{}: {}<br>\n", escape(&file.name), links.join("; ")));
        }

        if !self.warnings.is_empty() {
            out.push_str("<pre>\n");
            for warning in &self.warnings {
                out.push_str(&escape(&warning.to_string()));
                out.push('\n');
            }
            out.push_str("</pre>\n");
        }

        out.push_str(&self.subquestions.to_html(site));
        out
    }
}

/// Highest trailing number in any image file stem, plus one
fn next_image_number(slide_images: &[Vec<String>]) -> usize {
    slide_images
        .iter()
        .flatten()
        .filter_map(|path| {
            let file = path.rsplit('/').next().unwrap_or(path);
            let stem = file.split_once('.').map_or(file, |(stem, _)| stem);
            let digits: String = stem
                .chars()
                .rev()
                .take_while(char::is_ascii_digit)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            digits.parse::<usize>().ok()
        })
        .max()
        .map_or(1, |n| n + 1)
}

/// Compile one file in isolation
pub fn compile_file(
    ctx: &RunContext,
    file_number: usize,
    name: &str,
    source: &str,
) -> Result<FileOutput> {
    let _span = tracing::info_span!("compile", file = name, file_number).entered();

    let pre = preprocess(source);
    let mut warnings = Vec::new();

    let defaults = pre
        .defaults
        .as_deref()
        .map(FileDefaults::parse)
        .unwrap_or_default();
    for key in &defaults.unknown {
        let warning = Warning::new(name, None, WarningKind::UnknownDefault { key: key.clone() });
        warning.log();
        warnings.push(warning);
    }
    let options = ctx.options.with_defaults(&defaults);
    let file_hide = match &defaults.hide {
        Some(pattern) => Some(compile_hide(pattern)?),
        None => None,
    };

    let stream = tokenize(&pre.text)?;
    tracing::debug!(
        tokens = stream.tokens.len(),
        slides = stream.slide_count(),
        "tokenized"
    );

    let render_ctx = RenderContext {
        file: name,
        file_number,
        options: &options,
        plugins: &ctx.plugins,
        hide: file_hide.as_ref().or(ctx.hide.as_ref()),
        highlighter: ctx.highlighter.as_deref(),
        images: ctx.images.as_deref(),
    };
    let rendered = render(&render_ctx, &pre.text, &stream)?;
    warnings.extend(rendered.warnings);

    let slide_images: Vec<Vec<String>> = rendered
        .model
        .slides
        .iter()
        .map(|s| s.images.clone())
        .collect();
    let record = IndexRecord {
        content_digest: digest(&pre.text),
        defaults_text: pre.defaults.clone(),
        slide_break_offsets: stream.break_offsets(),
        next_image_number: next_image_number(&slide_images),
        slide_images,
    };

    let mut html = String::new();
    for head in &rendered.document.head {
        html.push_str(head);
        html.push('\n');
    }
    html.push_str(&rendered.document.to_html());

    tracing::info!(
        slides = rendered.model.slides.len(),
        questions = rendered.model.questions.len(),
        warnings = warnings.len(),
        "compiled"
    );

    Ok(FileOutput {
        name: name.to_string(),
        file_number,
        options,
        model: rendered.model,
        document: rendered.document,
        html,
        record,
        concepts: rendered.concepts,
        warnings,
    })
}

/// Compile every file of a run. File numbers follow the order of `sources`,
/// starting at 1.
pub fn compile_run(ctx: &RunContext, sources: &[SourceFile]) -> Result<RunOutput> {
    let compile = |(i, source): (usize, &SourceFile)| {
        compile_file(ctx, i + 1, &source.name, &source.text)
    };

    #[cfg(feature = "parallel")]
    let files: Vec<FileOutput> = {
        use rayon::prelude::*;
        sources
            .par_iter()
            .enumerate()
            .map(compile)
            .collect::<Result<_>>()?
    };

    #[cfg(not(feature = "parallel"))]
    let files: Vec<FileOutput> = sources
        .iter()
        .enumerate()
        .map(compile)
        .collect::<Result<_>>()?;

    let mut index = ConceptIndex::new();
    let mut warnings = Vec::new();
    for file in &files {
        let assessment = file.options.has(Feature::Assessment);
        warnings.extend(index.merge_file(&file.concepts, assessment));
    }

    let subquestions = build_subquestion_table(index.concept_questions());
    for (question, size) in &subquestions.oversized {
        warnings.push(Warning::new(
            question.file.clone(),
            None,
            WarningKind::LargeConceptSet {
                qnumber: question.qnumber,
                size: *size,
            },
        ));
    }

    let index_view = index.build_index(&IndexOptions::concepts(&ctx.options));
    let qindex_view = index.build_question_index(&IndexOptions::questions(&ctx.options));
    tracing::info!(
        files = files.len(),
        concepts = index_view.len(),
        question_concepts = qindex_view.len(),
        "run complete"
    );

    Ok(RunOutput {
        files,
        index: index_view,
        qindex: qindex_view,
        subquestions,
        warnings,
    })
}
