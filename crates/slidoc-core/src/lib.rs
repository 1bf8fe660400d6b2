//! slidoc-core - Core library for compiling slide-markdown lectures
//!
//! This crate provides the building blocks for:
//! - Tokenizing slide markdown (slide breaks, questions, hints, notes, plugins)
//! - Rendering each file into slide HTML and a [`DocumentModel`]
//! - Resolving internal references and forward links
//! - Recording content digests so later runs can extract slides safely
//! - Building the run-wide concept index
//!
//! # Features
//!
//! - `walk` - Enable [`WalkSources`] for gitignore-aware directory walking (brings in `ignore`)
//! - `parallel` - Compile files in parallel (brings in `rayon`)
//!
//! # The dialect
//!
//! A file is a sequence of slides separated by horizontal rules, or by
//! level-1/level-2 headings that follow content. A slide becomes a question
//! when it carries an answer:
//!
//! ```markdown
//! ## Loops
//!
//! Tags: loops; iteration
//!
//! Which statement repeats a block?
//!
//! A.. `if`
//! B.. `while`
//!
//! Answer: B; weight=2
//!
//! Hint: 25%
//! Think about what runs more than once.
//!
//! Notes:
//! `for` would have been correct too.
//! ```
//!
//! # Compiling a run
//!
//! ```
//! use slidoc_core::{CompileOptions, MemorySources, PluginRegistry, RunContext, Sources, compile_run};
//!
//! let sources = MemorySources::new()
//!     .add("intro.md", "# Intro\n\nTags: loops\n\nSome text.\n")
//!     .add("quiz.md", "# Quiz\n\nHow many?\n\nAnswer: 3\n\nTags: loops\n")
//!     .load()
//!     .unwrap();
//!
//! let ctx = RunContext::new(CompileOptions::default(), PluginRegistry::new()).unwrap();
//! let run = compile_run(&ctx, &sources).unwrap();
//!
//! assert_eq!(run.files.len(), 2);
//! assert_eq!(run.files[1].model.questions.len(), 1);
//! assert!(run.warnings.is_empty());
//! ```
//!
//! # Verifying a published file
//!
//! Each compiled file carries an [`IndexRecord`]. A later run may only
//! extract slides when the source still matches it:
//!
//! ```
//! use slidoc_core::{CompileOptions, PluginRegistry, RunContext, compile_file};
//!
//! let source = "# One\n\nfirst\n\n---\n\nsecond\n";
//! let ctx = RunContext::new(CompileOptions::default(), PluginRegistry::new()).unwrap();
//! let out = compile_file(&ctx, 1, "one", source).unwrap();
//!
//! let slices = out.record.verify(source).unwrap();
//! assert!(slices.extract(2..=2).unwrap().contains("second"));
//! assert!(out.record.verify("# One\n\nedited\n").is_err());
//! ```

mod answer;
mod concepts;
mod diagnostics;
mod digest;
mod doc;
mod error;
mod grammar;
mod inline;
mod lexer;
mod model;
mod options;
mod plugin;
mod preprocess;
mod refs;
mod render;
mod run;
mod sheet;
mod sources;
mod token;
mod weights;

pub use answer::{AnswerOptions, AnswerSpec, parse_answer, parse_options};
pub use concepts::{
    ConceptIndex, ConceptOccurrence, IndexEntry, IndexOptions, IndexRef, IndexView, INDEX_ID,
    MAX_QUERY, MAX_SUBSET_TAGS, QINDEX_ID, QuestionRef, SubquestionEntry, SubquestionReport,
    build_subquestion_table, concept_anchor,
};
pub use diagnostics::{Warning, WarningKind};
pub use digest::{IndexRecord, MismatchError, SlideSlices, TRUNCATE_DIGEST, digest, verify};
pub use doc::{Document, Fragment, SlideHtml};
pub use error::{CompileError, Location, Result, SyntaxError};
pub use inline::tokenize_inline;
pub use lexer::tokenize;
pub use model::{
    BlockKind, ConceptTags, CorrectSpec, DocumentModel, Explain, PluginDefinition, PluginEmbed,
    QType, Question, QuestionOptions, RefKind, Reference, Retry, Share, SkipInfo, Slide, Team,
    Vote, chapter_id, slide_id,
};
pub use options::{CompileOptions, Feature, FileDefaults, Strip};
pub use plugin::{
    Highlighter, ImageContext, ImageResolver, PluginDef, PluginRegistry, TemplateFields,
    substitute, template_fields,
};
pub use preprocess::{Preprocessed, preprocess};
pub use refs::{make_id, ref_id, ref_key};
pub use run::{FileOutput, RunContext, RunOutput, compile_file, compile_run};
pub use sheet::{
    RemoteSheet, RepublishError, SheetAttributes, SheetQuestion, check_republish, publish,
};
pub use sources::{
    MemorySources, PathSources, SUPPORTED_EXTENSIONS, SourceFile, Sources, is_supported_extension,
};
pub use token::{InlineToken, LinkDef, RawSlice, Token, TokenStream};

#[cfg(feature = "walk")]
pub use sources::WalkSources;
