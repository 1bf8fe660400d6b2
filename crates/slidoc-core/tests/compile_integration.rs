//! Integration tests compiling markdown fixtures end to end

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use slidoc_core::{
    BlockKind, CompileError, CompileOptions, INDEX_ID, MismatchError, PathSources, PluginRegistry, QType,
    RunContext, Sources, Strip, SyntaxError, WarningKind, compile_file, compile_run,
    concept_anchor,
};

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture_path(name: &str) -> PathBuf {
    Path::new(FIXTURES_DIR).join(name)
}

fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", name, e))
}

fn context(options: CompileOptions) -> RunContext {
    RunContext::new(options, PluginRegistry::new()).expect("valid options")
}

#[test]
fn test_compile_lecture() {
    let source = read_fixture("lecture01.md");
    let out = compile_file(&context(CompileOptions::default()), 1, "lecture01", &source)
        .expect("lecture01 should compile");

    assert_eq!(out.model.slides.len(), 4);
    assert_eq!(out.model.header.as_deref(), Some("Iteration"));
    assert_eq!(out.model.questions.len(), 2);

    let choice = &out.model.questions[0];
    assert_eq!(choice.qtype, QType::Choice);
    assert_eq!(choice.choices, 3);
    assert_eq!(choice.slide, 3);
    assert_eq!(choice.weight, 2.0);

    let count = &out.model.questions[1];
    assert_eq!(count.qtype, QType::Number);
    assert_eq!(count.hints, vec![50.0]);
    assert_eq!(out.model.cum_score, vec![0.0, 2.0, 3.0]);

    // forward counted reference resolved once the figure was defined
    assert!(
        out.html
            .contains("<a class=\"slidoc-ref-link\" href=\"#slidoc-ref-flow\">Flowchart 1</a>"),
        "unexpected html: {}",
        out.html
    );
    assert!(out.html.contains("would also repeat"));
    assert!(out.warnings.is_empty(), "warnings: {:?}", out.warnings);

    assert_eq!(out.record.slide_break_offsets.len(), 3);
    assert_eq!(out.record.slide_images[1], vec!["images/image02.png"]);
    assert_eq!(out.record.next_image_number, 3);
}

#[test]
fn test_strip_answers_and_notes() {
    let options = CompileOptions {
        strip: BTreeSet::from([Strip::Answers, Strip::Notes]),
        ..CompileOptions::default()
    };
    let source = read_fixture("lecture01.md");
    let out = compile_file(&context(options), 1, "lecture01", &source).unwrap();

    assert!(!out.html.contains("would also repeat"));
    assert!(!out.html.contains("slidoc-answer-value"));
    // the answer still defines the question
    assert_eq!(out.model.questions.len(), 2);
}

#[test]
fn test_directives_with_text_on_the_same_line() {
    let source = read_fixture("recap.md");
    let out = compile_file(&context(CompileOptions::default()), 1, "recap", &source)
        .expect("recap should compile");

    assert_eq!(out.model.slides.len(), 2);
    assert_eq!(out.model.slides[0].blocks, vec![BlockKind::Notes]);
    assert!(out.model.slides[1].blocks.contains(&BlockKind::Extra));
    assert_eq!(out.model.questions[0].hints, vec![25.0, 0.0]);
    assert!(out.html.contains("mention the call stack here."));
    assert!(out.html.contains("multiply 3, 2 and 1."));
    assert!(out.html.contains("<!--slidoc-extra-block-begin[slidoc01-02-extra]-->"));
    assert!(!out.html.contains("Hint:"));
    assert!(out.warnings.is_empty(), "warnings: {:?}", out.warnings);

    let options = CompileOptions {
        strip: BTreeSet::from([Strip::Notes]),
        ..CompileOptions::default()
    };
    let stripped = compile_file(&context(options), 1, "recap", &source).unwrap();
    assert!(!stripped.html.contains("call stack"));
    assert!(!stripped.html.contains("Notes:"));
    assert!(stripped.html.contains("A function that calls itself"));
}

#[test]
fn test_run_concept_index() {
    let sources = PathSources::new([fixture_path("lecture01.md"), fixture_path("lecture02.md")])
        .load()
        .unwrap();
    let run = compile_run(&context(CompileOptions::default()), &sources).unwrap();

    assert_eq!(run.files.len(), 2);
    assert_eq!(run.files[1].model.chapter_id, "slidoc02");

    let uncovered: Vec<(&str, Option<usize>, &str)> = run
        .warnings
        .iter()
        .filter_map(|w| match &w.kind {
            WarningKind::ConceptNotCovered { tag, .. } => {
                Some((w.file.as_str(), w.slide, tag.as_str()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(uncovered, vec![("lecture01", Some(4), "ranges")]);

    // loops, conditions, functions
    assert_eq!(run.index.len(), 3);
    // loops, ranges, functions
    assert_eq!(run.qindex.len(), 3);

    let html = run.index.to_html("");
    assert!(html.contains(&format!("id=\"{}\"", concept_anchor(INDEX_ID, "loops"))));
    assert!(html.contains("lecture02.html"));

    let entries = &run.subquestions.entries;
    assert_eq!(entries.len(), 3);
    assert!(entries[0].related.is_empty());
    assert_eq!(entries[1].concept_set, "loops;ranges");
    assert_eq!(entries[1].related.len(), 1);
    assert_eq!(entries[1].related[0].0, "1");
    assert_eq!(entries[1].related[0].1.qnumber, 1);
    assert_eq!(entries[2].related[0].1.file, "lecture01");
}

#[test]
fn test_choice_out_of_sequence() {
    let source = read_fixture("out_of_sequence.md");
    let err = compile_file(&context(CompileOptions::default()), 1, "seq", &source).unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("seq: slide 2:"), "message: {message}");
    match err {
        CompileError::Syntax { kind, .. } => assert_eq!(
            kind,
            SyntaxError::ChoiceOutOfSequence {
                expected: 'C',
                found: 'D'
            }
        ),
        other => panic!("expected a syntax error, got {other}"),
    }
}

#[test]
fn test_forward_link_over_graded_question() {
    let source = read_fixture("graded_skip.md");
    let err = compile_file(&context(CompileOptions::default()), 1, "skip", &source).unwrap_err();
    match err {
        CompileError::ForwardLinkSkipsGraded { loc, weight, .. } => {
            assert_eq!(loc.slide, 1);
            assert_eq!(weight, 3.0);
        }
        other => panic!("expected a forward link error, got {other}"),
    }
}

#[test]
fn test_verify_against_record() {
    let source = read_fixture("lecture01.md");
    let out = compile_file(&context(CompileOptions::default()), 1, "lecture01", &source).unwrap();

    let slices = out.record.verify(&source).unwrap();
    assert_eq!(slices.len(), 4);
    let question = slices.extract(3..=3).unwrap();
    assert!(question.contains("Which statement repeats a block?"));
    assert!(matches!(
        slices.extract(4..=5),
        Err(MismatchError::OutOfRange { .. })
    ));

    let edited = source.replace("every pass", "each pass");
    assert!(matches!(
        out.record.verify(&edited),
        Err(MismatchError::Digest { .. })
    ));

    // the record survives a JSON round trip
    let restored: slidoc_core::IndexRecord = serde_json::from_str(&out.record.to_json().expect("record serializes")).unwrap();
    assert_eq!(restored, out.record);
}
