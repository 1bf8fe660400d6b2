//! Integration tests that run the slidoc binary

use std::path::Path;
use std::process::Command;

fn slidoc_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_slidoc"))
}

fn fixtures_dir() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures"))
}

/// Copy the lecture fixtures and config into a fresh directory
fn create_temp_project() -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("Failed to create temp dir");
    let lectures = temp.path().join("lectures");
    std::fs::create_dir_all(&lectures).expect("Failed to create lectures dir");
    for name in ["intro.md", "quiz.md"] {
        std::fs::copy(
            fixtures_dir().join("lectures").join(name),
            lectures.join(name),
        )
        .expect("Failed to copy lecture");
    }
    std::fs::copy(
        fixtures_dir().join("config.json"),
        temp.path().join("config.json"),
    )
    .expect("Failed to copy config.json");
    temp
}

fn build(project: &Path) -> std::process::Output {
    slidoc_bin()
        .current_dir(project)
        .arg("--config")
        .arg("config.json")
        .arg("lectures")
        .output()
        .expect("Failed to run slidoc")
}

#[test]
fn test_build_writes_artifacts() {
    let project = create_temp_project();
    let output = build(project.path());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "build failed: {}", stderr);

    let site = project.path().join("site");
    for name in [
        "intro.html",
        "intro.record.json",
        "intro.sheet.json",
        "quiz.html",
        "quiz.record.json",
        "ind.html",
        "qind.html",
        "toc.html",
        "xref.html",
    ] {
        assert!(site.join(name).exists(), "missing {name}");
    }

    let intro = std::fs::read_to_string(site.join("intro.html")).unwrap();
    assert!(intro.contains("<title>Introduction</title>"));
    assert!(!intro.contains("Rebinding"), "notes should be stripped");

    // numbered untitled slide of the second file
    let quiz = std::fs::read_to_string(site.join("quiz.html")).unwrap();
    assert!(quiz.contains("Slide 2.2</h3>"));

    let index = std::fs::read_to_string(site.join("ind.html")).unwrap();
    assert!(index.contains("slidoc-index-concept-variables"));

    let sheet: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(site.join("quiz.sheet.json")).unwrap())
            .unwrap();
    assert_eq!(sheet["questions"][1]["qtype"], "choice");

    let toc = std::fs::read_to_string(site.join("toc.html")).unwrap();
    assert!(toc.contains("<a href=\"intro.html#slidoc01\"><b>Introduction</b></a>"));
    assert!(toc.contains("<a class=\"header-link\" href=\"intro.html#slidoc01-02\">Assignment</a>"));

    let xref = std::fs::read_to_string(site.join("xref.html")).unwrap();
    assert!(xref.contains("<a href=\"toc.html\">BACK TO CONTENTS</a>"));
    assert!(xref.contains("CONCEPT SUB-QUESTIONS"));
    assert!(xref.contains("<a href=\"quiz.html#slidoc02-01\" target=\"_blank\">quiz.Q1: Quiz</a>"));

    assert!(stderr.contains("Compile Report"), "stderr: {}", stderr);
}

#[test]
fn test_verify_extracts_slides() {
    let project = create_temp_project();
    assert!(build(project.path()).status.success());

    let output = slidoc_bin()
        .current_dir(project.path())
        .args(["verify", "lectures/quiz.md", "site/quiz.record.json", "2", "2"])
        .output()
        .expect("Failed to run slidoc");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Which line assigns?"), "stdout: {}", stdout);
    assert!(!stdout.contains("What is `x`"));
}

#[test]
fn test_verify_rejects_edited_source() {
    let project = create_temp_project();
    assert!(build(project.path()).status.success());

    let quiz = project.path().join("lectures/quiz.md");
    let edited = std::fs::read_to_string(&quiz)
        .unwrap()
        .replace("Which line assigns?", "Which line binds?");
    std::fs::write(&quiz, edited).unwrap();

    let output = slidoc_bin()
        .current_dir(project.path())
        .args(["verify", "lectures/quiz.md", "site/quiz.record.json"])
        .output()
        .expect("Failed to run slidoc");
    assert!(!output.status.success(), "edited source should not verify");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not match its record"), "stderr: {}", stderr);
}

#[test]
fn test_syntax_error_fails_build() {
    let temp = tempfile::tempdir().unwrap();
    let output = slidoc_bin()
        .current_dir(temp.path())
        .arg(fixtures_dir().join("broken.md"))
        .output()
        .expect("Failed to run slidoc");

    assert!(!output.status.success(), "broken file should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("broken: slide 1"), "stderr: {}", stderr);
    assert!(stderr.contains("out of sequence"), "stderr: {}", stderr);
}

#[test]
fn test_json_report_on_stdout() {
    let project = create_temp_project();
    let output = slidoc_bin()
        .current_dir(project.path())
        .args(["--config", "config.json", "--format", "json", "lectures"])
        .output()
        .expect("Failed to run slidoc");
    assert!(output.status.success());

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(report["files"][0]["name"], "intro");
    assert_eq!(report["files"][1]["questions"], 2);
    assert_eq!(report["warnings"].as_array().map(Vec::len), Some(0));
}
