//! Output formatting for compile reports

use eyre::{Result, WrapErr};
use owo_colors::OwoColorize;
use serde::Serialize;
use slidoc_core::{RunOutput, Warning};

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Render a run report in the specified format
pub fn render_report(run: &RunOutput, format: OutputFormat, verbose: bool) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(run, verbose)),
        OutputFormat::Json => render_json(run),
    }
}

fn render_text(run: &RunOutput, verbose: bool) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str(&format!("{} {}\n", "##".bold(), "Compile Report".cyan().bold()));
    output.push('\n');

    for file in &run.files {
        let questions = file.model.questions.len();
        output.push_str(&format!(
            "  {} {} ({} slides, {} questions, score weight {})\n",
            "+".green(),
            file.name.bold(),
            file.model.slides.len(),
            questions,
            file.model.total_score_weight()
        ));
        if verbose {
            for q in &file.model.questions {
                output.push_str(&format!(
                    "      {} {} {}\n",
                    format!("Q{}", q.qnumber).dimmed(),
                    q.slide_id,
                    q.qtype.keyword().cyan()
                ));
            }
        }
    }
    output.push('\n');

    output.push_str(&format!(
        "Concepts: {} indexed, {} on questions\n",
        run.index.len(),
        run.qindex.len()
    ));
    output.push('\n');

    let warnings: Vec<&Warning> = run.all_warnings().collect();
    if !warnings.is_empty() {
        output.push_str(&format!(
            "{} Warnings ({}):\n",
            "!".yellow().bold(),
            warnings.len()
        ));
        for w in warnings {
            let location = match w.slide {
                Some(slide) => format!("{}:{}", w.file, slide),
                None => w.file.clone(),
            };
            output.push_str(&format!(
                "  {} {} - {}\n",
                "-".yellow(),
                location.dimmed(),
                w.kind
            ));
        }
        output.push('\n');
    }

    output
}

#[derive(Serialize)]
struct JsonReport<'a> {
    files: Vec<JsonFile<'a>>,
    concepts: usize,
    question_concepts: usize,
    warnings: Vec<&'a Warning>,
}

#[derive(Serialize)]
struct JsonFile<'a> {
    name: &'a str,
    chapter_id: &'a str,
    slides: usize,
    questions: usize,
    total_score: f64,
    total_grade: f64,
    digest: &'a str,
}

fn render_json(run: &RunOutput) -> Result<String> {
    let report = JsonReport {
        files: run
            .files
            .iter()
            .map(|f| JsonFile {
                name: &f.name,
                chapter_id: &f.model.chapter_id,
                slides: f.model.slides.len(),
                questions: f.model.questions.len(),
                total_score: f.model.total_score_weight(),
                total_grade: f.model.total_grade_weight(),
                digest: &f.record.content_digest,
            })
            .collect(),
        concepts: run.index.len(),
        question_concepts: run.qindex.len(),
        warnings: run.all_warnings().collect(),
    };
    serde_json::to_string_pretty(&report).wrap_err("Failed to serialize JSON report")
}
