//! slidoc library - Compile slide-markdown lectures
//!
//! This library exposes the CLI's building blocks (source collection,
//! artifact writing, record verification) for testing and embedding.

pub mod config;
pub mod output;

use std::path::{Path, PathBuf};

use config::Config;
use eyre::{Result, WrapErr};
use slidoc_core::{
    FileOutput, IndexRecord, IndexView, PathSources, RunContext, RunOutput, SourceFile, Sources,
    WalkSources, compile_run, is_supported_extension,
};

/// Collect markdown sources from files and directories, in argument order.
/// Directories are walked with the config's include/exclude patterns.
pub fn collect_sources(paths: &[PathBuf], config: &Config) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::new();
    for path in paths {
        if path.is_dir() {
            let walked = WalkSources::new(path)
                .include(config.include.iter().cloned())
                .exclude(config.exclude.iter().cloned())
                .load()
                .wrap_err_with(|| format!("Failed to walk {}", path.display()))?;
            sources.extend(walked);
        } else if path.extension().is_some_and(is_supported_extension) {
            sources.extend(PathSources::new([path.clone()]).load()?);
        } else {
            eyre::bail!("{} is not a markdown file or directory", path.display());
        }
    }
    if sources.is_empty() {
        eyre::bail!("No markdown files found. Usage: slidoc [--config PATH] FILE_OR_DIR...");
    }
    Ok(sources)
}

/// Compile `sources` with `config`
pub fn build(config: &Config, sources: &[SourceFile]) -> Result<RunOutput> {
    let ctx = RunContext::new(config.options.clone(), config.plugins.clone())
        .wrap_err("Invalid compile options")?;
    let run = compile_run(&ctx, sources)?;
    Ok(run)
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

fn write(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).wrap_err_with(|| format!("Failed to write {}", path.display()))
}

fn write_file(out_dir: &Path, file: &FileOutput) -> Result<()> {
    let title = file.model.header.as_deref().unwrap_or(&file.name);
    write(
        &out_dir.join(format!("{}.html", file.name)),
        &page(title, &file.html),
    )?;
    write(
        &out_dir.join(format!("{}.record.json", file.name)),
        &file
            .record
            .to_json()
            .wrap_err_with(|| format!("Failed to serialize record for {}", file.name))?,
    )?;
    let sheet = serde_json::to_string_pretty(&file.model.sheet_attributes())
        .wrap_err_with(|| format!("Failed to serialize sheet for {}", file.name))?;
    write(&out_dir.join(format!("{}.sheet.json", file.name)), &sheet)
}

fn write_index(out_dir: &Path, file_name: &str, title: &str, view: &IndexView, site_url: &str) -> Result<()> {
    write(&out_dir.join(file_name), &page(title, &view.to_html(site_url)))
}

/// Write every artifact of a run; returns the paths written
pub fn write_outputs(out_dir: &Path, config: &Config, run: &RunOutput) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .wrap_err_with(|| format!("Failed to create {}", out_dir.display()))?;

    let mut written = Vec::new();
    for file in &run.files {
        write_file(out_dir, file)?;
        for ext in ["html", "record.json", "sheet.json"] {
            written.push(out_dir.join(format!("{}.{ext}", file.name)));
        }
    }

    let opts = &config.options;
    write_index(out_dir, &opts.index_file, "Concept index", &run.index, &opts.site_url)?;
    write_index(out_dir, &opts.qindex_file, "Question concepts", &run.qindex, &opts.site_url)?;
    write(&out_dir.join(&opts.toc_file), &page("Contents", &run.toc_html(opts)))?;
    write(
        &out_dir.join(&opts.crossref_file),
        &page("Cross-reference", &run.crossref_html(opts)),
    )?;
    for name in [&opts.index_file, &opts.qindex_file, &opts.toc_file, &opts.crossref_file] {
        written.push(out_dir.join(name));
    }

    tracing::info!(out_dir = %out_dir.display(), files = written.len(), "wrote artifacts");
    Ok(written)
}

/// Check `source` against a stored record and optionally extract slides
/// `first..=last`. Returns the extracted text, or the whole source.
pub fn verify_file(source_path: &Path, record_path: &Path, range: Option<(usize, usize)>) -> Result<String> {
    let source = std::fs::read_to_string(source_path)
        .wrap_err_with(|| format!("Failed to read {}", source_path.display()))?;
    let record_json = std::fs::read_to_string(record_path)
        .wrap_err_with(|| format!("Failed to read {}", record_path.display()))?;
    let record: IndexRecord = serde_json::from_str(&record_json)
        .wrap_err_with(|| format!("Failed to parse record {}", record_path.display()))?;

    let slices = record
        .verify(&source)
        .wrap_err_with(|| format!("{} does not match its record", source_path.display()))?;

    match range {
        Some((first, last)) => Ok(slices.extract(first..=last)?.to_string()),
        None => Ok(slices.source().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_rejects_non_markdown() {
        let err = collect_sources(&[PathBuf::from("notes.txt")], &Config::default()).unwrap_err();
        assert!(err.to_string().contains("not a markdown file"));
    }

    #[test]
    fn test_page_wraps_body() {
        let html = page("Intro", "<p>x</p>\n");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Intro</title>"));
        assert!(html.contains("<body>\n<p>x</p>\n</body>"));
    }
}
