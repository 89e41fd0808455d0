//! Pipeline functions for programmatic use by the CLI.
//!
//! These wrap the library steps (load, assemble, deliver) around files on
//! disk and return structured summaries instead of printing.

use crate::assemble::{assemble, OutputMode, RowNumbering, RunRequest};
use crate::dataset::{Dataset, Delimiter, LoadOptions};
use crate::delivery::{self, FileNaming};
use crate::substitute::LiteralTag;
use crate::tags::{expected_tags, ExpectedTag, TagMode};
use crate::template::Template;
use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Merge
// ============================================================================

/// Configuration for a merge run.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Input CSV path
    pub dataset: PathBuf,
    /// HTML template path
    pub template: PathBuf,
    /// Directory receiving the output files
    pub output_dir: PathBuf,
    pub delimiter: Delimiter,
    /// Treat only empty fields as missing
    pub keep_na_text: bool,
    pub tag_mode: TagMode,
    pub output_mode: OutputMode,
    pub numbering: RowNumbering,
    /// Output file name prefix
    pub prefix: String,
    pub naming: FileNaming,
    /// Write per-row documents as separate files instead of one zip
    pub split: bool,
    pub archive_name: String,
    /// Where to write the substitution report CSV, if anywhere
    pub report: Option<PathBuf>,
}

impl MergeConfig {
    pub fn new(dataset: PathBuf, template: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            dataset,
            template,
            output_dir,
            delimiter: Delimiter::default(),
            keep_na_text: false,
            tag_mode: TagMode::default(),
            output_mode: OutputMode::default(),
            numbering: RowNumbering::default(),
            prefix: delivery::DEFAULT_PREFIX.to_string(),
            naming: FileNaming::default(),
            split: false,
            archive_name: delivery::DEFAULT_ARCHIVE_NAME.to_string(),
            report: None,
        }
    }
}

/// What a merge run produced.
#[derive(Debug, Clone)]
pub struct MergeSummary {
    pub rows: usize,
    pub columns: usize,
    pub documents: usize,
    pub replacements: usize,
    /// Tag lookups that found nothing
    pub unmatched: usize,
    /// Tag-shaped text left in the output
    pub unresolved: usize,
    /// Files written, report included
    pub written: Vec<PathBuf>,
}

impl fmt::Display for MergeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Done! {} rows x {} columns -> {} document(s), {} substitutions ({} tags not found, {} left in output)",
            self.rows, self.columns, self.documents, self.replacements, self.unmatched, self.unresolved
        )?;
        for path in &self.written {
            writeln!(f, "  {}", path.display())?;
        }
        Ok(())
    }
}

fn load_options(delimiter: Delimiter, keep_na_text: bool) -> LoadOptions {
    let options = LoadOptions::with_delimiter(delimiter);
    if keep_na_text {
        options.keep_na_text()
    } else {
        options
    }
}

/// Load, assemble and write the output files.
///
/// Nothing is written unless the whole run succeeds up to delivery.
pub fn run_merge(config: &MergeConfig) -> Result<MergeSummary> {
    let dataset = Dataset::from_path(
        &config.dataset,
        &load_options(config.delimiter, config.keep_na_text),
    )
    .with_context(|| format!("Failed to load dataset {}", config.dataset.display()))?;
    let template = Template::from_path(&config.template)
        .with_context(|| format!("Failed to load template {}", config.template.display()))?;
    let template_name = template.name().to_string();

    let rows = dataset.len();
    let columns = dataset.columns().len();
    let request = RunRequest::new(dataset, template, config.tag_mode, config.output_mode)
        .with_numbering(config.numbering);
    let assembly = assemble(&request)?;

    let leftovers = assembly.unresolved_tags();
    for leftover in leftovers {
        log::debug!(
            "Unresolved {} x{} in document {:?}",
            leftover.tag,
            leftover.count,
            leftover.document_row
        );
    }

    let html = delivery::html_artifacts(
        &assembly.artifacts,
        &config.prefix,
        &template_name,
        config.naming,
    );
    let documents = html.len();
    let artifacts = if config.output_mode == OutputMode::PerRow && !config.split {
        vec![delivery::zip_artifacts(&config.archive_name, &html)?]
    } else {
        html
    };

    let report_bytes = match &config.report {
        Some(_) => {
            let mut buf = Vec::new();
            delivery::write_report_csv(assembly.report.records(), &mut buf)?;
            Some(buf)
        }
        None => None,
    };

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;
    let mut files: Vec<(PathBuf, &[u8])> = artifacts
        .iter()
        .map(|a| (config.output_dir.join(&a.file_name), a.bytes.as_slice()))
        .collect();
    if let (Some(path), Some(bytes)) = (&config.report, &report_bytes) {
        files.push((path.clone(), bytes.as_slice()));
    }
    let written = delivery::write_files(&files)
        .with_context(|| format!("Failed to write output to {}", config.output_dir.display()))?;

    log::info!("Wrote {} file(s) to {}", written.len(), config.output_dir.display());

    Ok(MergeSummary {
        rows,
        columns,
        documents,
        replacements: assembly.report.total_replacements(),
        unmatched: assembly.report.unmatched().count(),
        unresolved: leftovers.iter().map(|l| l.count).sum(),
        written,
    })
}

// ============================================================================
// Tag scan
// ============================================================================

/// Configuration for listing the tags a dataset expects.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub dataset: PathBuf,
    pub delimiter: Delimiter,
    pub tag_mode: TagMode,
    /// Template to count occurrences in
    pub template: Option<PathBuf>,
}

/// An expected tag and how often the template carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCoverage {
    pub expected: ExpectedTag,
    /// `None` when no template was given
    pub occurrences: Option<usize>,
}

/// List every tag the dataset fills, with template occurrence counts.
pub fn scan_tags(config: &ScanConfig) -> Result<Vec<TagCoverage>> {
    let dataset = Dataset::from_path(&config.dataset, &load_options(config.delimiter, false))
        .with_context(|| format!("Failed to load dataset {}", config.dataset.display()))?;
    let template = config
        .template
        .as_deref()
        .map(|p: &Path| {
            Template::from_path(p).with_context(|| format!("Failed to load template {}", p.display()))
        })
        .transpose()?;

    let strategy = config.tag_mode.strategy();
    if let Err(e) = strategy.check_rows(dataset.len()) {
        log::warn!("{}", e);
    }

    expected_tags(&dataset, strategy)
        .into_iter()
        .map(|expected| -> Result<TagCoverage> {
            let occurrences = match &template {
                Some(t) => Some(LiteralTag::new(&expected.tag)?.count_in(t.text())),
                None => None,
            };
            Ok(TagCoverage {
                expected,
                occurrences,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_options_keep_na_text() {
        assert!(load_options(Delimiter::Comma, true).na_values.is_empty());
        assert!(!load_options(Delimiter::Comma, false).na_values.is_empty());
        assert_eq!(load_options(Delimiter::Comma, false).delimiter, Delimiter::Comma);
    }

    #[test]
    fn test_summary_display() {
        let summary = MergeSummary {
            rows: 2,
            columns: 3,
            documents: 1,
            replacements: 6,
            unmatched: 0,
            unresolved: 1,
            written: vec![PathBuf::from("out/personalizado_t.html")],
        };
        let text = summary.to_string();
        assert!(text.starts_with("Done! 2 rows x 3 columns -> 1 document(s), 6 substitutions"));
        assert!(text.contains("  out/personalizado_t.html"));
    }
}
