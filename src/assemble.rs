//! Document assembly: run the substitution engine over a whole dataset.
//!
//! | tags     | consolidated                          | per row                         |
//! |----------|---------------------------------------|---------------------------------|
//! | indexed  | one template, every row's tags filled | fresh template, own row's tags  |
//! | reusable | fresh template per row, concatenated  | fresh template per row          |
//!
//! Partial coverage never fails a run: tags without a column stay in the
//! text, columns without a tag are logged with a count of 0.

use crate::dataset::Dataset;
use crate::error::Result;
use crate::substitute::{Draft, LiteralTag};
use crate::tags::{TagMode, TagStrategy};
use crate::template::Template;
use regex::Regex;
use serde::Serialize;

/// Appended after every row's stamp in consolidated reusable-tag output.
pub const ROW_SEPARATOR: &str = "\n\n";

/// One document for everything, or one per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputMode {
    #[default]
    Consolidated,
    PerRow,
}

/// Which row number indexed tags use in per-row output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RowNumbering {
    /// Row i fills the `..{i:02}` tags.
    #[default]
    Dataset,
    /// Every row fills the `..01` tags, for templates laid out for a single offer.
    Restart,
}

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub dataset: Dataset,
    pub template: Template,
    pub tag_mode: TagMode,
    pub output_mode: OutputMode,
    pub numbering: RowNumbering,
}

impl RunRequest {
    pub fn new(
        dataset: Dataset,
        template: Template,
        tag_mode: TagMode,
        output_mode: OutputMode,
    ) -> Self {
        Self {
            dataset,
            template,
            tag_mode,
            output_mode,
            numbering: RowNumbering::default(),
        }
    }

    pub fn with_numbering(mut self, numbering: RowNumbering) -> Self {
        self.numbering = numbering;
        self
    }
}

/// One attempted tag replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstitutionRecord {
    /// 1-based dataset row.
    pub row: usize,
    pub column: String,
    pub tag: String,
    pub value: String,
    pub count: usize,
}

/// Substitution log, row-major then column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubstitutionReport {
    records: Vec<SubstitutionRecord>,
}

impl SubstitutionReport {
    pub fn records(&self) -> &[SubstitutionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_replacements(&self) -> usize {
        self.records.iter().map(|r| r.count).sum()
    }

    /// Records whose tag was not found.
    pub fn unmatched(&self) -> impl Iterator<Item = &SubstitutionRecord> {
        self.records.iter().filter(|r| r.count == 0)
    }
}

/// An output document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// 1-based dataset row for per-row documents.
    pub row: Option<usize>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSet {
    Consolidated(Document),
    PerRow(Vec<Document>),
}

impl ArtifactSet {
    pub fn documents(&self) -> &[Document] {
        match self {
            ArtifactSet::Consolidated(doc) => std::slice::from_ref(doc),
            ArtifactSet::PerRow(docs) => docs,
        }
    }
}

/// A tag-shaped string left in an output document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeftoverTag {
    /// Row of the per-row document it was found in.
    pub document_row: Option<usize>,
    pub tag: String,
    pub count: usize,
}

/// Result of a run.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub artifacts: ArtifactSet,
    pub report: SubstitutionReport,
    leftovers: Vec<LeftoverTag>,
}

impl Assembly {
    /// Tags of the run's convention still present in the template text of
    /// the output, in order of first appearance per document. Inserted
    /// values are not scanned, so a value that looks like a tag is not
    /// reported.
    pub fn unresolved_tags(&self) -> &[LeftoverTag] {
        &self.leftovers
    }
}

fn leftover_pattern(mode: TagMode) -> &'static Regex {
    lazy_static::lazy_static! {
        static ref INDEXED: Regex = Regex::new(r"<#[A-Za-z0-9_]+>").unwrap();
        static ref REUSABLE: Regex = Regex::new(r"##[A-Za-z0-9_]+##").unwrap();
    }
    match mode {
        TagMode::Indexed => &*INDEXED,
        TagMode::Reusable => &*REUSABLE,
    }
}

/// Add the tags left in `draft`'s template text to `leftovers`, merging with
/// entries from `doc_start` on (the current document).
fn collect_leftovers(
    draft: &Draft,
    pattern: &Regex,
    document_row: Option<usize>,
    doc_start: usize,
    leftovers: &mut Vec<LeftoverTag>,
) {
    for part in draft.template_parts() {
        for m in pattern.find_iter(part) {
            match leftovers[doc_start..].iter_mut().find(|l| l.tag == m.as_str()) {
                Some(existing) => existing.count += 1,
                None => leftovers.push(LeftoverTag {
                    document_row,
                    tag: m.as_str().to_string(),
                    count: 1,
                }),
            }
        }
    }
}

/// Fill the template with the dataset according to the request.
pub fn assemble(request: &RunRequest) -> Result<Assembly> {
    let strategy = request.tag_mode.strategy();
    let dataset = &request.dataset;
    let template = request.template.text();

    let restart = request.output_mode == OutputMode::PerRow
        && request.numbering == RowNumbering::Restart;
    let highest_tag_number = if restart {
        dataset.len().min(1)
    } else {
        dataset.len()
    };
    strategy.check_rows(highest_tag_number)?;

    log::info!(
        "Assembling {} rows x {} columns into '{}' ({:?} tags, {:?} output)",
        dataset.len(),
        dataset.columns().len(),
        request.template.name(),
        request.tag_mode,
        request.output_mode
    );

    let pattern = leftover_pattern(request.tag_mode);
    let mut leftovers = Vec::new();
    let mut report = SubstitutionReport::default();
    let artifacts = match request.output_mode {
        OutputMode::Consolidated if strategy.stamps_per_row() => {
            let mut text = String::new();
            for row in 0..dataset.len() {
                let mut draft = Draft::new(template);
                fill_row(&mut draft, dataset, row, row + 1, strategy, &mut report)?;
                collect_leftovers(&draft, pattern, None, 0, &mut leftovers);
                text.push_str(&draft.render());
                text.push_str(ROW_SEPARATOR);
            }
            ArtifactSet::Consolidated(Document { row: None, text })
        }
        OutputMode::Consolidated => {
            let mut draft = Draft::new(template);
            for row in 0..dataset.len() {
                fill_row(&mut draft, dataset, row, row + 1, strategy, &mut report)?;
            }
            collect_leftovers(&draft, pattern, None, 0, &mut leftovers);
            ArtifactSet::Consolidated(Document {
                row: None,
                text: draft.render(),
            })
        }
        OutputMode::PerRow => {
            let mut docs = Vec::with_capacity(dataset.len());
            for row in 0..dataset.len() {
                let tag_number = if restart { 1 } else { row + 1 };
                let mut draft = Draft::new(template);
                fill_row(&mut draft, dataset, row, tag_number, strategy, &mut report)?;
                let doc_start = leftovers.len();
                collect_leftovers(&draft, pattern, Some(row + 1), doc_start, &mut leftovers);
                docs.push(Document {
                    row: Some(row + 1),
                    text: draft.render(),
                });
            }
            ArtifactSet::PerRow(docs)
        }
    };

    log::info!(
        "{} substitutions over {} tag lookups ({} not found)",
        report.total_replacements(),
        report.len(),
        report.unmatched().count()
    );

    Ok(Assembly {
        artifacts,
        report,
        leftovers,
    })
}

/// Substitute every column of one row into `draft`, in column order.
fn fill_row(
    draft: &mut Draft,
    dataset: &Dataset,
    row: usize,
    tag_number: usize,
    strategy: &dyn TagStrategy,
    report: &mut SubstitutionReport,
) -> Result<()> {
    for (col, column) in dataset.columns().iter().enumerate() {
        let tag = LiteralTag::new(&strategy.tag(column, tag_number))?;
        let value = dataset.value(row, col).map(|v| v.as_str()).unwrap_or("");
        let count = draft.substitute(&tag, value);
        if count == 0 {
            log::debug!("Row {}: tag {} not found in template", row + 1, tag.as_str());
        }
        report.records.push(SubstitutionRecord {
            row: row + 1,
            column: column.clone(),
            tag: tag.as_str().to_string(),
            value: value.to_string(),
            count,
        });
    }
    Ok(())
}
