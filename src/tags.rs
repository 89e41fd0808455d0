//! Tag addressing: which literal placeholder stands for a (row, column).
//!
//! Two conventions exist:
//! - indexed tags `<#COLUMN07>`, one per row and column, all rows in one
//!   shared template
//! - reusable tags `##COLUMN##`, the same text for every row, stamped on a
//!   fresh copy of the template per row

use crate::dataset::Dataset;
use crate::error::InputError;

/// Highest row number an indexed tag can carry.
pub const MAX_INDEXED_ROWS: usize = 99;

/// Tag convention of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TagMode {
    /// `<#COLUMN01>`, `<#COLUMN02>`, ...
    #[default]
    Indexed,
    /// `##COLUMN##`
    Reusable,
}

impl TagMode {
    pub fn strategy(self) -> &'static dyn TagStrategy {
        match self {
            TagMode::Indexed => &IndexedTag,
            TagMode::Reusable => &ReusableTag,
        }
    }
}

/// How a tag is spelled for a column and row.
pub trait TagStrategy {
    /// Literal tag for `column` at 1-based `row`.
    fn tag(&self, column: &str, row: usize) -> String;

    /// Whether the template is stamped once per row (fresh copy each time)
    /// rather than carrying every row's tags at once.
    fn stamps_per_row(&self) -> bool;

    /// Reject tag numbers the convention cannot express.
    fn check_rows(&self, rows: usize) -> Result<(), InputError> {
        let _ = rows;
        Ok(())
    }
}

/// `<#` + column + two-digit row + `>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexedTag;

impl TagStrategy for IndexedTag {
    fn tag(&self, column: &str, row: usize) -> String {
        format!("<#{}{:02}>", column, row)
    }

    fn stamps_per_row(&self) -> bool {
        false
    }

    fn check_rows(&self, rows: usize) -> Result<(), InputError> {
        if rows > MAX_INDEXED_ROWS {
            return Err(InputError::TooManyRows {
                rows,
                max: MAX_INDEXED_ROWS,
            });
        }
        Ok(())
    }
}

/// `##` + column + `##`; the row is not part of the tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReusableTag;

impl TagStrategy for ReusableTag {
    fn tag(&self, column: &str, _row: usize) -> String {
        format!("##{}##", column)
    }

    fn stamps_per_row(&self) -> bool {
        true
    }
}

/// A tag a template is expected to contain for some dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedTag {
    /// 1-based row, `None` for reusable tags shared by every row.
    pub row: Option<usize>,
    pub column: String,
    pub tag: String,
}

/// Every tag a template should carry to receive the whole dataset, row-major.
/// Reusable tags are listed once per column.
pub fn expected_tags(dataset: &Dataset, strategy: &dyn TagStrategy) -> Vec<ExpectedTag> {
    if strategy.stamps_per_row() {
        return dataset
            .columns()
            .iter()
            .map(|column| ExpectedTag {
                row: None,
                column: column.clone(),
                tag: strategy.tag(column, 1),
            })
            .collect();
    }

    let mut tags = Vec::with_capacity(dataset.len() * dataset.columns().len());
    for row in 1..=dataset.len() {
        for column in dataset.columns() {
            tags.push(ExpectedTag {
                row: Some(row),
                column: column.clone(),
                tag: strategy.tag(column, row),
            });
        }
    }
    tags
}
