//! Error types for dataset/template loading and document assembly.
//!
//! `InputError` covers everything the user can fix by supplying different
//! files or options. `MergeError` wraps it together with the failures that
//! are not the user's doing (pattern compilation, archive or report
//! writing, I/O).

use std::path::PathBuf;
use thiserror::Error;

/// Fatal problems with the inputs of a run.
#[derive(Debug, Error)]
pub enum InputError {
    /// The dataset has no header (empty file or only blank lines).
    #[error("the CSV file is empty or has no header")]
    EmptyDataset,

    /// The CSV could not be parsed.
    #[error("failed to parse the CSV at line {line}: {message} (check the delimiter)")]
    MalformedDataset { line: u64, message: String },

    /// The header parsed as one column but contains another delimiter.
    #[error("the CSV header looks '{suspected}'-delimited but '{configured}' was selected")]
    DelimiterMismatch { configured: char, suspected: char },

    /// The same column name appears twice in the header.
    #[error("column '{column}' appears more than once in the CSV header")]
    DuplicateColumn { column: String },

    /// The template is not valid UTF-8.
    #[error("template '{name}' is not valid UTF-8: {message}")]
    TemplateEncoding { name: String, message: String },

    /// Indexed tags carry a two-digit row number.
    #[error("indexed tags support at most {max} rows, the dataset has {rows}")]
    TooManyRows { rows: usize, max: usize },

    /// An input file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Any failure of a merge run.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error(transparent)]
    Input(#[from] InputError),

    /// A tag could not be compiled into a literal matcher.
    #[error("failed to build matcher for tag: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to build zip archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("failed to write substitution report: {0}")]
    Report(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MergeError {
    /// True when the failure is the user's input rather than an unexpected fault.
    pub fn is_input(&self) -> bool {
        matches!(self, MergeError::Input(_))
    }
}

pub type Result<T> = std::result::Result<T, MergeError>;
