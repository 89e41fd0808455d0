//! HTML Tag Merge
//!
//! Fills HTML templates with the rows of a CSV file by replacing literal
//! placeholder tags with field values.
//!
//! This library provides:
//! - `tags`: tag spelling for indexed (`<#COL01>`) and reusable (`##COL##`) placeholders
//! - `substitute`: literal, non-reentrant tag replacement
//! - `assemble`: consolidated or per-row documents plus a substitution report
//! - `dataset` / `template`: input loading
//! - `delivery`: output file naming, zip packaging and report CSV
//! - `pipeline`: file-to-file runs used by the CLI
//!
//! Binaries:
//! - `html-merge`: merge and tag-coverage commands

pub mod assemble;
pub mod dataset;
pub mod delivery;
pub mod error;
pub mod pipeline;
pub mod substitute;
pub mod tags;
pub mod template;

pub use assemble::{assemble, ArtifactSet, Assembly, OutputMode, RunRequest, SubstitutionRecord};
pub use dataset::{Dataset, Delimiter, FieldValue, LoadOptions};
pub use error::{InputError, MergeError};
pub use substitute::substitute;
pub use tags::TagMode;
pub use template::Template;
