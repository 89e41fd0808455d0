//! HTML merge tool - fill HTML templates with CSV rows
//!
//! Tags in the template name a CSV column. Indexed tags (`<#NOME_PROD01>`)
//! also carry the 1-based row number; reusable tags (`##NOME_PROD##`) are
//! filled once per row on a fresh copy of the template.
//!
//! Usage:
//!   html-merge merge --csv ofertas.csv --template email.html -o out/
//!   html-merge merge --csv ofertas.csv --template card.html --tags reusable --output-mode per-row
//!   html-merge tags --csv ofertas.csv --template email.html

use anyhow::Result;
use clap::{Parser, Subcommand};
use html_tag_merge::assemble::{OutputMode, RowNumbering};
use html_tag_merge::dataset::Delimiter;
use html_tag_merge::delivery::{self, FileNaming};
use html_tag_merge::error::{InputError, MergeError};
use html_tag_merge::pipeline::{run_merge, scan_tags, MergeConfig, ScanConfig};
use html_tag_merge::tags::TagMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "html-merge")]
#[command(about = "Fill HTML templates with the rows of a CSV file")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Substitute CSV values into the template and write the result
    Merge {
        /// Input CSV file (header = column names used in the tags)
        #[arg(long)]
        csv: PathBuf,

        /// HTML template file
        #[arg(long)]
        template: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// CSV field delimiter
        #[arg(short, long, value_enum, default_value = "semicolon", env = "HTML_MERGE_DELIMITER")]
        delimiter: Delimiter,

        /// Tag convention used by the template
        #[arg(long, value_enum, default_value = "indexed", env = "HTML_MERGE_TAG_MODE")]
        tags: TagMode,

        /// One HTML for all rows, or one HTML per row
        #[arg(long, value_enum, default_value = "consolidated", env = "HTML_MERGE_OUTPUT_MODE")]
        output_mode: OutputMode,

        /// Per-row indexed output: fill each row into the 01 tags
        #[arg(long)]
        restart_numbering: bool,

        /// Only empty fields count as missing ("NA", "null" etc. stay as text)
        #[arg(long)]
        keep_na_text: bool,

        /// Output file name prefix
        #[arg(long, default_value = delivery::DEFAULT_PREFIX)]
        prefix: String,

        /// Per-row file naming
        #[arg(long, value_enum, default_value = "template")]
        naming: FileNaming,

        /// Per-row output: write separate files instead of one zip
        #[arg(long)]
        split: bool,

        /// Per-row output: zip archive file name
        #[arg(long, default_value = delivery::DEFAULT_ARCHIVE_NAME)]
        archive: String,

        /// Write the substitution report (row, column, tag, value, count) to this CSV
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// List the tags the CSV fills and how often the template contains each
    Tags {
        /// Input CSV file
        #[arg(long)]
        csv: PathBuf,

        /// HTML template to check (optional)
        #[arg(long)]
        template: Option<PathBuf>,

        /// CSV field delimiter
        #[arg(short, long, value_enum, default_value = "semicolon", env = "HTML_MERGE_DELIMITER")]
        delimiter: Delimiter,

        /// Tag convention
        #[arg(long, value_enum, default_value = "indexed", env = "HTML_MERGE_TAG_MODE")]
        tags: TagMode,

        /// Only list tags missing from the template
        #[arg(long, requires = "template")]
        missing: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        log::error!("{:#}", e);
        eprintln!("{}", user_message(&e));
        std::process::exit(1);
    }
}

/// Input problems are shown as-is; anything else is reported as unexpected.
fn user_message(e: &anyhow::Error) -> String {
    let is_input = e.downcast_ref::<InputError>().is_some()
        || e.downcast_ref::<MergeError>().is_some_and(MergeError::is_input);
    if is_input {
        format!("Error: {:#}", e)
    } else {
        format!("Unexpected error: {:#}", e)
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Merge {
            csv,
            template,
            output,
            delimiter,
            tags,
            output_mode,
            restart_numbering,
            keep_na_text,
            prefix,
            naming,
            split,
            archive,
            report,
        } => {
            let mut config = MergeConfig::new(csv, template, output);
            config.delimiter = delimiter;
            config.keep_na_text = keep_na_text;
            config.tag_mode = tags;
            config.output_mode = output_mode;
            config.numbering = if restart_numbering {
                RowNumbering::Restart
            } else {
                RowNumbering::Dataset
            };
            config.prefix = prefix;
            config.naming = naming;
            config.split = split;
            config.archive_name = archive;
            config.report = report;

            let summary = run_merge(&config)?;
            print!("{}", summary);
        }
        Commands::Tags {
            csv,
            template,
            delimiter,
            tags,
            missing,
        } => {
            let config = ScanConfig {
                dataset: csv,
                delimiter,
                tag_mode: tags,
                template,
            };
            let coverage = scan_tags(&config)?;

            println!("{:<6} {:<24} {:<32} {}", "Row", "Column", "Tag", "Found");
            for entry in &coverage {
                if missing && entry.occurrences != Some(0) {
                    continue;
                }
                let row = entry
                    .expected
                    .row
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "*".to_string());
                let found = entry
                    .occurrences
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<6} {:<24} {:<32} {}",
                    row, entry.expected.column, entry.expected.tag, found
                );
            }

            let absent = coverage.iter().filter(|c| c.occurrences == Some(0)).count();
            if absent > 0 {
                println!("\n{} of {} tags not found in the template", absent, coverage.len());
            }
        }
    }
    Ok(())
}
