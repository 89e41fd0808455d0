//! Turning assembled documents into files: named HTML artifacts, a zip
//! archive of per-row documents, and the substitution report as CSV.

use crate::assemble::{ArtifactSet, Document, SubstitutionRecord};
use crate::error::Result;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

pub const HTML_MIME: &str = "text/html";
pub const ZIP_MIME: &str = "application/zip";
pub const DEFAULT_PREFIX: &str = "personalizado";
pub const DEFAULT_ARCHIVE_NAME: &str = "htmls_personalizados.zip";

/// Names for per-row documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FileNaming {
    /// `<prefix>_linha<row>_<template name>`
    #[default]
    Template,
    /// `<prefix>_<row>.html`
    Numbered,
}

/// A downloadable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// File name of the consolidated document: `<prefix>_<template name>`.
pub fn consolidated_file_name(prefix: &str, template_name: &str) -> String {
    format!("{}_{}", prefix, template_name)
}

/// File name of the document for 1-based `row`.
pub fn row_file_name(prefix: &str, row: usize, template_name: &str, naming: FileNaming) -> String {
    match naming {
        FileNaming::Template => format!("{}_linha{}_{}", prefix, row, template_name),
        FileNaming::Numbered => format!("{}_{}.html", prefix, row),
    }
}

/// One HTML artifact per output document.
pub fn html_artifacts(
    artifacts: &ArtifactSet,
    prefix: &str,
    template_name: &str,
    naming: FileNaming,
) -> Vec<Artifact> {
    match artifacts {
        ArtifactSet::Consolidated(doc) => vec![html(
            consolidated_file_name(prefix, template_name),
            doc,
        )],
        ArtifactSet::PerRow(docs) => docs
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                let row = doc.row.unwrap_or(i + 1);
                html(row_file_name(prefix, row, template_name, naming), doc)
            })
            .collect(),
    }
}

fn html(file_name: String, doc: &Document) -> Artifact {
    Artifact {
        file_name,
        mime: HTML_MIME,
        bytes: doc.text.clone().into_bytes(),
    }
}

/// Pack artifacts into one in-memory zip archive.
pub fn zip_artifacts(archive_name: &str, artifacts: &[Artifact]) -> Result<Artifact> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for artifact in artifacts {
        zip.start_file(artifact.file_name.as_str(), options)?;
        zip.write_all(&artifact.bytes)?;
    }
    let cursor = zip.finish()?;
    Ok(Artifact {
        file_name: archive_name.to_string(),
        mime: ZIP_MIME,
        bytes: cursor.into_inner(),
    })
}

/// Write artifacts into `dir`, returning the written paths. Either every
/// file is written or none is.
pub fn write_artifacts(dir: &Path, artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let files: Vec<(PathBuf, &[u8])> = artifacts
        .iter()
        .map(|a| (dir.join(&a.file_name), a.bytes.as_slice()))
        .collect();
    write_files(&files)
}

/// Write a batch of files all-or-nothing.
///
/// Each file is first written next to its target as `<name>.part`, then
/// renamed into place. On failure the staged files and the targets already
/// renamed are removed.
pub fn write_files(files: &[(PathBuf, &[u8])]) -> Result<Vec<PathBuf>> {
    let staged: Vec<PathBuf> = files.iter().map(|(path, _)| part_path(path)).collect();

    for ((path, bytes), part) in files.iter().zip(&staged) {
        if let Err(e) = std::fs::write(part, bytes) {
            discard(&staged);
            return Err(e.into());
        }
        log::debug!("Staged {} ({} bytes)", path.display(), bytes.len());
    }

    let mut written = Vec::with_capacity(files.len());
    for ((path, _), part) in files.iter().zip(&staged) {
        if let Err(e) = std::fs::rename(part, path) {
            log::warn!("Rolling back {} file(s): {}", written.len(), e);
            discard(&staged);
            discard(&written);
            return Err(e.into());
        }
        written.push(path.clone());
    }
    Ok(written)
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

fn discard(paths: &[PathBuf]) {
    for path in paths {
        // already renamed or never created
        let _ = std::fs::remove_file(path);
    }
}

/// Write the substitution log as CSV: `row,column,tag,value,count`.
pub fn write_report_csv<W: Write>(records: &[SubstitutionRecord], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    if records.is_empty() {
        writer.write_record(["row", "column", "tag", "value", "count"])?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn per_row(texts: &[&str]) -> ArtifactSet {
        ArtifactSet::PerRow(
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| Document {
                    row: Some(i + 1),
                    text: t.to_string(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            consolidated_file_name("personalizado", "oferta.html"),
            "personalizado_oferta.html"
        );
        assert_eq!(
            row_file_name("personalizado", 3, "oferta.html", FileNaming::Template),
            "personalizado_linha3_oferta.html"
        );
        assert_eq!(
            row_file_name("email", 12, "oferta.html", FileNaming::Numbered),
            "email_12.html"
        );
    }

    #[test]
    fn test_html_artifacts_consolidated() {
        let set = ArtifactSet::Consolidated(Document {
            row: None,
            text: "<p>ok</p>".into(),
        });
        let artifacts = html_artifacts(&set, DEFAULT_PREFIX, "t.html", FileNaming::Template);
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].file_name, "personalizado_t.html");
        assert_eq!(artifacts[0].mime, HTML_MIME);
        assert_eq!(artifacts[0].bytes, b"<p>ok</p>");
    }

    #[test]
    fn test_zip_roundtrip_keeps_order() {
        let artifacts = html_artifacts(&per_row(&["um", "dois"]), "p", "t.html", FileNaming::Template);
        let archive = zip_artifacts(DEFAULT_ARCHIVE_NAME, &artifacts).unwrap();
        assert_eq!(archive.mime, ZIP_MIME);
        assert_eq!(archive.file_name, "htmls_personalizados.zip");

        let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes)).unwrap();
        assert_eq!(zip.len(), 2);
        let mut entry = zip.by_index(1).unwrap();
        assert_eq!(entry.name(), "p_linha2_t.html");
        let mut text = String::new();
        entry.read_to_string(&mut text).unwrap();
        assert_eq!(text, "dois");
    }

    #[test]
    fn test_write_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let artifacts = html_artifacts(&per_row(&["a"]), "p", "t.html", FileNaming::Numbered);
        let written = write_artifacts(&out, &artifacts).unwrap();
        assert_eq!(written, vec![out.join("p_1.html")]);
        assert_eq!(std::fs::read_to_string(&written[0]).unwrap(), "a");
    }

    #[test]
    fn test_write_artifacts_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        // a directory in the way of the second file makes its rename fail
        std::fs::create_dir_all(out.join("p_2.html")).unwrap();
        let artifacts = html_artifacts(&per_row(&["a", "b", "c"]), "p", "t.html", FileNaming::Numbered);

        assert!(write_artifacts(&out, &artifacts).is_err());
        assert!(!out.join("p_1.html").exists());
        assert!(!out.join("p_3.html").exists());
        let leftover: Vec<_> = std::fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftover, vec![std::ffi::OsString::from("p_2.html")]);
    }

    #[test]
    fn test_report_csv() {
        let records = vec![SubstitutionRecord {
            row: 1,
            column: "NOME".into(),
            tag: "<#NOME01>".into(),
            value: "Bola, oficial".into(),
            count: 2,
        }];
        let mut buf = Vec::new();
        write_report_csv(&records, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "row,column,tag,value,count\n1,NOME,<#NOME01>,\"Bola, oficial\",2\n"
        );
    }

    #[test]
    fn test_empty_report_has_header() {
        let mut buf = Vec::new();
        write_report_csv(&[], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "row,column,tag,value,count\n");
    }
}
