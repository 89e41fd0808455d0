//! CSV dataset loading.
//!
//! Every value is kept as the exact text found in the file. No type
//! inference and no trimming of values, so numbers, dates and prices reach
//! the template formatted exactly as the spreadsheet exported them. Header
//! names are trimmed.

use crate::error::InputError;
use csv::ReaderBuilder;
use regex::Regex;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// Tokens read as a missing value, besides the empty field.
///
/// Same list pandas' `read_csv` treats as NaN.
pub const DEFAULT_NA_VALUES: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Field delimiter of the CSV input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Delimiter {
    #[default]
    Semicolon,
    Comma,
    Tab,
}

impl Delimiter {
    pub fn as_char(self) -> char {
        match self {
            Delimiter::Semicolon => ';',
            Delimiter::Comma => ',',
            Delimiter::Tab => '\t',
        }
    }

    fn as_byte(self) -> u8 {
        self.as_char() as u8
    }

    fn all() -> [Delimiter; 3] {
        [Delimiter::Semicolon, Delimiter::Comma, Delimiter::Tab]
    }
}

/// Options for reading a dataset.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub delimiter: Delimiter,
    /// Field texts that mean "no value". The empty field always does.
    pub na_values: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::default(),
            na_values: DEFAULT_NA_VALUES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LoadOptions {
    pub fn with_delimiter(delimiter: Delimiter) -> Self {
        Self {
            delimiter,
            ..Self::default()
        }
    }

    /// Only empty fields are missing; "NA", "null" etc. stay literal text.
    pub fn keep_na_text(mut self) -> Self {
        self.na_values.clear();
        self
    }
}

/// A single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Missing,
}

impl FieldValue {
    /// Text to substitute. Missing values become the empty string.
    pub fn as_str(&self) -> &str {
        match self {
            FieldValue::Text(s) => s,
            FieldValue::Missing => "",
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

/// One data row, aligned with [`Dataset::columns`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<FieldValue>,
}

impl Record {
    pub fn new(fields: Vec<FieldValue>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldValue] {
        &self.fields
    }
}

/// Ordered rows sharing one ordered column set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    /// Build a dataset, checking that column names are unique and every
    /// record has one field per column.
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Result<Self, InputError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(InputError::DuplicateColumn {
                    column: column.clone(),
                });
            }
        }
        for (i, record) in records.iter().enumerate() {
            if record.fields.len() != columns.len() {
                return Err(InputError::MalformedDataset {
                    // header is line 1
                    line: i as u64 + 2,
                    message: format!(
                        "expected {} fields, found {}",
                        columns.len(),
                        record.fields.len()
                    ),
                });
            }
        }
        Ok(Self { columns, records })
    }

    /// Read a dataset from delimited text.
    pub fn from_reader<R: Read>(reader: R, options: &LoadOptions) -> Result<Self, InputError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(options.delimiter.as_byte())
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers().map_err(malformed)?.clone();
        let columns: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        if columns.is_empty() || (columns.len() == 1 && columns[0].is_empty()) {
            return Err(InputError::EmptyDataset);
        }

        if columns.len() == 1 {
            if let Some(other) = Delimiter::all()
                .into_iter()
                .filter(|d| *d != options.delimiter)
                .find(|d| columns[0].contains(d.as_char()))
            {
                return Err(InputError::DelimiterMismatch {
                    configured: options.delimiter.as_char(),
                    suspected: other.as_char(),
                });
            }
        }

        lint_headers(&columns);

        let mut records = Vec::new();
        for result in reader.records() {
            let row = result.map_err(malformed)?;
            if row.len() > columns.len() {
                return Err(InputError::MalformedDataset {
                    line: row.position().map(|p| p.line()).unwrap_or(0),
                    message: format!("expected {} fields, found {}", columns.len(), row.len()),
                });
            }
            let mut fields: Vec<FieldValue> = row
                .iter()
                .map(|value| {
                    if value.is_empty() || options.na_values.iter().any(|na| na == value) {
                        FieldValue::Missing
                    } else {
                        FieldValue::Text(value.to_string())
                    }
                })
                .collect();
            // exports often drop trailing empty cells
            fields.resize(columns.len(), FieldValue::Missing);
            records.push(Record::new(fields));
        }

        log::debug!(
            "Loaded dataset: {} columns, {} rows",
            columns.len(),
            records.len()
        );
        Self::new(columns, records)
    }

    pub fn from_bytes(bytes: &[u8], options: &LoadOptions) -> Result<Self, InputError> {
        Self::from_reader(bytes, options)
    }

    pub fn from_path(path: &Path, options: &LoadOptions) -> Result<Self, InputError> {
        let bytes = std::fs::read(path).map_err(|source| InputError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes, options)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of data rows (header excluded).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value at a 0-based row and column position.
    pub fn value(&self, row: usize, column: usize) -> Option<&FieldValue> {
        self.records.get(row).and_then(|r| r.fields.get(column))
    }
}

fn malformed(e: csv::Error) -> InputError {
    let line = e.position().map(|p| p.line()).unwrap_or(0);
    let message = match e.kind() {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => format!("expected {} fields, found {}", expected_len, len),
        _ => e.to_string(),
    };
    InputError::MalformedDataset { line, message }
}

/// Warn about header names that will be awkward inside tags.
fn lint_headers(columns: &[String]) {
    lazy_static::lazy_static! {
        static ref TAG_SAFE: Regex = Regex::new(r"^[A-Z0-9_]+$").unwrap();
    }
    for column in columns {
        if !TAG_SAFE.is_match(column) {
            log::warn!(
                "Column '{}' is not uppercase letters, digits and underscores; tags must spell it exactly",
                column
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(text: &str, delimiter: Delimiter) -> Result<Dataset, InputError> {
        Dataset::from_bytes(text.as_bytes(), &LoadOptions::with_delimiter(delimiter))
    }

    #[test]
    fn test_load_semicolon_dataset() {
        let ds = load(" NOME_PROD ;PRECO\nTênis;199,90\nBola;49,00\n", Delimiter::Semicolon)
            .unwrap();
        assert_eq!(ds.columns(), &["NOME_PROD", "PRECO"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.value(0, 0), Some(&FieldValue::from("Tênis")));
        // values kept verbatim, no numeric parsing
        assert_eq!(ds.value(0, 1).unwrap().as_str(), "199,90");
        assert_eq!(ds.value(1, 1).unwrap().as_str(), "49,00");
    }

    #[test]
    fn test_values_are_not_trimmed() {
        let ds = load("A,B\n  x , y\n", Delimiter::Comma).unwrap();
        assert_eq!(ds.value(0, 0).unwrap().as_str(), "  x ");
        assert_eq!(ds.value(0, 1).unwrap().as_str(), " y");
    }

    #[test]
    fn test_missing_values() {
        let ds = load("A;B;C\n;NaN;null\n", Delimiter::Semicolon).unwrap();
        assert!(ds.value(0, 0).unwrap().is_missing());
        assert!(ds.value(0, 1).unwrap().is_missing());
        assert!(ds.value(0, 2).unwrap().is_missing());
        assert_eq!(ds.value(0, 1).unwrap().as_str(), "");
    }

    #[test]
    fn test_keep_na_text() {
        let options = LoadOptions::with_delimiter(Delimiter::Semicolon).keep_na_text();
        let ds = Dataset::from_bytes(b"A;B\n;NA\n", &options).unwrap();
        assert!(ds.value(0, 0).unwrap().is_missing());
        assert_eq!(ds.value(0, 1), Some(&FieldValue::from("NA")));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            load("", Delimiter::Semicolon),
            Err(InputError::EmptyDataset)
        ));
        assert!(matches!(
            load("\n\n", Delimiter::Comma),
            Err(InputError::EmptyDataset)
        ));
    }

    #[test]
    fn test_header_only_is_empty_dataset_not_error() {
        let ds = load("A;B\n", Delimiter::Semicolon).unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.columns().len(), 2);
    }

    #[test]
    fn test_delimiter_mismatch() {
        let err = load("NOME,PRECO\nBola,10\n", Delimiter::Semicolon).unwrap_err();
        assert!(matches!(
            err,
            InputError::DelimiterMismatch {
                configured: ';',
                suspected: ','
            }
        ));
    }

    #[test]
    fn test_uneven_rows_are_malformed() {
        let err = load("A;B\n1;2\n3;4;5\n", Delimiter::Semicolon).unwrap_err();
        match err {
            InputError::MalformedDataset { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("expected 2 fields, found 3"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_short_rows_padded_with_missing() {
        let ds = load("NOME;FOTO;BANNER\nBola;b.png\nTênis\n", Delimiter::Semicolon).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.value(0, 1).unwrap().as_str(), "b.png");
        assert!(ds.value(0, 2).unwrap().is_missing());
        assert_eq!(ds.value(0, 2).unwrap().as_str(), "");
        assert!(ds.value(1, 1).unwrap().is_missing());
        assert!(ds.value(1, 2).unwrap().is_missing());
    }

    #[test]
    fn test_duplicate_columns() {
        let err = load("A;B;A\n1;2;3\n", Delimiter::Semicolon).unwrap_err();
        assert!(matches!(err, InputError::DuplicateColumn { column } if column == "A"));
    }

    #[test]
    fn test_bom_is_dropped_from_header() {
        let ds = load("\u{feff}TITULO;X\na;b\n", Delimiter::Semicolon).unwrap();
        assert_eq!(ds.columns()[0], "TITULO");
        assert_eq!(ds.column_index("TITULO"), Some(0));
    }

    #[test]
    fn test_quoted_fields_keep_delimiters() {
        let ds = load("NOME;DESC\n\"Bola; oficial\";\"diz \"\"oi\"\"\"\n", Delimiter::Semicolon)
            .unwrap();
        assert_eq!(ds.value(0, 0).unwrap().as_str(), "Bola; oficial");
        assert_eq!(ds.value(0, 1).unwrap().as_str(), "diz \"oi\"");
    }

    #[test]
    fn test_new_rejects_short_record() {
        let err = Dataset::new(
            vec!["A".into(), "B".into()],
            vec![Record::new(vec![FieldValue::from("1")])],
        )
        .unwrap_err();
        assert!(matches!(err, InputError::MalformedDataset { line: 2, .. }));
    }

    #[test]
    fn test_from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Dataset::from_path(&dir.path().join("nope.csv"), &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, InputError::Read { .. }));
    }
}
