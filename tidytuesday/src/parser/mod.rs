//! CSV reader with encoding and delimiter auto-detection.
//!
//! Produces raw string records plus normalized headers. Typing happens
//! later, in [`crate::table::Table::ingest`].

use std::io::Read;
use std::path::Path;

use crate::error::{CsvError, CsvResult};

/// Raw records with reading metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Normalized column headers
    pub headers: Vec<String>,
    /// One entry per data row, aligned to `headers` (short rows are not padded)
    pub records: Vec<Vec<String>>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

/// Normalize a header: trim, lowercase, whitespace runs to `_`.
///
/// `"Winner Country "` becomes `"winner_country"`.
pub fn normalize_column_name(name: &str) -> String {
    name.trim()
        .trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Valid UTF-8 is always accepted as-is; chardet occasionally labels short
/// UTF-8 files as Latin-1.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        // Fallback: UTF-8 with lossy conversion
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text with an explicit delimiter.
///
/// Blank lines are skipped, quoted fields may contain the delimiter, extra
/// fields beyond the header width are dropped.
pub fn parse_str(content: &str, delimiter: char, encoding: String) -> CsvResult<ParseResult> {
    parse_reader(content.as_bytes(), delimiter, encoding)
}

fn parse_reader<R: Read>(reader: R, delimiter: char, encoding: String) -> CsvResult<ParseResult> {
    let delimiter = u8::try_from(delimiter).map_err(|_| CsvError::ParseError {
        line: 1,
        message: format!("Delimiter '{}' is not a single byte", delimiter),
    })?;

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let header_record = rdr.headers()?.clone();
    if header_record.is_empty() || header_record.iter().all(|h| h.trim().is_empty()) {
        return Err(CsvError::EmptyFile);
    }

    let mut headers: Vec<String> = Vec::with_capacity(header_record.len());
    for raw in header_record.iter() {
        let name = normalize_column_name(raw);
        if headers.contains(&name) {
            return Err(CsvError::DuplicateHeader(name));
        }
        headers.push(name);
    }

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        records.push(
            record
                .iter()
                .take(headers.len())
                .map(str::to_string)
                .collect(),
        );
    }

    Ok(ParseResult {
        headers,
        records,
        encoding,
        delimiter: char::from(delimiter),
    })
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(CsvError::EmptyFile);
    }

    // Detect encoding
    let encoding = detect_encoding(bytes);

    // Decode content
    let content = decode_content(bytes, &encoding);

    // Detect delimiter
    let delimiter = detect_delimiter(&content);

    // Parse with detected settings
    parse_str(&content, delimiter, encoding)
}

/// Parse CSV file with auto-detection of encoding and delimiter.
///
/// # Example
/// ```ignore
/// let result = parse_csv_file_auto("tdf_winners.csv")?;
/// println!("Encoding: {}, Delimiter: '{}'", result.encoding, result.delimiter);
/// println!("Records: {}", result.records.len());
/// ```
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Parse CSV file with an explicit delimiter, still detecting the encoding.
pub fn parse_csv_file<P: AsRef<Path>>(path: P, delimiter: char) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    let encoding = detect_encoding(&bytes);
    let content = decode_content(&bytes, &encoding);
    parse_str(&content, delimiter, encoding)
}
