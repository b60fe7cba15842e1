use std::path::Path;

use calamine::{Data, Reader};

use crate::error::{Result, TallyError};
use crate::models::RawTable;

/// Declared input format. Callers may force one (bank portals hand out
/// `.dat` and extensionless exports); otherwise the extension decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Spreadsheet,
}

impl FileFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "xlsx" | "xls" | "xlsb" | "ods" => Some(Self::Spreadsheet),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Spreadsheet => "spreadsheet",
        }
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Pick the field separator by comparing comma vs semicolon counts on the
/// first physical line. European bank exports are routinely `;`-separated.
fn detect_separator(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or("");
    let commas = first_line.matches(',').count();
    let semis = first_line.matches(';').count();
    if semis > commas {
        b';'
    } else {
        b','
    }
}

pub fn parse_csv(content: &str) -> Result<RawTable> {
    let sep = detect_separator(content);
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(sep)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        // Malformed individual rows are tolerated; they surface downstream
        // as skip counts, never as an abort.
        let Ok(record) = result else { continue };
        let fields: Vec<String> = record.iter().map(|f| f.to_string()).collect();
        if fields.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        rows.push(fields);
    }

    if rows.len() < 2 {
        return Err(TallyError::NoDataRows);
    }
    let headers = rows.remove(0);
    Ok(RawTable { headers, rows })
}

// ---------------------------------------------------------------------------
// Spreadsheets
// ---------------------------------------------------------------------------

/// Whole floats render without a trailing `.0` so Excel date serials come
/// through as `45667`, not `45667.0`.
fn format_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => format_number(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => format_number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Read the first sheet only; row 1 is the header row.
pub fn parse_workbook(path: &Path) -> Result<RawTable> {
    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| TallyError::Spreadsheet(format!("failed to open workbook: {e}")))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| TallyError::Spreadsheet("workbook has no sheets".to_string()))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| TallyError::Spreadsheet(format!("failed to read sheet '{sheet}': {e}")))?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for row in range.rows() {
        let fields: Vec<String> = row.iter().map(cell_to_string).collect();
        if fields.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        rows.push(fields);
    }

    if rows.len() < 2 {
        return Err(TallyError::NoDataRows);
    }
    let headers = rows.remove(0);
    Ok(RawTable { headers, rows })
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

pub fn sniff_format(path: &Path) -> Option<FileFormat> {
    FileFormat::from_str(&extension(path))
}

pub fn parse_path(path: &Path, format: Option<FileFormat>) -> Result<RawTable> {
    let format = format
        .or_else(|| sniff_format(path))
        .ok_or_else(|| TallyError::UnknownFormat(extension(path)))?;
    match format {
        FileFormat::Csv => {
            let bytes = std::fs::read(path)?;
            parse_csv(&String::from_utf8_lossy(&bytes))
        }
        FileFormat::Spreadsheet => parse_workbook(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma_separated() {
        let table = parse_csv("date,description,amount\n01/02/2024,Coffee,-3.50\n").unwrap();
        assert_eq!(table.headers, vec!["date", "description", "amount"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][1], "Coffee");
    }

    #[test]
    fn test_semicolon_separated() {
        let table = parse_csv("date;description;amount\n01/02/2024;Coffee;-3,50\n").unwrap();
        assert_eq!(table.headers.len(), 3);
        assert_eq!(table.rows[0][2], "-3,50");
    }

    #[test]
    fn test_quoted_field_with_separator() {
        let table = parse_csv("date,description,amount\n01/02/2024,\"Acme, Inc.\",100\n").unwrap();
        assert_eq!(table.rows[0][1], "Acme, Inc.");
    }

    #[test]
    fn test_quoted_multiline_field() {
        let content = "date,description,amount\n01/02/2024,\"line one\nline two\",100\n";
        let table = parse_csv(content).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][1], "line one\nline two");
    }

    #[test]
    fn test_escaped_quotes() {
        let table = parse_csv("date,description,amount\n01/02/2024,\"say \"\"hi\"\"\",100\n").unwrap();
        assert_eq!(table.rows[0][1], "say \"hi\"");
    }

    #[test]
    fn test_blank_rows_skipped() {
        let table = parse_csv("date,description,amount\n\n, ,\n01/02/2024,Coffee,1\n").unwrap();
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_header_only_is_no_data() {
        assert!(matches!(
            parse_csv("date,description,amount\n"),
            Err(TallyError::NoDataRows)
        ));
    }

    #[test]
    fn test_empty_input_is_no_data() {
        assert!(matches!(parse_csv(""), Err(TallyError::NoDataRows)));
    }

    #[test]
    fn test_format_override_beats_extension_sniffing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.dat");
        std::fs::write(&path, "date,description,amount\n01/02/2024,Coffee,1\n").unwrap();
        assert!(matches!(
            parse_path(&path, None),
            Err(TallyError::UnknownFormat(_))
        ));
        let table = parse_path(&path, Some(FileFormat::Csv)).unwrap();
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_format_number_drops_whole_float_suffix() {
        assert_eq!(format_number(45667.0), "45667");
        assert_eq!(format_number(3.5), "3.5");
    }
}
