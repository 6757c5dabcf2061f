//! Spreadsheet workbooks (.xlsx, .xlsm, .xlsb, .xls, .ods)
//!
//! Only the first worksheet is read. Its first row is the header row.

use std::path::Path;

use calamine::{open_workbook_auto, Data, DataType, Reader};

use crate::core::error::{HabError, HabResult};

use super::common::ImportTable;

const EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// True when the extension names a workbook format
pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| EXTENSIONS.iter().any(|w| ext.eq_ignore_ascii_case(w)))
}

pub fn read_workbook(path: &Path) -> HabResult<ImportTable> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        HabError::Validation(format!("cannot open workbook {}: {}", path.display(), e))
    })?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| HabError::Validation("workbook has no worksheet".to_string()))?
        .map_err(|e| HabError::Validation(format!("cannot read first worksheet: {}", e)))?;

    let mut rows = range.rows().map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let headers = rows.next().unwrap_or_default();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(HabError::Validation("input has no header row".to_string()));
    }
    tracing::debug!(path = %path.display(), columns = headers.len(), "read worksheet");

    Ok(ImportTable::new(headers, rows.collect()))
}

/// Cell contents as the delimited reader would have seen them
///
/// Whole numbers lose their `.0` so that matricules stay five digits, and
/// date cells become ISO dates.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workbook_extensions() {
        assert!(is_workbook(Path::new("staff.xlsx")));
        assert!(is_workbook(Path::new("STAFF.XLS")));
        assert!(is_workbook(Path::new("staff.ods")));
        assert!(!is_workbook(Path::new("staff.csv")));
        assert!(!is_workbook(Path::new("staff")));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Float(12345.0)), "12345");
        assert_eq!(cell_text(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_text(&Data::Int(54321)), "54321");
        assert_eq!(cell_text(&Data::String("H1V, B1V".to_string())), "H1V, B1V");
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::DateTimeIso("2024-01-05".to_string())), "2024-01-05");
    }

    #[test]
    fn test_unreadable_workbook_is_a_validation_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("staff.xlsx");
        std::fs::write(&path, "not a workbook").unwrap();
        assert!(matches!(read_workbook(&path), Err(HabError::Validation(_))));
    }
}
