//! Read a written report back and summarize it

use crate::error::{ReportError, ReportResult};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use serde::Serialize;
use std::path::Path;

/// One worksheet as found on disk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetSummary {
    pub name: String,
    pub headers: Vec<String>,
    /// Data rows, excluding the header
    pub rows: usize,
    /// First-column values with their row counts, in first-seen order
    pub groups: Vec<(String, usize)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkbookSummary {
    pub sheets: Vec<SheetSummary>,
}

impl WorkbookSummary {
    pub fn sheet(&self, name: &str) -> Option<&SheetSummary> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn summarize_sheet(name: &str, range: &Range<Data>) -> SheetSummary {
    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|header| header.iter().map(cell_text).collect())
        .unwrap_or_default();

    let mut groups: Vec<(String, usize)> = Vec::new();
    let mut count = 0;
    for row in rows {
        count += 1;
        let key = row.first().map(cell_text).unwrap_or_default();
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += 1,
            None => groups.push((key, 1)),
        }
    }

    SheetSummary {
        name: name.to_string(),
        headers,
        rows: count,
        groups,
    }
}

/// Open an .xlsx report and summarize every sheet
pub fn inspect_workbook(path: &Path) -> ReportResult<WorkbookSummary> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| ReportError::Export(format!("Failed to open Excel file: {}", e)))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names().to_vec() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| ReportError::Export(format!("Failed to read sheet '{}': {}", name, e)))?;
        sheets.push(summarize_sheet(&name, &range));
    }

    Ok(WorkbookSummary { sheets })
}
