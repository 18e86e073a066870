//! In-memory worksheet model
//!
//! Sheet builders produce a [`Sheet`]; only the exporter touches
//! `rust_xlsxwriter`. This keeps the row/column contract testable without
//! writing files.

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    /// A number rounded to `places` decimals
    pub fn rounded(value: f64, places: i32) -> Self {
        CellValue::Number(round_to(value, places))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

/// Round half away from zero to `places` decimals
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// A named sheet with a fixed header row and a header fill color
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: &'static str,
    pub headers: &'static [&'static str],
    /// RGB fill for the header row, e.g. `0x366092`
    pub header_color: u32,
    rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(name: &'static str, headers: &'static [&'static str], header_color: u32) -> Self {
        Self {
            name,
            headers,
            header_color,
            rows: Vec::new(),
        }
    }

    /// Start a blank row as wide as the header
    pub fn blank_row(&self) -> Vec<CellValue> {
        vec![CellValue::Empty; self.headers.len()]
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        debug_assert_eq!(row.len(), self.headers.len());
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Zero-based index of a header
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| *h == header)
    }

    /// All values in the named column
    pub fn column(&self, header: &str) -> Vec<&CellValue> {
        match self.column_index(header) {
            Some(idx) => self.rows.iter().map(|r| &r[idx]).collect(),
            None => Vec::new(),
        }
    }

    /// Rows whose first column is the text `label`
    pub fn rows_labeled<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Vec<CellValue>> {
        self.rows
            .iter()
            .filter(move |r| r.first().and_then(CellValue::as_text) == Some(label))
    }
}
