//! Excel exporter implementation

use super::monitoring_flow::build_monitoring_sheet;
use super::sheet::{CellValue, Sheet};
use super::yield_flow::{build_yield_flow_sheet, top_features, TOP_FEATURES};
use crate::error::{ReportError, ReportResult};
use crate::monitoring::{SoilLookup, StatusLookup};
use crate::types::{CvSummary, ReportInput};
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default output file, written to the working directory
pub const DEFAULT_OUTPUT: &str = "Complete_System_Data_Movement.xlsx";

/// Width used for the descriptive text columns
const WIDE_COLUMN: f64 = 36.0;

/// What was written, for the closing summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSummary {
    pub output: PathBuf,
    pub yield_rows: usize,
    pub monitoring_rows: usize,
    pub timeseries: usize,
    pub weather: usize,
    pub combined: usize,
    pub seasons: usize,
    pub features_selected: usize,
    pub cv: CvSummary,
    pub predicted_yield: f64,
    pub prediction_std: f64,
    pub farmers: usize,
    pub crops: usize,
    pub acres: f64,
}

/// Builds both report sheets and writes them as one workbook
pub struct ReportExporter<'a> {
    soil: &'a dyn SoilLookup,
    status: &'a dyn StatusLookup,
}

impl<'a> ReportExporter<'a> {
    /// Create an exporter backed by the given monitoring services
    pub fn new(soil: &'a dyn SoilLookup, status: &'a dyn StatusLookup) -> Self {
        Self { soil, status }
    }

    /// Build the yield and monitoring sheets, in workbook order
    pub fn build_sheets(&self, input: &ReportInput) -> ReportResult<Vec<Sheet>> {
        let yield_sheet = build_yield_flow_sheet(&input.pipeline)?;
        let monitoring_sheet = build_monitoring_sheet(&input.portfolio, self.soil, self.status);
        Ok(vec![yield_sheet, monitoring_sheet])
    }

    /// Export the report to an Excel .xlsx file, replacing any existing file
    pub fn export(&self, input: &ReportInput, output_path: &Path) -> ReportResult<ExportSummary> {
        let sheets = self.build_sheets(input)?;
        write_workbook(&sheets, output_path)?;

        let pipeline = &input.pipeline;
        let summary = ExportSummary {
            output: output_path.to_path_buf(),
            yield_rows: sheets[0].row_count(),
            monitoring_rows: sheets[1].row_count(),
            timeseries: pipeline.timeseries.len(),
            weather: pipeline.weather.len(),
            combined: pipeline.combined.len(),
            seasons: pipeline.season_features.len(),
            features_selected: top_features(&pipeline.feature_importance, TOP_FEATURES).len(),
            cv: pipeline.cv_result.summary()?,
            predicted_yield: pipeline.final_prediction.predicted_yield,
            prediction_std: pipeline.final_prediction.std_dev(),
            farmers: input.portfolio.farmer_count(),
            crops: input.portfolio.crop_count(),
            acres: input.portfolio.total_acres(),
        };

        info!(
            output = %output_path.display(),
            yield_rows = summary.yield_rows,
            monitoring_rows = summary.monitoring_rows,
            "export complete"
        );
        Ok(summary)
    }
}

/// Bold white text on the sheet's color
fn header_format(color: u32) -> Format {
    Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(color))
}

/// Write sheets to a new workbook at `output_path`
pub fn write_workbook(sheets: &[Sheet], output_path: &Path) -> ReportResult<()> {
    let mut workbook = Workbook::new();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        write_sheet(worksheet, sheet)?;
    }

    workbook
        .save(output_path)
        .map_err(|e| ReportError::Save {
            path: output_path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok(())
}

/// Write the header row and all data rows of one sheet
fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet) -> ReportResult<()> {
    worksheet
        .set_name(sheet.name)
        .map_err(|e| ReportError::Export(format!("Failed to set worksheet name: {}", e)))?;

    let format = header_format(sheet.header_color);
    for (col_idx, header) in sheet.headers.iter().enumerate() {
        let col = col_idx as u16;
        worksheet
            .write_string_with_format(0, col, *header, &format)
            .map_err(|e| ReportError::Export(format!("Failed to write header: {}", e)))?;

        // Widen free-text columns; the rest keep Excel's default
        if matches!(*header, "Transformation" | "Feature_Sample" | "Output") {
            worksheet.set_column_width(col, WIDE_COLUMN).ok();
        }
    }
    worksheet.set_freeze_panes(1, 0).ok();

    for (row_idx, row) in sheet.rows().iter().enumerate() {
        let excel_row = (row_idx + 1) as u32; // +1 for header row
        for (col_idx, cell) in row.iter().enumerate() {
            write_cell_value(worksheet, excel_row, col_idx as u16, cell)?;
        }
    }

    debug!(sheet = sheet.name, rows = sheet.row_count(), "sheet written");
    Ok(())
}

/// Write a single cell; empty cells are skipped
fn write_cell_value(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
) -> ReportResult<()> {
    match value {
        CellValue::Empty => {}
        CellValue::Text(text) => {
            worksheet
                .write_string(row, col, text)
                .map_err(|e| ReportError::Export(format!("Failed to write text: {}", e)))?;
        }
        CellValue::Number(number) => {
            worksheet
                .write_number(row, col, *number)
                .map_err(|e| ReportError::Export(format!("Failed to write number: {}", e)))?;
        }
    }
    Ok(())
}
