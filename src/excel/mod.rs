//! Excel report module
//!
//! Sheet builders turn pipeline artifacts into in-memory [`Sheet`]s;
//! the exporter writes them to a single .xlsx file and the inspector
//! reads one back.

mod exporter;
mod inspector;
mod monitoring_flow;
mod sheet;
mod yield_flow;

pub use exporter::{write_workbook, ExportSummary, ReportExporter, DEFAULT_OUTPUT};
pub use inspector::{inspect_workbook, SheetSummary, WorkbookSummary};
pub use monitoring_flow::{
    build_monitoring_sheet, MONITORING_HEADERS, MONITORING_HEADER_COLOR, MONITORING_SHEET_NAME,
    NOT_AVAILABLE,
};
pub use sheet::{round_to, CellValue, Sheet};
pub use yield_flow::{
    build_yield_flow_sheet, top_features, yield_row_count, STEP_COMBINED, STEP_CROSS_VALIDATION,
    STEP_FEATURE_SELECTION, STEP_FINAL_PREDICTION, STEP_RAW_NDVI, STEP_SEASON_FEATURES,
    STEP_WEATHER, TOP_FEATURES, YIELD_HEADERS, YIELD_HEADER_COLOR, YIELD_SHEET_NAME,
};
