//! Farmflow - Excel data-movement report for yield prediction and farmer monitoring
//!
//! This library turns artifacts that an NDVI yield-prediction pipeline has
//! already computed, plus a farmer portfolio and per-farmer monitoring
//! lookups, into a two-sheet Excel workbook.
//!
//! # Features
//!
//! - `Yield_Prediction_Flow` sheet: raw NDVI → weather → merge → season
//!   features → feature selection → cross-validation → final prediction
//! - `Farmer_Monitoring_Flow` sheet: one row per crop with soil, moisture
//!   and anomaly status looked up once per farmer
//! - Pluggable lookup services; a failed lookup only affects its farmer
//! - Read-back inspection of written reports
//!
//! # Example
//!
//! ```no_run
//! use farmflow::excel::ReportExporter;
//! use farmflow::monitoring::StaticLookups;
//! use farmflow::parser::parse_report_input;
//! use std::path::Path;
//!
//! let input = parse_report_input(Path::new("pipeline.yaml"))?;
//! let lookups = StaticLookups::load(Path::new("lookups.yaml"))?;
//!
//! let exporter = ReportExporter::new(&lookups, &lookups);
//! let summary = exporter.export(&input, Path::new("Complete_System_Data_Movement.xlsx"))?;
//! println!("Rows: {} + {}", summary.yield_rows, summary.monitoring_rows);
//! # Ok::<(), farmflow::error::ReportError>(())
//! ```

pub mod cli;
pub mod error;
pub mod excel;
pub mod monitoring;
pub mod parser;
pub mod types;

// Re-export commonly used types
pub use error::{ReportError, ReportResult};
pub use types::{FarmerPortfolio, ReportInput, YieldPipeline};
