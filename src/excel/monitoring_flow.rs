//! Sheet 2: farmer monitoring flow

use super::sheet::{CellValue, Sheet};
use crate::monitoring::{lookup_conditions, FarmerConditions, SoilLookup, StatusLookup};
use crate::types::FarmerPortfolio;
use tracing::info;

pub const MONITORING_SHEET_NAME: &str = "Farmer_Monitoring_Flow";

pub const MONITORING_HEADERS: &[&str] = &[
    "Farmer",
    "Crop",
    "Acres",
    "GPS_Lat",
    "GPS_Lon",
    "Soil_pH",
    "Nitrogen_g_kg",
    "SOC_g_kg",
    "Moisture_Status",
    "Anomaly_Status",
];

pub const MONITORING_HEADER_COLOR: u32 = 0xD35400;

/// Shown in soil columns when no usable value exists
pub const NOT_AVAILABLE: &str = "N/A";

const COORD_PLACES: i32 = 2;

const COL_FARMER: usize = 0;
const COL_CROP: usize = 1;
const COL_ACRES: usize = 2;
const COL_LAT: usize = 3;
const COL_LON: usize = 4;
const COL_PH: usize = 5;
const COL_NITROGEN: usize = 6;
const COL_SOC: usize = 7;
const COL_MOISTURE: usize = 8;
const COL_ANOMALY: usize = 9;

/// A soil value rounded for display, or `N/A` when it is not a positive number
fn soil_cell(value: Option<f64>, places: i32) -> CellValue {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => CellValue::rounded(v, places),
        _ => CellValue::text(NOT_AVAILABLE),
    }
}

/// Build the farmer monitoring sheet.
///
/// Lookups run once per farmer; their results are repeated on every crop row
/// of that farmer. A farmer without farms still triggers the lookups but
/// contributes no rows.
pub fn build_monitoring_sheet(
    portfolio: &FarmerPortfolio,
    soil: &dyn SoilLookup,
    status: &dyn StatusLookup,
) -> Sheet {
    let mut sheet = Sheet::new(
        MONITORING_SHEET_NAME,
        MONITORING_HEADERS,
        MONITORING_HEADER_COLOR,
    );

    for (n, farmer) in portfolio.farmers().iter().enumerate() {
        info!(
            "Farmer {}: {} - {} crops, {} acres",
            n + 1,
            farmer.name,
            farmer.farms.len(),
            farmer.total_acres()
        );

        let FarmerConditions {
            soil: sample,
            status: conditions,
        } = lookup_conditions(farmer, soil, status);

        for farm in &farmer.farms {
            let mut row = sheet.blank_row();
            row[COL_FARMER] = CellValue::text(&farmer.name);
            row[COL_CROP] = CellValue::text(&farm.crop);
            row[COL_ACRES] = CellValue::Number(farm.size);
            if let Some([lat, lon]) = farm.coords.first() {
                row[COL_LAT] = CellValue::rounded(*lat, COORD_PLACES);
                row[COL_LON] = CellValue::rounded(*lon, COORD_PLACES);
            }
            row[COL_PH] = soil_cell(sample.map(|s| s.ph), 2);
            row[COL_NITROGEN] = soil_cell(sample.map(|s| s.nitrogen), 2);
            row[COL_SOC] = soil_cell(sample.map(|s| s.soc), 1);
            row[COL_MOISTURE] = CellValue::text(conditions.moisture.label());
            row[COL_ANOMALY] = CellValue::text(conditions.anomaly.label());
            sheet.push_row(row);
        }
    }

    info!(
        "Sheet 2: {} rows across {} farmers",
        sheet.row_count(),
        portfolio.farmer_count()
    );
    sheet
}
