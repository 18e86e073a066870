//! Sheet 1: yield prediction data flow

use super::sheet::{CellValue, Sheet};
use crate::error::ReportResult;
use crate::types::{CvSummary, FeatureImportance, YieldPipeline};
use tracing::info;

pub const YIELD_SHEET_NAME: &str = "Yield_Prediction_Flow";

pub const YIELD_HEADERS: &[&str] = &[
    "Step",
    "Transformation",
    "Date",
    "Season",
    "NDVI_Mean",
    "NDVI_Std",
    "Images",
    "Temp_C",
    "Rain_mm",
    "Feature_Sample",
    "Output",
];

pub const YIELD_HEADER_COLOR: u32 = 0x366092;

/// Number of top-ranked features shown in the selection step
pub const TOP_FEATURES: usize = 5;

/// Season-feature columns sampled per row
pub const SAMPLE_FEATURES: usize = 3;

pub const STEP_RAW_NDVI: &str = "1-Raw_NDVI";
pub const STEP_WEATHER: &str = "2-Weather";
pub const STEP_COMBINED: &str = "3-Combined";
pub const STEP_SEASON_FEATURES: &str = "4-Season_Features";
pub const STEP_FEATURE_SELECTION: &str = "5-Feature_Selection";
pub const STEP_CROSS_VALIDATION: &str = "6-Cross_Validation";
pub const STEP_FINAL_PREDICTION: &str = "7-Final_Prediction";

const COL_STEP: usize = 0;
const COL_TRANSFORMATION: usize = 1;
const COL_DATE: usize = 2;
const COL_SEASON: usize = 3;
const COL_NDVI_MEAN: usize = 4;
const COL_NDVI_STD: usize = 5;
const COL_IMAGES: usize = 6;
const COL_TEMP: usize = 7;
const COL_RAIN: usize = 8;
const COL_FEATURE_SAMPLE: usize = 9;
const COL_OUTPUT: usize = 10;

/// Highest-importance features first, at most `limit` of them.
/// Features without a finite score are never ranked.
pub fn top_features(importance: &[FeatureImportance], limit: usize) -> Vec<&FeatureImportance> {
    let mut ranked: Vec<&FeatureImportance> = importance
        .iter()
        .filter(|f| f.importance.is_finite())
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked.truncate(limit);
    ranked
}

/// Rows `build_yield_flow_sheet` would emit, without building them.
///
/// Fails on the same ragged CV input the builder rejects.
pub fn yield_row_count(pipeline: &YieldPipeline) -> ReportResult<usize> {
    let folds = pipeline.cv_result.folds()?;
    Ok(pipeline.timeseries.len()
        + pipeline.weather.len()
        + pipeline.combined.len()
        + pipeline.season_features.len()
        + top_features(&pipeline.feature_importance, TOP_FEATURES).len()
        + folds.len()
        + 1)
}

fn format_optional(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "n/a".to_string(),
    }
}

/// CV footer shared by every fold row
fn cv_output(summary: &CvSummary) -> String {
    format!(
        "MAE={} kg, R²={}",
        format_optional(summary.mae, 1),
        format_optional(summary.r2, 3)
    )
}

/// Build the yield prediction flow sheet.
///
/// Rows follow pipeline order: raw NDVI, weather, combined, season features,
/// top features, one row per CV fold, then the final prediction.
pub fn build_yield_flow_sheet(pipeline: &YieldPipeline) -> ReportResult<Sheet> {
    // ragged CV input is rejected before any row is emitted
    let folds = pipeline.cv_result.folds()?;
    let cv_summary = pipeline.cv_result.summary()?;

    let mut sheet = Sheet::new(YIELD_SHEET_NAME, YIELD_HEADERS, YIELD_HEADER_COLOR);

    // Step 1: raw NDVI
    info!(
        "[1/7] Extracting {} raw NDVI observations",
        pipeline.timeseries.len()
    );
    let output = format!("{} observations", pipeline.timeseries.len());
    for obs in &pipeline.timeseries {
        let mut row = sheet.blank_row();
        row[COL_STEP] = CellValue::text(STEP_RAW_NDVI);
        row[COL_TRANSFORMATION] = CellValue::text("Satellite → NDVI timeseries");
        row[COL_DATE] = CellValue::text(obs.date.to_string());
        row[COL_SEASON] = CellValue::text(&obs.cycle_name);
        row[COL_NDVI_MEAN] = CellValue::rounded(obs.ndvi_mean, 3);
        row[COL_NDVI_STD] = CellValue::rounded(obs.ndvi_std, 3);
        row[COL_IMAGES] = CellValue::Number(f64::from(obs.image_count));
        row[COL_OUTPUT] = CellValue::text(&output);
        sheet.push_row(row);
    }

    // Step 2: weather
    info!("[2/7] Extracting {} weather records", pipeline.weather.len());
    let output = format!("{} observations", pipeline.weather.len());
    for obs in &pipeline.weather {
        let mut row = sheet.blank_row();
        row[COL_STEP] = CellValue::text(STEP_WEATHER);
        row[COL_TRANSFORMATION] = CellValue::text("ERA5/CHIRPS → Weather data");
        row[COL_DATE] = CellValue::text(obs.date.to_string());
        row[COL_SEASON] = CellValue::text(&obs.cycle_name);
        row[COL_TEMP] = CellValue::rounded(obs.temperature, 1);
        row[COL_RAIN] = CellValue::rounded(obs.precipitation, 1);
        row[COL_OUTPUT] = CellValue::text(&output);
        sheet.push_row(row);
    }

    // Step 3: combined
    info!(
        "[3/7] Merging to {} combined records",
        pipeline.combined.len()
    );
    let output = format!("{} combined", pipeline.combined.len());
    for obs in &pipeline.combined {
        let mut row = sheet.blank_row();
        row[COL_STEP] = CellValue::text(STEP_COMBINED);
        row[COL_TRANSFORMATION] = CellValue::text("NDVI + Weather merge");
        row[COL_DATE] = CellValue::text(obs.date.to_string());
        row[COL_SEASON] = CellValue::text(&obs.cycle_name);
        row[COL_NDVI_MEAN] = CellValue::rounded(obs.ndvi_mean, 3);
        row[COL_TEMP] = CellValue::rounded(obs.temperature, 1);
        row[COL_RAIN] = CellValue::rounded(obs.precipitation, 1);
        row[COL_OUTPUT] = CellValue::text(&output);
        sheet.push_row(row);
    }

    // Step 4: season features
    let features_per_season = pipeline
        .season_features
        .iter()
        .map(|r| r.feature_count())
        .max()
        .unwrap_or(0);
    info!(
        "[4/7] Generating {} season-level feature rows ({} features each)",
        pipeline.season_features.len(),
        features_per_season
    );
    let transformation = format!("Seasonal aggregation ({} features)", features_per_season);
    let output = format!(
        "{} features total",
        pipeline.season_features.len() * features_per_season
    );
    for season in &pipeline.season_features {
        let sample = season
            .sample_features(SAMPLE_FEATURES)
            .iter()
            .map(|(name, value)| format!("{}={:.2}", name, value))
            .collect::<Vec<_>>()
            .join(", ");

        let mut row = sheet.blank_row();
        row[COL_STEP] = CellValue::text(STEP_SEASON_FEATURES);
        row[COL_TRANSFORMATION] = CellValue::text(&transformation);
        row[COL_SEASON] = CellValue::text(&season.cycle_name);
        row[COL_FEATURE_SAMPLE] = CellValue::Text(sample);
        row[COL_OUTPUT] = CellValue::text(&output);
        sheet.push_row(row);
    }

    // Step 5: feature selection
    let selected = top_features(&pipeline.feature_importance, TOP_FEATURES);
    info!("[5/7] Selecting top {} features", selected.len());
    let output = format!("{} features selected", selected.len());
    for feature in &selected {
        let mut row = sheet.blank_row();
        row[COL_STEP] = CellValue::text(STEP_FEATURE_SELECTION);
        row[COL_TRANSFORMATION] = CellValue::text("RandomForest Feature Importance");
        row[COL_FEATURE_SAMPLE] = CellValue::Text(format!(
            "{} (importance={:.3})",
            feature.feature, feature.importance
        ));
        row[COL_OUTPUT] = CellValue::text(&output);
        sheet.push_row(row);
    }

    // Step 6: cross-validation
    info!("[6/7] Reporting {} cross-validation folds", folds.len());
    let output = cv_output(&cv_summary);
    for fold in &folds {
        let pct = match fold.error_pct() {
            Some(pct) => format!("{:.1}%", pct),
            None => "n/a".to_string(),
        };

        let mut row = sheet.blank_row();
        row[COL_STEP] = CellValue::text(STEP_CROSS_VALIDATION);
        row[COL_TRANSFORMATION] = CellValue::text("Leave-One-Out CV");
        row[COL_SEASON] = CellValue::Text(format!("Season {}", fold.index));
        row[COL_FEATURE_SAMPLE] = CellValue::Text(format!(
            "Actual={:.0}, Pred={:.0}, Error={:.0} ({})",
            fold.actual,
            fold.predicted,
            fold.error(),
            pct
        ));
        row[COL_OUTPUT] = CellValue::text(&output);
        sheet.push_row(row);
    }

    // Step 7: final prediction
    info!("[7/7] Recording final prediction");
    let prediction = &pipeline.final_prediction;
    let mut row = sheet.blank_row();
    row[COL_STEP] = CellValue::text(STEP_FINAL_PREDICTION);
    row[COL_TRANSFORMATION] = CellValue::text("Model → Current Season");
    row[COL_SEASON] = CellValue::text(&prediction.cycle_name);
    row[COL_FEATURE_SAMPLE] =
        CellValue::Text(format!("Yield = {:.1} kg", prediction.predicted_yield));
    row[COL_OUTPUT] = CellValue::Text(format!(
        "Confidence: ±{:.1} kg ({:.0}-{:.0})",
        prediction.std_dev(),
        prediction.confidence_low,
        prediction.confidence_high
    ));
    sheet.push_row(row);

    info!(
        "Sheet 1: {} rows showing complete yield prediction flow",
        sheet.row_count()
    );
    Ok(sheet)
}
