use crate::error::{ReportError, ReportResult};
use crate::excel::{inspect_workbook, yield_row_count, ExportSummary, ReportExporter};
use crate::monitoring::StaticLookups;
use crate::parser;
use crate::types::YieldPipeline;
use colored::Colorize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

fn format_optional(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.*}", precision, v))
}

fn load_lookups(lookups: Option<&Path>, verbose: bool) -> ReportResult<StaticLookups> {
    match lookups {
        Some(path) => {
            if verbose {
                println!("{}", "📖 Reading recorded lookups...".cyan());
            }
            let lookups = StaticLookups::load(path)?;
            if verbose {
                println!("   Found lookups for {} farmers\n", lookups.len());
            }
            Ok(lookups)
        }
        None => {
            println!(
                "{}",
                "⚠️  No lookups file given - soil and status columns will show N/A / Unknown\n"
                    .yellow()
            );
            Ok(StaticLookups::new())
        }
    }
}

/// Cycles present in one table but missing from another
fn cycle_mismatches(pipeline: &YieldPipeline) -> Vec<String> {
    let ndvi: BTreeSet<&str> = pipeline
        .timeseries
        .iter()
        .map(|o| o.cycle_name.as_str())
        .collect();
    let weather: BTreeSet<&str> = pipeline
        .weather
        .iter()
        .map(|o| o.cycle_name.as_str())
        .collect();
    let combined: BTreeSet<&str> = pipeline
        .combined
        .iter()
        .map(|o| o.cycle_name.as_str())
        .collect();

    let mut warnings = Vec::new();
    for cycle in ndvi.difference(&weather) {
        warnings.push(format!("cycle '{}' has NDVI but no weather records", cycle));
    }
    for cycle in weather.difference(&ndvi) {
        warnings.push(format!("cycle '{}' has weather but no NDVI records", cycle));
    }
    for cycle in combined.difference(&ndvi) {
        warnings.push(format!("combined cycle '{}' has no NDVI records", cycle));
    }
    warnings
}

fn print_summary(summary: &ExportSummary) {
    println!("{}", "✅ Export Complete!".bold().green());
    println!("   Excel file: {}\n", summary.output.display());

    println!("{}", "📊 Sheet 1: Yield Prediction".bold());
    println!(
        "   {} raw NDVI → {} weather → {} combined",
        summary.timeseries, summary.weather, summary.combined
    );
    println!(
        "   {} seasons → {} features selected",
        summary.seasons, summary.features_selected
    );
    println!(
        "   CV: MAE={} kg, R²={}",
        format_optional(summary.cv.mae, 1),
        format_optional(summary.cv.r2, 3)
    );
    println!(
        "   Final: {:.1} ± {:.1} kg",
        summary.predicted_yield, summary.prediction_std
    );
    println!("   {} rows\n", summary.yield_rows);

    println!("{}", "📊 Sheet 2: Farmer Monitoring".bold());
    println!(
        "   {} farmers: {} crops, {} acres total",
        summary.farmers, summary.crops, summary.acres
    );
    println!("   {} rows\n", summary.monitoring_rows);
}

/// Execute the export command
pub fn export(
    input: PathBuf,
    lookups: Option<PathBuf>,
    output: PathBuf,
    verbose: bool,
) -> ReportResult<()> {
    println!("{}", "🌱 Farmflow - Excel Export".bold().green());
    println!("   Input:  {}", input.display());
    println!("   Output: {}\n", output.display());

    if verbose {
        println!("{}", "📖 Parsing input bundle...".cyan());
    }
    let report = parser::parse_report_input(&input)?;
    if verbose {
        println!(
            "   Found {} NDVI rows, {} seasons, {} farmers\n",
            report.pipeline.timeseries.len(),
            report.pipeline.season_features.len(),
            report.portfolio.farmer_count()
        );
    }

    let lookups = load_lookups(lookups.as_deref(), verbose)?;

    if verbose {
        println!("{}", "📊 Exporting to Excel...".cyan());
    }
    let exporter = ReportExporter::new(&lookups, &lookups);
    let summary = exporter.export(&report, &output)?;

    print_summary(&summary);
    Ok(())
}

/// Execute the validate command
pub fn validate(files: Vec<PathBuf>) -> ReportResult<()> {
    let mut failed = 0;

    for file in &files {
        println!("{}", "✅ Validating input bundle".bold().green());
        println!("   File: {}", file.display());

        let result = parser::parse_report_input(file).and_then(|report| {
            let rows = yield_row_count(&report.pipeline)?;
            Ok((report, rows))
        });

        match result {
            Ok((report, rows)) => {
                for warning in cycle_mismatches(&report.pipeline) {
                    println!("   {}", format!("⚠️  {}", warning).yellow());
                }
                println!(
                    "   {} yield rows, {} monitoring rows\n",
                    rows,
                    report.portfolio.crop_count()
                );
            }
            Err(e) => {
                failed += 1;
                println!("   {}\n", format!("❌ {}", e).bold().red());
            }
        }
    }

    if failed > 0 {
        return Err(ReportError::Validation(format!(
            "{} of {} input files failed validation",
            failed,
            files.len()
        )));
    }

    println!("{}", "✅ All input files are valid!".bold().green());
    Ok(())
}

/// Execute the inspect command
pub fn inspect(file: PathBuf, json: bool) -> ReportResult<()> {
    let summary = inspect_workbook(&file)?;

    if json {
        let text = serde_json::to_string_pretty(&summary)
            .map_err(|e| ReportError::Export(format!("Failed to serialize summary: {}", e)))?;
        println!("{}", text);
        return Ok(());
    }

    println!("{}", "🔍 Farmflow - Report Inspection".bold().green());
    println!("   File: {}\n", file.display());

    for sheet in &summary.sheets {
        println!(
            "{} ({} rows)",
            sheet.name.bold(),
            sheet.rows.to_string().cyan()
        );
        println!("   Columns: {}", sheet.headers.join(", "));
        for (group, count) in &sheet.groups {
            println!("   {:<24} {:>5}", group, count);
        }
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CvResult, FinalPrediction, TimeseriesObservation, WeatherObservation};
    use chrono::NaiveDate;

    fn ndvi(cycle: &str) -> TimeseriesObservation {
        TimeseriesObservation {
            date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            cycle_name: cycle.to_string(),
            ndvi_mean: 0.4,
            ndvi_std: 0.1,
            image_count: 1,
        }
    }

    fn weather(cycle: &str) -> WeatherObservation {
        WeatherObservation {
            date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            cycle_name: cycle.to_string(),
            temperature: 22.0,
            precipitation: 1.0,
        }
    }

    #[test]
    fn test_cycle_mismatches() {
        let pipeline = YieldPipeline {
            timeseries: vec![ndvi("LR2023"), ndvi("SR2023")],
            weather: vec![weather("LR2023"), weather("LR2024")],
            combined: vec![],
            season_features: vec![],
            feature_importance: vec![],
            cv_result: CvResult::default(),
            final_prediction: FinalPrediction {
                cycle_name: "LR2024".to_string(),
                predicted_yield: 0.0,
                confidence_low: 0.0,
                confidence_high: 0.0,
            },
        };

        let warnings = cycle_mismatches(&pipeline);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("SR2023"));
        assert!(warnings[1].contains("LR2024"));
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some(0.31999), 3), "0.320");
        assert_eq!(format_optional(None, 1), "n/a");
    }
}
