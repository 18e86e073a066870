//! YAML input bundle parser
//!
//! One document carries every pipeline artifact and the farmer portfolio.
//! Simple tables are deserialized directly; season features and the
//! portfolio are walked by hand so that column and farmer order survive.

use crate::error::{ReportError, ReportResult};
use crate::types::{
    CombinedObservation, CvResult, Farm, Farmer, FarmerPortfolio, FeatureImportance,
    FinalPrediction, ReportInput, SeasonFeatureRow, TimeseriesObservation, WeatherObservation,
    YieldPipeline,
};
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// Parse an input bundle from a YAML file
pub fn parse_report_input(path: &Path) -> ReportResult<ReportInput> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ReportError::Parse(format!(
            "Failed to read input file '{}': {}",
            path.display(),
            e
        ))
    })?;
    parse_report_str(&content)
}

/// Parse an input bundle from YAML text
pub fn parse_report_str(content: &str) -> ReportResult<ReportInput> {
    let yaml: Value = serde_yaml::from_str(content)?;
    let root = yaml
        .as_mapping()
        .ok_or_else(|| ReportError::Parse("Input must be a YAML mapping".to_string()))?;

    let pipeline = YieldPipeline {
        timeseries: typed_field::<Vec<TimeseriesObservation>>(root, "timeseries")?,
        weather: typed_field::<Vec<WeatherObservation>>(root, "weather")?,
        combined: typed_field::<Vec<CombinedObservation>>(root, "combined")?,
        season_features: parse_season_features(required(root, "season_features")?)?,
        feature_importance: typed_field::<Vec<FeatureImportance>>(root, "feature_importance")?,
        cv_result: typed_field::<CvResult>(root, "cv_result")?,
        final_prediction: typed_field::<FinalPrediction>(root, "final_prediction")?,
    };

    let portfolio = parse_portfolio(required(root, "farmers")?)?;

    Ok(ReportInput {
        pipeline,
        portfolio,
    })
}

fn required<'a>(root: &'a Mapping, key: &str) -> ReportResult<&'a Value> {
    root.get(key)
        .ok_or_else(|| ReportError::Parse(format!("Missing required section '{}'", key)))
}

fn typed_field<T: DeserializeOwned>(root: &Mapping, key: &str) -> ReportResult<T> {
    let value = required(root, key)?;
    serde_yaml::from_value(value.clone())
        .map_err(|e| ReportError::Parse(format!("Invalid '{}' section: {}", key, e)))
}

/// Each entry is a mapping with `cycle_name` plus feature columns in order.
/// `~` and `.nan` mark missing values.
fn parse_season_features(value: &Value) -> ReportResult<Vec<SeasonFeatureRow>> {
    let seq = value
        .as_sequence()
        .ok_or_else(|| ReportError::Parse("'season_features' must be a sequence".to_string()))?;

    let mut rows = Vec::with_capacity(seq.len());
    for (idx, entry) in seq.iter().enumerate() {
        let map = entry.as_mapping().ok_or_else(|| {
            ReportError::Parse(format!("season_features[{}] must be a mapping", idx))
        })?;

        let cycle_name = map
            .get("cycle_name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ReportError::Parse(format!("season_features[{}] is missing 'cycle_name'", idx))
            })?;

        let mut row = SeasonFeatureRow::new(cycle_name);
        for (key, val) in map {
            let name = key.as_str().ok_or_else(|| {
                ReportError::Parse(format!("season_features[{}] has a non-string key", idx))
            })?;
            if name == "cycle_name" {
                continue;
            }

            let number = match val {
                Value::Null => None,
                Value::Number(n) => n.as_f64(),
                other => {
                    return Err(ReportError::Parse(format!(
                        "season_features[{}].{} must be a number, got {:?}",
                        idx, name, other
                    )))
                }
            };
            row.push_feature(name, number);
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Accepts a sequence of `{name, farms}` or a mapping of name → farms
fn parse_portfolio(value: &Value) -> ReportResult<FarmerPortfolio> {
    match value {
        Value::Sequence(_) => {
            let farmers: Vec<Farmer> = serde_yaml::from_value(value.clone())
                .map_err(|e| ReportError::Parse(format!("Invalid 'farmers' section: {}", e)))?;
            Ok(farmers.into_iter().collect())
        }
        Value::Mapping(map) => {
            let mut portfolio = FarmerPortfolio::new();
            for (key, farms) in map {
                let name = key.as_str().ok_or_else(|| {
                    ReportError::Parse("Farmer names must be strings".to_string())
                })?;
                let farms: Vec<Farm> = serde_yaml::from_value(farms.clone()).map_err(|e| {
                    ReportError::Parse(format!("Invalid farms for farmer '{}': {}", name, e))
                })?;

                portfolio.add_farmer(name);
                for farm in farms {
                    portfolio.add_farm(name, farm);
                }
            }
            Ok(portfolio)
        }
        Value::Null => Ok(FarmerPortfolio::new()),
        _ => Err(ReportError::Parse(
            "'farmers' must be a sequence or a mapping".to_string(),
        )),
    }
}
