use crate::error::{ReportError, ReportResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// z-score of a two-sided 95% normal confidence interval
pub const Z_95: f64 = 1.96;

//==============================================================================
// Yield Prediction Pipeline Artifacts
//==============================================================================

/// One satellite pass aggregated over a farm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesObservation {
    pub date: NaiveDate,
    pub cycle_name: String,
    pub ndvi_mean: f64,
    pub ndvi_std: f64,
    pub image_count: u32,
}

/// One weather record (same cadence as the NDVI timeseries)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub date: NaiveDate,
    pub cycle_name: String,
    pub temperature: f64,
    pub precipitation: f64,
}

/// NDVI joined with weather on (date, cycle)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedObservation {
    pub date: NaiveDate,
    pub cycle_name: String,
    pub ndvi_mean: f64,
    pub temperature: f64,
    pub precipitation: f64,
}

/// A named feature column value; `None` means missing (NaN upstream)
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureValue {
    pub name: String,
    pub value: Option<f64>,
}

/// Engineered features for one growing season, in column order
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonFeatureRow {
    pub cycle_name: String,
    pub features: Vec<FeatureValue>,
}

impl SeasonFeatureRow {
    pub fn new(cycle_name: impl Into<String>) -> Self {
        Self {
            cycle_name: cycle_name.into(),
            features: Vec::new(),
        }
    }

    /// Builder-style feature append. NaN is stored as missing.
    pub fn with_feature(mut self, name: impl Into<String>, value: Option<f64>) -> Self {
        self.push_feature(name, value);
        self
    }

    pub fn push_feature(&mut self, name: impl Into<String>, value: Option<f64>) {
        self.features.push(FeatureValue {
            name: name.into(),
            value: value.filter(|v| !v.is_nan()),
        });
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Up to `limit` non-missing features whose name contains "peak" or "mean"
    pub fn sample_features(&self, limit: usize) -> Vec<(&str, f64)> {
        self.features
            .iter()
            .filter(|f| f.name.contains("peak") || f.name.contains("mean"))
            .filter_map(|f| f.value.map(|v| (f.name.as_str(), v)))
            .take(limit)
            .collect()
    }
}

/// Random-forest importance of a single feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Leave-one-out cross-validation output as parallel sequences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CvResult {
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
}

/// A single held-out season
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CvFold {
    /// 1-based fold number
    pub index: usize,
    pub actual: f64,
    pub predicted: f64,
}

impl CvFold {
    pub fn error(&self) -> f64 {
        (self.actual - self.predicted).abs()
    }

    /// Absolute error as a percentage of the actual yield.
    /// Undefined for a zero actual, reported as `None`.
    pub fn error_pct(&self) -> Option<f64> {
        if self.actual == 0.0 {
            None
        } else {
            Some(self.error() / self.actual * 100.0)
        }
    }
}

/// Aggregate CV metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CvSummary {
    pub folds: usize,
    pub mae: Option<f64>,
    pub r2: Option<f64>,
}

impl CvResult {
    pub fn new(actual: Vec<f64>, predicted: Vec<f64>) -> Self {
        Self { actual, predicted }
    }

    /// Pair up actual and predicted values, rejecting ragged input
    pub fn folds(&self) -> ReportResult<Vec<CvFold>> {
        if self.actual.len() != self.predicted.len() {
            return Err(ReportError::Validation(format!(
                "cv_result has {} actual values but {} predicted values",
                self.actual.len(),
                self.predicted.len()
            )));
        }

        Ok(self
            .actual
            .iter()
            .zip(&self.predicted)
            .enumerate()
            .map(|(i, (&actual, &predicted))| CvFold {
                index: i + 1,
                actual,
                predicted,
            })
            .collect())
    }

    /// Mean absolute error and coefficient of determination over all folds
    pub fn summary(&self) -> ReportResult<CvSummary> {
        let folds = self.folds()?;
        if folds.is_empty() {
            return Ok(CvSummary {
                folds: 0,
                mae: None,
                r2: None,
            });
        }

        let n = folds.len() as f64;
        let mae = folds.iter().map(CvFold::error).sum::<f64>() / n;

        let mean_actual = folds.iter().map(|f| f.actual).sum::<f64>() / n;
        let ss_tot: f64 = folds.iter().map(|f| (f.actual - mean_actual).powi(2)).sum();
        let ss_res: f64 = folds.iter().map(|f| (f.actual - f.predicted).powi(2)).sum();
        let r2 = if ss_tot == 0.0 {
            None
        } else {
            Some(1.0 - ss_res / ss_tot)
        };

        Ok(CvSummary {
            folds: folds.len(),
            mae: Some(mae),
            r2,
        })
    }
}

/// Model output for the current season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalPrediction {
    pub cycle_name: String,
    pub predicted_yield: f64,
    pub confidence_low: f64,
    pub confidence_high: f64,
}

impl FinalPrediction {
    /// Standard deviation implied by a 95% normal confidence interval
    pub fn std_dev(&self) -> f64 {
        (self.confidence_high - self.confidence_low) / (2.0 * Z_95)
    }
}

/// Everything the yield sheet is built from
#[derive(Debug, Clone, PartialEq)]
pub struct YieldPipeline {
    pub timeseries: Vec<TimeseriesObservation>,
    pub weather: Vec<WeatherObservation>,
    pub combined: Vec<CombinedObservation>,
    pub season_features: Vec<SeasonFeatureRow>,
    pub feature_importance: Vec<FeatureImportance>,
    pub cv_result: CvResult,
    pub final_prediction: FinalPrediction,
}

//==============================================================================
// Farmer Monitoring Artifacts
//==============================================================================

/// A single crop plot. `coords` is a ring of `[lat, lon]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Farm {
    pub crop: String,
    pub size: f64,
    #[serde(default)]
    pub coords: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Farmer {
    pub name: String,
    #[serde(default)]
    pub farms: Vec<Farm>,
}

impl Farmer {
    pub fn total_acres(&self) -> f64 {
        self.farms.iter().map(|f| f.size).sum()
    }
}

/// Farmer → farms, iterated in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FarmerPortfolio {
    farmers: Vec<Farmer>,
}

impl FarmerPortfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a farm to `farmer`, registering the farmer on first sight
    pub fn add_farm(&mut self, farmer: &str, farm: Farm) {
        self.farmer_entry(farmer).farms.push(farm);
    }

    /// Register a farmer that may own no farms
    pub fn add_farmer(&mut self, farmer: &str) {
        self.farmer_entry(farmer);
    }

    fn farmer_entry(&mut self, farmer: &str) -> &mut Farmer {
        let idx = match self.farmers.iter().position(|f| f.name == farmer) {
            Some(idx) => idx,
            None => {
                self.farmers.push(Farmer {
                    name: farmer.to_string(),
                    farms: Vec::new(),
                });
                self.farmers.len() - 1
            }
        };
        &mut self.farmers[idx]
    }

    pub fn farmers(&self) -> &[Farmer] {
        &self.farmers
    }

    pub fn farmer_count(&self) -> usize {
        self.farmers.len()
    }

    pub fn crop_count(&self) -> usize {
        self.farmers.iter().map(|f| f.farms.len()).sum()
    }

    pub fn total_acres(&self) -> f64 {
        self.farmers.iter().map(Farmer::total_acres).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.farmers.is_empty()
    }
}

impl FromIterator<Farmer> for FarmerPortfolio {
    /// Farmers with a repeated name are merged into the first occurrence
    fn from_iter<I: IntoIterator<Item = Farmer>>(iter: I) -> Self {
        let mut portfolio = FarmerPortfolio::new();
        for farmer in iter {
            portfolio.add_farmer(&farmer.name);
            for farm in farmer.farms {
                portfolio.add_farm(&farmer.name, farm);
            }
        }
        portfolio
    }
}

/// Soil properties in report units (pH, g/kg, g/kg)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilSample {
    pub ph: f64,
    pub nitrogen: f64,
    pub soc: f64,
}

/// Raw SoilGrids 0-5cm means (pH×10, cg/kg, dg/kg)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SoilGridReading {
    pub phh2o: Option<f64>,
    pub nitrogen: Option<f64>,
    pub soc: Option<f64>,
}

impl SoilGridReading {
    /// Convert to report units; a reading missing any of the three values is unavailable
    pub fn to_sample(&self) -> Option<SoilSample> {
        let ph = self.phh2o?;
        let nitrogen = self.nitrogen?;
        let soc = self.soc?;
        Some(SoilSample {
            ph: ph / 10.0,
            nitrogen: nitrogen / 100.0,
            soc: soc / 10.0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MoistureStatus {
    Adequate,
    Alert,
    Unknown,
}

impl MoistureStatus {
    /// Classify a moisture-trend report
    pub fn classify(report: &str) -> Self {
        if report.contains("ALERT") {
            MoistureStatus::Alert
        } else {
            MoistureStatus::Adequate
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MoistureStatus::Adequate => "Adequate",
            MoistureStatus::Alert => "ALERT",
            MoistureStatus::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnomalyStatus {
    Healthy,
    Warning,
    Unknown,
}

impl AnomalyStatus {
    /// Classify a pest/anomaly report
    pub fn classify(report: &str) -> Self {
        if report.contains("WARNING") || report.contains("ALERT") {
            AnomalyStatus::Warning
        } else {
            AnomalyStatus::Healthy
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AnomalyStatus::Healthy => "Healthy",
            AnomalyStatus::Warning => "WARNING",
            AnomalyStatus::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonitoringStatus {
    pub moisture: MoistureStatus,
    pub anomaly: AnomalyStatus,
}

impl MonitoringStatus {
    pub fn unknown() -> Self {
        Self {
            moisture: MoistureStatus::Unknown,
            anomaly: AnomalyStatus::Unknown,
        }
    }
}

/// Complete input bundle for one export
#[derive(Debug, Clone, PartialEq)]
pub struct ReportInput {
    pub pipeline: YieldPipeline,
    pub portfolio: FarmerPortfolio,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_features_skips_missing_and_limits() {
        let row = SeasonFeatureRow::new("S1")
            .with_feature("ndvi_peak", None)
            .with_feature("temp_total", Some(300.0))
            .with_feature("ndvi_mean", Some(0.5))
            .with_feature("rain_mean", Some(f64::NAN))
            .with_feature("evi_peak", Some(0.7))
            .with_feature("temp_mean", Some(24.0))
            .with_feature("peak_day", Some(61.0));

        let sample = row.sample_features(3);
        assert_eq!(
            sample,
            vec![("ndvi_mean", 0.5), ("evi_peak", 0.7), ("temp_mean", 24.0)]
        );
    }

    #[test]
    fn test_cv_fold_error_pct() {
        let fold = CvFold {
            index: 1,
            actual: 200.0,
            predicted: 170.0,
        };
        assert_eq!(fold.error(), 30.0);
        assert_eq!(fold.error_pct(), Some(15.0));
    }

    #[test]
    fn test_cv_fold_error_pct_zero_actual() {
        let fold = CvFold {
            index: 1,
            actual: 0.0,
            predicted: 12.0,
        };
        assert_eq!(fold.error_pct(), None);
    }

    #[test]
    fn test_cv_folds_ragged_input() {
        let cv = CvResult::new(vec![1.0, 2.0], vec![1.0]);
        assert!(matches!(cv.folds(), Err(ReportError::Validation(_))));
    }

    #[test]
    fn test_cv_summary() {
        let cv = CvResult::new(vec![100.0, 200.0, 300.0], vec![110.0, 190.0, 300.0]);
        let summary = cv.summary().unwrap();
        assert_eq!(summary.folds, 3);
        assert!((summary.mae.unwrap() - 20.0 / 3.0).abs() < 1e-9);
        // ss_res = 200, ss_tot = 20000
        assert!((summary.r2.unwrap() - 0.99).abs() < 1e-9);
    }

    #[test]
    fn test_cv_summary_constant_actuals() {
        let cv = CvResult::new(vec![5.0, 5.0], vec![4.0, 6.0]);
        let summary = cv.summary().unwrap();
        assert_eq!(summary.mae, Some(1.0));
        assert_eq!(summary.r2, None);
    }

    #[test]
    fn test_final_prediction_std_dev() {
        let pred = FinalPrediction {
            cycle_name: "S6".to_string(),
            predicted_yield: 100.0,
            confidence_low: 80.0,
            confidence_high: 120.0,
        };
        assert_eq!(pred.std_dev(), 40.0 / 3.92);
        assert!((pred.std_dev() - 10.2040816).abs() < 1e-6);
    }

    #[test]
    fn test_portfolio_preserves_insertion_order() {
        let farm = |crop: &str| Farm {
            crop: crop.to_string(),
            size: 1.5,
            coords: vec![],
        };
        let mut portfolio = FarmerPortfolio::new();
        portfolio.add_farm("Zawadi", farm("Maize"));
        portfolio.add_farm("Amani", farm("Beans"));
        portfolio.add_farm("Zawadi", farm("Sorghum"));
        portfolio.add_farmer("Baraka");

        let names: Vec<&str> = portfolio.farmers().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Zawadi", "Amani", "Baraka"]);
        assert_eq!(portfolio.crop_count(), 3);
        assert_eq!(portfolio.total_acres(), 4.5);
    }

    #[test]
    fn test_soilgrid_reading_conversion() {
        let reading = SoilGridReading {
            phh2o: Some(65.0),
            nitrogen: Some(150.0),
            soc: Some(120.0),
        };
        assert_eq!(
            reading.to_sample(),
            Some(SoilSample {
                ph: 6.5,
                nitrogen: 1.5,
                soc: 12.0
            })
        );
        assert_eq!(SoilGridReading::default().to_sample(), None);
    }

    #[test]
    fn test_partial_soilgrid_reading_is_unavailable() {
        let no_nitrogen = SoilGridReading {
            phh2o: Some(62.0),
            nitrogen: None,
            soc: Some(183.0),
        };
        assert_eq!(no_nitrogen.to_sample(), None);

        let no_soc = SoilGridReading {
            phh2o: Some(62.0),
            nitrogen: Some(148.0),
            soc: None,
        };
        assert_eq!(no_soc.to_sample(), None);
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            MoistureStatus::classify("⚠️ ALERT: moisture dropping"),
            MoistureStatus::Alert
        );
        assert_eq!(MoistureStatus::classify("stable"), MoistureStatus::Adequate);
        assert_eq!(
            AnomalyStatus::classify("ALERT: NDVI drop"),
            AnomalyStatus::Warning
        );
        assert_eq!(
            AnomalyStatus::classify("WARNING: minor stress"),
            AnomalyStatus::Warning
        );
        assert_eq!(AnomalyStatus::classify("normal"), AnomalyStatus::Healthy);
    }
}
