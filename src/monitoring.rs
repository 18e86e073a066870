//! Farmer monitoring lookups
//!
//! Soil and status data come from external geospatial/analytics services.
//! The exporter only sees them through [`SoilLookup`] and [`StatusLookup`],
//! so the CLI can plug in recorded results ([`StaticLookups`]) and tests can
//! plug in fakes. Every call is made once per farmer and its failure is
//! isolated to that farmer.

use crate::error::{ReportError, ReportResult};
use crate::types::{
    AnomalyStatus, Farmer, MoistureStatus, MonitoringStatus, SoilGridReading, SoilSample,
};
use anyhow::anyhow;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// A WGS84 location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Centroid of a ring of `[lat, lon]` pairs.
    ///
    /// Uses the area-weighted polygon centroid; degenerate rings (fewer than
    /// three vertices or zero area) fall back to the vertex mean.
    pub fn centroid(ring: &[[f64; 2]]) -> Option<GeoPoint> {
        if ring.is_empty() {
            return None;
        }

        // drop the closing vertex of an explicitly closed ring
        let ring = match (ring.first(), ring.last()) {
            (Some(first), Some(last)) if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
            _ => ring,
        };

        let n = ring.len() as f64;
        let mean = GeoPoint {
            lat: ring.iter().map(|p| p[0]).sum::<f64>() / n,
            lon: ring.iter().map(|p| p[1]).sum::<f64>() / n,
        };
        if ring.len() < 3 {
            return Some(mean);
        }

        let mut area2 = 0.0;
        let mut lat_acc = 0.0;
        let mut lon_acc = 0.0;
        for (i, p) in ring.iter().enumerate() {
            let q = ring[(i + 1) % ring.len()];
            let cross = p[0] * q[1] - q[0] * p[1];
            area2 += cross;
            lat_acc += (p[0] + q[0]) * cross;
            lon_acc += (p[1] + q[1]) * cross;
        }

        if area2.abs() < f64::EPSILON {
            return Some(mean);
        }

        Some(GeoPoint {
            lat: lat_acc / (3.0 * area2),
            lon: lon_acc / (3.0 * area2),
        })
    }
}

/// Soil property service (e.g. SoilGrids)
pub trait SoilLookup {
    /// `Ok(None)` means the service has no data for the location
    fn soil_sample(
        &self,
        farmer: &str,
        location: Option<GeoPoint>,
    ) -> anyhow::Result<Option<SoilSample>>;
}

impl<F> SoilLookup for F
where
    F: Fn(&str, Option<GeoPoint>) -> anyhow::Result<Option<SoilSample>>,
{
    fn soil_sample(
        &self,
        farmer: &str,
        location: Option<GeoPoint>,
    ) -> anyhow::Result<Option<SoilSample>> {
        self(farmer, location)
    }
}

/// Moisture-trend and pest-anomaly detectors. Both return free-form reports
/// that are classified by [`MoistureStatus::classify`] and
/// [`AnomalyStatus::classify`].
pub trait StatusLookup {
    fn moisture_trend(&self, farmer: &str) -> anyhow::Result<String>;

    fn pest_anomaly(&self, farmer: &str) -> anyhow::Result<String>;
}

/// Outcome of the lookups for one farmer, shared by all of their crop rows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FarmerConditions {
    /// `None` when the soil lookup failed or had no data
    pub soil: Option<SoilSample>,
    pub status: MonitoringStatus,
}

/// Run every lookup exactly once for `farmer`, downgrading failures to sentinels
pub fn lookup_conditions(
    farmer: &Farmer,
    soil: &dyn SoilLookup,
    status: &dyn StatusLookup,
) -> FarmerConditions {
    let location = farmer
        .farms
        .first()
        .and_then(|farm| GeoPoint::centroid(&farm.coords));

    let soil = match soil.soil_sample(&farmer.name, location) {
        Ok(Some(sample)) => {
            info!(
                farmer = %farmer.name,
                ph = sample.ph,
                nitrogen = sample.nitrogen,
                soc = sample.soc,
                "soil sample"
            );
            Some(sample)
        }
        Ok(None) => {
            warn!(farmer = %farmer.name, "soil data unavailable for location");
            None
        }
        Err(e) => {
            warn!(farmer = %farmer.name, error = %e, "soil lookup failed");
            None
        }
    };

    let moisture = match status.moisture_trend(&farmer.name) {
        Ok(report) => MoistureStatus::classify(&report),
        Err(e) => {
            warn!(farmer = %farmer.name, error = %e, "moisture lookup failed");
            MoistureStatus::Unknown
        }
    };

    let anomaly = match status.pest_anomaly(&farmer.name) {
        Ok(report) => AnomalyStatus::classify(&report),
        Err(e) => {
            warn!(farmer = %farmer.name, error = %e, "anomaly lookup failed");
            AnomalyStatus::Unknown
        }
    };

    FarmerConditions {
        soil,
        status: MonitoringStatus { moisture, anomaly },
    }
}

//==============================================================================
// Recorded lookups
//==============================================================================

/// Recorded service results for one farmer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordedConditions {
    /// Soil properties already in report units
    #[serde(default)]
    pub soil: Option<SoilSample>,
    /// Raw SoilGrids means, used when `soil` is absent
    #[serde(default)]
    pub soilgrids: Option<SoilGridReading>,
    #[serde(default)]
    pub moisture: Option<String>,
    #[serde(default)]
    pub anomaly: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupsFile {
    #[serde(default)]
    lookups: HashMap<String, RecordedConditions>,
}

/// File-backed implementation of both lookup traits
#[derive(Debug, Clone, Default)]
pub struct StaticLookups {
    farmers: HashMap<String, RecordedConditions>,
}

impl StaticLookups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, farmer: impl Into<String>, conditions: RecordedConditions) {
        self.farmers.insert(farmer.into(), conditions);
    }

    pub fn from_yaml_str(content: &str) -> ReportResult<Self> {
        let file: LookupsFile = serde_yaml::from_str(content)?;
        Ok(Self {
            farmers: file.lookups,
        })
    }

    /// Load recorded lookups from a YAML file with a top-level `lookups:` map
    pub fn load(path: &Path) -> ReportResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReportError::Parse(format!(
                "Failed to read lookups file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn len(&self) -> usize {
        self.farmers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.farmers.is_empty()
    }

    fn recorded(&self, farmer: &str) -> anyhow::Result<&RecordedConditions> {
        self.farmers
            .get(farmer)
            .ok_or_else(|| anyhow!("no recorded lookups for farmer '{}'", farmer))
    }
}

impl SoilLookup for StaticLookups {
    fn soil_sample(
        &self,
        farmer: &str,
        _location: Option<GeoPoint>,
    ) -> anyhow::Result<Option<SoilSample>> {
        let recorded = self.recorded(farmer)?;
        Ok(recorded
            .soil
            .or_else(|| recorded.soilgrids.and_then(|r| r.to_sample())))
    }
}

impl StatusLookup for StaticLookups {
    fn moisture_trend(&self, farmer: &str) -> anyhow::Result<String> {
        self.recorded(farmer)?
            .moisture
            .clone()
            .ok_or_else(|| anyhow!("no moisture trend recorded for '{}'", farmer))
    }

    fn pest_anomaly(&self, farmer: &str) -> anyhow::Result<String> {
        self.recorded(farmer)?
            .anomaly
            .clone()
            .ok_or_else(|| anyhow!("no anomaly report recorded for '{}'", farmer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Farm;
    use std::cell::Cell;

    fn farmer(name: &str, rings: Vec<Vec<[f64; 2]>>) -> Farmer {
        Farmer {
            name: name.to_string(),
            farms: rings
                .into_iter()
                .map(|coords| Farm {
                    crop: "Maize".to_string(),
                    size: 1.0,
                    coords,
                })
                .collect(),
        }
    }

    struct FailingStatus;

    impl StatusLookup for FailingStatus {
        fn moisture_trend(&self, _farmer: &str) -> anyhow::Result<String> {
            Err(anyhow!("timeout"))
        }

        fn pest_anomaly(&self, _farmer: &str) -> anyhow::Result<String> {
            Ok("WARNING: leaf spot".to_string())
        }
    }

    #[test]
    fn test_centroid_of_square() {
        let ring = [[0.0, 0.0], [0.0, 2.0], [2.0, 2.0], [2.0, 0.0]];
        let c = GeoPoint::centroid(&ring).unwrap();
        assert!((c.lat - 1.0).abs() < 1e-12);
        assert!((c.lon - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_centroid_closed_ring_matches_open() {
        let open = [[0.0, 0.0], [0.0, 4.0], [3.0, 0.0]];
        let closed = [[0.0, 0.0], [0.0, 4.0], [3.0, 0.0], [0.0, 0.0]];
        let a = GeoPoint::centroid(&open).unwrap();
        let b = GeoPoint::centroid(&closed).unwrap();
        assert!((a.lat - 1.0).abs() < 1e-12);
        assert!((a.lon - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(a, b);
    }

    #[test]
    fn test_centroid_degenerate_rings() {
        assert_eq!(GeoPoint::centroid(&[]), None);
        assert_eq!(
            GeoPoint::centroid(&[[1.0, 2.0]]),
            Some(GeoPoint { lat: 1.0, lon: 2.0 })
        );
        // collinear points have no area
        let line = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]];
        assert_eq!(
            GeoPoint::centroid(&line),
            Some(GeoPoint { lat: 1.0, lon: 1.0 })
        );
    }

    #[test]
    fn test_lookup_conditions_queries_once_with_first_farm_centroid() {
        let calls = Cell::new(0);
        let seen = Cell::new(None);
        let soil = |_: &str, location: Option<GeoPoint>| -> anyhow::Result<Option<SoilSample>> {
            calls.set(calls.get() + 1);
            seen.set(location);
            Ok(Some(SoilSample {
                ph: 6.1,
                nitrogen: 1.2,
                soc: 14.0,
            }))
        };
        let mut status = StaticLookups::new();
        status.insert(
            "Amani",
            RecordedConditions {
                moisture: Some("ALERT: dry spell".to_string()),
                anomaly: Some("normal".to_string()),
                ..Default::default()
            },
        );

        let f = farmer(
            "Amani",
            vec![
                vec![[0.0, 0.0], [0.0, 2.0], [2.0, 2.0], [2.0, 0.0]],
                vec![[9.0, 9.0]],
            ],
        );
        let conditions = lookup_conditions(&f, &soil, &status);

        assert_eq!(calls.get(), 1);
        assert_eq!(seen.get(), GeoPoint::centroid(&f.farms[0].coords));
        assert_eq!(conditions.soil.map(|s| s.ph), Some(6.1));
        assert_eq!(conditions.status.moisture, MoistureStatus::Alert);
        assert_eq!(conditions.status.anomaly, AnomalyStatus::Healthy);
    }

    #[test]
    fn test_lookup_conditions_isolates_each_failure() {
        let soil = |_: &str, _: Option<GeoPoint>| -> anyhow::Result<Option<SoilSample>> {
            Err(anyhow!("earth engine quota exceeded"))
        };
        let conditions = lookup_conditions(&farmer("Baraka", vec![]), &soil, &FailingStatus);

        assert_eq!(conditions.soil, None);
        assert_eq!(conditions.status.moisture, MoistureStatus::Unknown);
        assert_eq!(conditions.status.anomaly, AnomalyStatus::Warning);
    }

    #[test]
    fn test_lookup_conditions_farmer_without_farms_still_queries() {
        let calls = Cell::new(0);
        let soil = |_: &str, location: Option<GeoPoint>| -> anyhow::Result<Option<SoilSample>> {
            calls.set(calls.get() + 1);
            assert!(location.is_none());
            Ok(None)
        };
        let conditions =
            lookup_conditions(&farmer("Neema", vec![]), &soil, &StaticLookups::new());

        assert_eq!(calls.get(), 1);
        assert_eq!(conditions.soil, None);
        assert_eq!(conditions.status, MonitoringStatus::unknown());
    }

    #[test]
    fn test_static_lookups_from_yaml() {
        let yaml = r#"
lookups:
  Amani:
    soil: { ph: 6.4, nitrogen: 1.8, soc: 15.2 }
    moisture: "Adequate moisture"
    anomaly: "⚠️ WARNING: NDVI anomaly"
  Baraka:
    soilgrids: { phh2o: 58, nitrogen: 120, soc: 95 }
"#;
        let lookups = StaticLookups::from_yaml_str(yaml).unwrap();
        assert_eq!(lookups.len(), 2);

        let amani = lookups.soil_sample("Amani", None).unwrap().unwrap();
        assert_eq!(amani.nitrogen, 1.8);
        assert_eq!(
            AnomalyStatus::classify(&lookups.pest_anomaly("Amani").unwrap()),
            AnomalyStatus::Warning
        );

        let baraka = lookups.soil_sample("Baraka", None).unwrap().unwrap();
        assert!((baraka.ph - 5.8).abs() < 1e-12);
        assert!(lookups.moisture_trend("Baraka").is_err());
        assert!(lookups.soil_sample("Unknown", None).is_err());
    }
}
