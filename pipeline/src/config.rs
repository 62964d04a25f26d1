//! Configuration of a pipeline run, read from JSON
use std::fs;
use std::path::{Path, PathBuf};

use geocluster_clustering::DbscanGridSearchParams;
use geocluster_geo::{AggregationParams, RegionLayer};
use serde::{Deserialize, Serialize};

use crate::collection::CollectionSpec;
use crate::engine::CentroidEngine;
use crate::error::{PipelineError, Result};

/// Settings of the quarterly DBSCAN hyperparameter search
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSearchConfig {
    /// Inclusive range of `min_samples`
    pub min_samples: (usize, usize),
    /// Largest share of a day's points allowed to be noise
    pub max_noise_percent: f64,
    pub total_points_per_day: usize,
    pub fallback_eps: f64,
    pub fallback_min_samples: usize,
}

impl Default for GridSearchConfig {
    fn default() -> Self {
        Self {
            min_samples: (2, 5),
            max_noise_percent: 0.33,
            total_points_per_day: 257,
            fallback_eps: 1.4,
            fallback_min_samples: 2,
        }
    }
}

impl GridSearchConfig {
    pub fn params(&self) -> DbscanGridSearchParams<f64> {
        DbscanGridSearchParams::new()
            .min_samples_range(self.min_samples.0, self.min_samples.1)
            .max_noise_ratio(self.max_noise_percent)
            .points_per_day(self.total_points_per_day)
            .fallback(self.fallback_eps, self.fallback_min_samples)
    }
}

/// Settings of the daily choice of `k`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KSelectionConfig {
    pub min_clusters: usize,
    pub max_clusters: usize,
    pub n_runs: usize,
    pub seed: u64,
}

impl Default for KSelectionConfig {
    fn default() -> Self {
        Self {
            min_clusters: 2,
            max_clusters: 15,
            n_runs: 10,
            seed: 0,
        }
    }
}

impl KSelectionConfig {
    pub fn engine(&self) -> CentroidEngine {
        CentroidEngine::new()
            .cluster_range(self.min_clusters, self.max_clusters)
            .n_runs(self.n_runs)
            .seed(self.seed)
    }
}

/// Radii, in meters, of the gap filling
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    pub initial_radius: f64,
    pub radius_step: f64,
    pub max_radius: f64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            initial_radius: 2000.,
            radius_step: 1000.,
            max_radius: 100_000.,
        }
    }
}

impl GeoConfig {
    pub fn params(&self) -> AggregationParams {
        AggregationParams::new()
            .initial_radius(self.initial_radius)
            .radius_step(self.radius_step)
            .max_radius(self.max_radius)
    }
}

/// Everything a run needs besides its collaborators. Every field has a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub collections: Vec<CollectionSpec>,
    /// Years processed by `run_configured`
    pub years: Vec<i32>,
    /// GeoJSON file of the municipalities
    pub region_layer: Option<PathBuf>,
    /// Property of the GeoJSON features holding the municipality name
    pub name_property: String,
    pub grid_search: GridSearchConfig,
    pub k_selection: KSelectionConfig,
    pub geo: GeoConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            collections: vec![
                CollectionSpec::new("atmosphere_data", false),
                CollectionSpec::new("climate_data", true),
            ],
            years: Vec::new(),
            region_layer: None,
            name_property: "COMUNE".to_string(),
            grid_search: GridSearchConfig::default(),
            k_selection: KSelectionConfig::default(),
            geo: GeoConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        if config.collections.is_empty() {
            return Err(PipelineError::InvalidCollections(
                "no collection to import".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// Reads the municipality layer named by `region_layer`
    pub fn load_layer(&self) -> Result<RegionLayer> {
        let path = self.region_layer.as_ref().ok_or_else(|| {
            PipelineError::InvalidConfig("region_layer is not set".to_string())
        })?;
        Ok(RegionLayer::from_path(path, &self.name_property)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geocluster::ParamGuard;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = PipelineConfig::from_json_str(
            r#"{"years": [2020, 2021], "grid_search": {"total_points_per_day": 100}}"#,
        )
        .unwrap();
        assert_eq!(config.years, vec![2020, 2021]);
        assert_eq!(config.collections.len(), 2);
        assert!(config.collections[1].forward_fill);
        assert_eq!(config.grid_search.total_points_per_day, 100);
        assert_eq!(config.grid_search.min_samples, (2, 5));
        assert_eq!(config.name_property, "COMUNE");

        let grid = config.grid_search.params().check().unwrap();
        assert_eq!(grid.min_samples_grid(), &[2, 3, 4, 5]);
        assert_eq!(grid.fallback(), (1.4, 2));
        assert!(config.geo.params().check().is_ok());
    }

    #[test]
    fn collections_from_json() {
        let config = PipelineConfig::from_json_str(
            r#"{"collections": [{"name": "climate_data_old", "forward_fill": true}, {"name": "atmosphere_data"}]}"#,
        )
        .unwrap();
        assert_eq!(
            config.collections,
            vec![
                CollectionSpec::new("climate_data_old", true),
                CollectionSpec::new("atmosphere_data", false)
            ]
        );
    }

    #[test]
    fn invalid_documents() {
        assert!(matches!(
            PipelineConfig::from_json_str(r#"{"collections": []}"#),
            Err(PipelineError::InvalidCollections(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json_str(r#"{"years": "2021"}"#),
            Err(PipelineError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::default().load_layer(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
}
