//! Collections of the sample store and the feature subsets clustered together
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// A collection of the sample store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    /// Fill missing values from the previous day of the same city
    #[serde(default)]
    pub forward_fill: bool,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>, forward_fill: bool) -> Self {
        Self {
            name: name.into(),
            forward_fill,
        }
    }
}

/// A named, ordered set of features clustered together
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureSubset {
    name: String,
    features: Vec<String>,
}

impl FeatureSubset {
    pub fn new(name: impl Into<String>, features: Vec<String>) -> Self {
        Self {
            name: name.into(),
            features,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }
}

/// The subsets of one period: one per base collection and, with two bases or more, their
/// union.
///
/// The union is named by joining the base names with `_` in the order given, its features are
/// the base features concatenated in that order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureSubsets {
    subsets: Vec<FeatureSubset>,
    n_bases: usize,
}

impl FeatureSubsets {
    pub fn combine(bases: Vec<FeatureSubset>) -> Result<Self> {
        if bases.is_empty() {
            return Err(PipelineError::InvalidCollections(
                "no collection to cluster".to_string(),
            ));
        }
        let mut names = HashSet::new();
        let mut features = HashSet::new();
        for base in &bases {
            if !names.insert(base.name.as_str()) {
                return Err(PipelineError::InvalidCollections(format!(
                    "collection {} is given more than once",
                    base.name
                )));
            }
            if let Some(feature) = base.features.iter().find(|f| !features.insert(f.as_str())) {
                return Err(PipelineError::InvalidCollections(format!(
                    "feature {} belongs to more than one collection",
                    feature
                )));
            }
        }

        let n_bases = bases.len();
        let mut subsets = bases;
        if n_bases > 1 {
            let name = subsets
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join("_");
            let features = subsets
                .iter()
                .flat_map(|s| s.features.iter().cloned())
                .collect();
            subsets.push(FeatureSubset::new(name, features));
        }
        Ok(Self { subsets, n_bases })
    }

    /// Every subset, bases first then the union
    pub fn iter(&self) -> impl Iterator<Item = &FeatureSubset> {
        self.subsets.iter()
    }

    pub fn bases(&self) -> &[FeatureSubset] {
        &self.subsets[..self.n_bases]
    }

    /// Subset holding every feature: the union, or the only base
    pub fn union(&self) -> &FeatureSubset {
        &self.subsets[self.subsets.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.subsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subset(name: &str, features: &[&str]) -> FeatureSubset {
        FeatureSubset::new(name, features.iter().map(|f| f.to_string()).collect())
    }

    #[test]
    fn two_bases_and_their_union() {
        let subsets = FeatureSubsets::combine(vec![
            subset("atmosphere_data", &["Dust", "Ozone"]),
            subset("climate_data", &["2m temperature"]),
        ])
        .unwrap();
        let names: Vec<&str> = subsets.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["atmosphere_data", "climate_data", "atmosphere_data_climate_data"]
        );
        assert_eq!(
            subsets.union().features(),
            &["Dust", "Ozone", "2m temperature"]
        );
        assert_eq!(subsets.bases().len(), 2);
    }

    #[test]
    fn union_of_three() {
        let subsets = FeatureSubsets::combine(vec![
            subset("a", &["x"]),
            subset("b", &["y"]),
            subset("c", &["z"]),
        ])
        .unwrap();
        assert_eq!(subsets.len(), 4);
        assert_eq!(subsets.union().name(), "a_b_c");
        assert_eq!(subsets.union().features(), &["x", "y", "z"]);
    }

    #[test]
    fn single_base_has_no_union() {
        let subsets = FeatureSubsets::combine(vec![subset("a", &["x", "y"])]).unwrap();
        assert_eq!(subsets.len(), 1);
        assert_eq!(subsets.union().name(), "a");
    }

    #[test]
    fn invalid_sets() {
        assert!(matches!(
            FeatureSubsets::combine(vec![]),
            Err(PipelineError::InvalidCollections(_))
        ));
        assert!(matches!(
            FeatureSubsets::combine(vec![subset("a", &["x"]), subset("a", &["y"])]),
            Err(PipelineError::InvalidCollections(_))
        ));
        assert!(matches!(
            FeatureSubsets::combine(vec![subset("a", &["x"]), subset("b", &["x"])]),
            Err(PipelineError::InvalidCollections(_))
        ));
    }
}
