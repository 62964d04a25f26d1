//! Raw samples and the per city daily records they are reduced to
use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use geocluster_geo::RegionMean;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// A single raw measurement of one feature
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub latitude: f64,
    pub longitude: f64,
    pub date: NaiveDate,
    pub feature: String,
    pub value: f64,
}

impl Sample {
    pub fn new(
        latitude: f64,
        longitude: f64,
        date: NaiveDate,
        feature: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            latitude,
            longitude,
            date,
            feature: feature.into(),
            value,
        }
    }
}

/// Every feature measured at one location on one day
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    pub latitude: f64,
    pub longitude: f64,
    pub date: NaiveDate,
    pub values: BTreeMap<String, f64>,
}

impl SampleRow {
    /// Reduces samples to one row per day and location, averaging repeated measurements of a
    /// feature. Rows are sorted by date, locations keep the order they first appear in.
    pub fn from_samples(samples: &[Sample]) -> Vec<SampleRow> {
        let mut index: HashMap<(NaiveDate, u64, u64), usize> = HashMap::new();
        let mut sums: Vec<(NaiveDate, f64, f64, BTreeMap<String, (f64, usize)>)> = Vec::new();
        for sample in samples {
            let key = (
                sample.date,
                sample.latitude.to_bits(),
                sample.longitude.to_bits(),
            );
            let row = *index.entry(key).or_insert_with(|| {
                sums.push((sample.date, sample.latitude, sample.longitude, BTreeMap::new()));
                sums.len() - 1
            });
            let (sum, count) = sums[row]
                .3
                .entry(sample.feature.clone())
                .or_insert((0., 0));
            *sum += sample.value;
            *count += 1;
        }

        let mut rows: Vec<SampleRow> = sums
            .into_iter()
            .map(|(date, latitude, longitude, values)| SampleRow {
                latitude,
                longitude,
                date,
                values: values
                    .into_iter()
                    .map(|(feature, (sum, count))| (feature, sum / count as f64))
                    .collect(),
            })
            .collect();
        rows.sort_by_key(|row| row.date);
        rows
    }
}

/// Averaged features of one city on one day, `None` where no value is known
#[derive(Clone, Debug, PartialEq)]
pub struct CityDayRecord {
    pub city: String,
    pub date: NaiveDate,
    pub values: Vec<Option<f64>>,
}

/// City day records sharing one list of features.
///
/// Holds at most one record per `(city, date)`, sorted by date then city.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CityDayTable {
    features: Vec<String>,
    records: Vec<CityDayRecord>,
}

impl CityDayTable {
    pub fn new(features: Vec<String>, records: Vec<CityDayRecord>) -> Result<Self> {
        let mut keyed = BTreeMap::new();
        for record in records {
            if record.values.len() != features.len() {
                return Err(PipelineError::MalformedTable(format!(
                    "record of {} on {} holds {} values for {} features",
                    record.city,
                    record.date,
                    record.values.len(),
                    features.len()
                )));
            }
            let key = (record.date, record.city.clone());
            if keyed.contains_key(&key) {
                return Err(PipelineError::MalformedTable(format!(
                    "more than one record for {} on {}",
                    record.city, record.date
                )));
            }
            keyed.insert(key, record);
        }
        Ok(Self {
            features,
            records: keyed.into_iter().map(|(_, record)| record).collect(),
        })
    }

    /// Table of the region means of a collection, `features` in the order of the mean values
    pub fn from_means(features: Vec<String>, means: Vec<RegionMean<NaiveDate>>) -> Result<Self> {
        let records = means
            .into_iter()
            .map(|mean| CityDayRecord {
                city: mean.region,
                date: mean.time,
                values: mean.values,
            })
            .collect();
        Self::new(features, records)
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn feature_index(&self, feature: &str) -> Option<usize> {
        self.features.iter().position(|f| f == feature)
    }

    pub fn records(&self) -> &[CityDayRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct dates, ascending
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.records.iter().map(|r| r.date).collect();
        dates.dedup();
        dates
    }

    /// Records of `date`, sorted by city
    pub fn day(&self, date: NaiveDate) -> &[CityDayRecord] {
        let start = self.records.partition_point(|r| r.date < date);
        let end = self.records.partition_point(|r| r.date <= date);
        &self.records[start..end]
    }

    /// Records dated between `start` and `end`, both inclusive
    pub fn restrict(&self, start: NaiveDate, end: NaiveDate) -> CityDayTable {
        CityDayTable {
            features: self.features.clone(),
            records: self
                .records
                .iter()
                .filter(|r| r.date >= start && r.date <= end)
                .cloned()
                .collect(),
        }
    }

    /// Replaces every missing value with the last known value of the same city and feature
    pub fn forward_fill(&mut self) {
        let mut last: HashMap<&str, Vec<Option<f64>>> = HashMap::new();
        let n_features = self.features.len();
        let mut filled = Vec::with_capacity(self.records.len());
        for record in &self.records {
            let known = last
                .entry(record.city.as_str())
                .or_insert_with(|| vec![None; n_features]);
            let values: Vec<Option<f64>> = record
                .values
                .iter()
                .zip(known.iter_mut())
                .map(|(value, known)| {
                    if value.is_some() {
                        *known = *value;
                    }
                    *known
                })
                .collect();
            filled.push(values);
        }
        for (record, values) in self.records.iter_mut().zip(filled) {
            record.values = values;
        }
    }

    /// Outer join on `(city, date)`: the features of `other` follow those of `self`, a side
    /// missing a record contributes `None` values.
    pub fn merge(self, other: CityDayTable) -> Result<CityDayTable> {
        if let Some(feature) = other
            .features
            .iter()
            .find(|f| self.features.contains(f))
        {
            return Err(PipelineError::InvalidCollections(format!(
                "feature {} belongs to more than one collection",
                feature
            )));
        }
        let (n_left, n_right) = (self.features.len(), other.features.len());
        let mut merged: BTreeMap<(NaiveDate, String), (Option<Vec<Option<f64>>>, Option<Vec<Option<f64>>>)> =
            BTreeMap::new();
        for record in self.records {
            merged.entry((record.date, record.city)).or_default().0 = Some(record.values);
        }
        for record in other.records {
            merged.entry((record.date, record.city)).or_default().1 = Some(record.values);
        }

        let mut features = self.features;
        features.extend(other.features);
        let records = merged
            .into_iter()
            .map(|((date, city), (left, right))| {
                let mut values = left.unwrap_or_else(|| vec![None; n_left]);
                values.extend(right.unwrap_or_else(|| vec![None; n_right]));
                CityDayRecord { city, date, values }
            })
            .collect();
        Ok(CityDayTable { features, records })
    }
}
