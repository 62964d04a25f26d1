//! Daily cluster labels of a quarter
use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

/// Cluster of a city on one day. Only the density strategy produces noise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    Cluster(usize),
    Noise,
}

impl Label {
    /// Integer code of the label, noise being `-1`
    pub fn code(self) -> i64 {
        match self {
            Label::Cluster(cluster) => cluster as i64,
            Label::Noise => -1,
        }
    }
}

impl From<Option<usize>> for Label {
    fn from(cluster: Option<usize>) -> Self {
        cluster.map_or(Label::Noise, Label::Cluster)
    }
}

/// Label of one city on one day for one collection
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterLabel {
    pub city: String,
    pub date: NaiveDate,
    pub collection: String,
    pub label: Label,
}

/// Labels of a quarter: one row per `(collection, city)`, one column per date.
///
/// A cell is unset when the city could not be clustered on that day. The dates are those of the
/// quarter's records, whether or not a label was produced on them.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct QuarterLabelTable {
    dates: BTreeSet<NaiveDate>,
    rows: BTreeMap<String, BTreeMap<String, BTreeMap<NaiveDate, Label>>>,
}

impl QuarterLabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_date(&mut self, date: NaiveDate) {
        self.dates.insert(date);
    }

    /// Sets a cell, replacing any previous label
    pub fn insert(&mut self, label: ClusterLabel) {
        self.dates.insert(label.date);
        self.rows
            .entry(label.collection)
            .or_default()
            .entry(label.city)
            .or_default()
            .insert(label.date, label.label);
    }

    pub fn label(&self, collection: &str, city: &str, date: NaiveDate) -> Option<Label> {
        self.rows
            .get(collection)
            .and_then(|cities| cities.get(city))
            .and_then(|labels| labels.get(&date))
            .copied()
    }

    /// Dates of the quarter, ascending
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates.iter().copied()
    }

    pub fn n_dates(&self) -> usize {
        self.dates.len()
    }

    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// Cities holding at least one label in `collection`, by name
    pub fn cities(&self, collection: &str) -> Vec<&str> {
        self.rows
            .get(collection)
            .map(|cities| cities.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Labels of `city` in `collection`, one per date of the quarter
    pub fn row(&self, collection: &str, city: &str) -> Vec<Option<Label>> {
        let labels = self.rows.get(collection).and_then(|cities| cities.get(city));
        self.dates
            .iter()
            .map(|date| labels.and_then(|labels| labels.get(date)).copied())
            .collect()
    }

    /// Every set cell, by collection, city and date
    pub fn labels(&self) -> Vec<ClusterLabel> {
        self.rows
            .iter()
            .flat_map(|(collection, cities)| {
                cities.iter().flat_map(move |(city, labels)| {
                    labels.iter().map(move |(&date, &label)| ClusterLabel {
                        city: city.clone(),
                        date,
                        collection: collection.clone(),
                        label,
                    })
                })
            })
            .collect()
    }
}
