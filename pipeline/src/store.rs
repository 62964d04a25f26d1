//! Boundary with the external collaborators: the sample source, the record sinks and the
//! model sink.
//!
//! Typed records become loosely typed [`WireRecord`]s only here, every record carrying a
//! unique `_id`.
use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use chrono::NaiveDate;
use serde_json::{json, Map, Value};

use crate::engine::FittedModel;
use crate::error::StoreError;
use crate::labels::ClusterLabel;
use crate::record::{Sample, SampleRow};
use crate::similarity::SimilarityRecord;

/// A flat document of the store
pub type WireRecord = Map<String, Value>;

/// Conversion of a typed record to its stored form
pub trait ToWire {
    fn to_wire(&self) -> WireRecord;
}

fn document(value: Value) -> WireRecord {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl ToWire for SimilarityRecord {
    fn to_wire(&self) -> WireRecord {
        document(json!({
            "_id": self.id(),
            "city": self.city.replace(' ', "_"),
            "ref_city": self.ref_city.replace(' ', "_"),
            "ref_collection": self.collection,
            "ref_quarter": self.quarter.code(),
            "ref_year": self.year.to_string(),
            "perc_sim": self.percent,
        }))
    }
}

impl ToWire for ClusterLabel {
    fn to_wire(&self) -> WireRecord {
        let date = self.date.format("%Y-%m-%d").to_string();
        document(json!({
            "_id": format!("{}_{}_{}", self.city, self.collection, date),
            "city": self.city,
            "collection": self.collection,
            "date": date,
            "cluster": self.label.code(),
        }))
    }
}

/// Destination of batches of records. A batch is inserted whole or reported as failed.
pub trait RecordSink {
    fn insert_many(&mut self, records: Vec<WireRecord>) -> Result<(), StoreError>;
}

/// Keeps the inserted batches in memory
#[derive(Clone, Debug, Default)]
pub struct InMemorySink {
    batches: Vec<Vec<WireRecord>>,
    attempts: usize,
    failing: HashSet<usize>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects the insertions whose zero based position is listed
    pub fn failing_on(attempts: impl IntoIterator<Item = usize>) -> Self {
        Self {
            failing: attempts.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Accepted batches, in insertion order
    pub fn batches(&self) -> &[Vec<WireRecord>] {
        &self.batches
    }

    pub fn records(&self) -> impl Iterator<Item = &WireRecord> {
        self.batches.iter().flatten()
    }
}

impl RecordSink for InMemorySink {
    fn insert_many(&mut self, records: Vec<WireRecord>) -> Result<(), StoreError> {
        let attempt = self.attempts;
        self.attempts += 1;
        if self.failing.contains(&attempt) {
            return Err(StoreError::Unavailable(format!(
                "insertion {} rejected",
                attempt
            )));
        }
        self.batches.push(records);
        Ok(())
    }
}

/// Appends every record as one JSON document per line
#[derive(Clone, Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSink for JsonLinesSink {
    fn insert_many(&mut self, records: Vec<WireRecord>) -> Result<(), StoreError> {
        let mut buffer = Vec::new();
        for record in &records {
            serde_json::to_writer(&mut buffer, record)?;
            buffer.push(b'\n');
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&buffer)?;
        Ok(())
    }
}

/// Source of the samples of a collection, already reduced to one row per day and location
pub trait SampleSource {
    /// Rows of `collection` dated between `start` and `end`, both inclusive
    fn fetch(
        &self,
        collection: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SampleRow>, StoreError>;
}

/// Serves rows kept in memory. Unknown collections hold no row.
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
    rows: HashMap<String, Vec<SampleRow>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, collection: impl Into<String>, rows: Vec<SampleRow>) -> Self {
        self.rows.entry(collection.into()).or_default().extend(rows);
        self
    }

    /// Adds raw samples, reduced the way the store does it
    pub fn with_samples(self, collection: impl Into<String>, samples: &[Sample]) -> Self {
        self.with_rows(collection, SampleRow::from_samples(samples))
    }
}

impl SampleSource for InMemorySource {
    fn fetch(
        &self,
        collection: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SampleRow>, StoreError> {
        Ok(self
            .rows
            .get(collection)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.date >= start && row.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Destination of the fitted models
pub trait ModelSink {
    fn save(&self, collection: &str, date: NaiveDate, model: &FittedModel) -> io::Result<()>;
}

/// Writes every model as `<strategy>_<collection>_<date>.json` in a directory
#[derive(Clone, Debug)]
pub struct JsonModelSink {
    directory: PathBuf,
}

impl JsonModelSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn path(&self, collection: &str, date: NaiveDate, model: &FittedModel) -> PathBuf {
        self.directory.join(format!(
            "{}_{}_{}.json",
            model.strategy(),
            collection,
            date.format("%Y-%m-%d")
        ))
    }
}

impl ModelSink for JsonModelSink {
    fn save(&self, collection: &str, date: NaiveDate, model: &FittedModel) -> io::Result<()> {
        fs::create_dir_all(&self.directory)?;
        let file = fs::File::create(self.path(collection, date, model))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, model)?;
        writer.flush()
    }
}

/// Discards every model
#[derive(Clone, Copy, Debug, Default)]
pub struct NullModelSink;

impl ModelSink for NullModelSink {
    fn save(&self, _collection: &str, _date: NaiveDate, _model: &FittedModel) -> io::Result<()> {
        Ok(())
    }
}
