//! Co-clustering frequency between the cities of a quarter
use crate::labels::{Label, QuarterLabelTable};
use crate::quarter::Quarter;

/// Share of the days of a quarter, in percent, that `city` and `ref_city` spent in the same
/// cluster of `collection`
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarityRecord {
    pub city: String,
    pub ref_city: String,
    pub collection: String,
    pub quarter: Quarter,
    pub year: i32,
    pub percent: f64,
}

impl SimilarityRecord {
    /// `city_refcity_collection_quarter_year`, spaces of the city names replaced by `_`
    pub fn id(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}",
            self.city.replace(' ', "_"),
            self.ref_city.replace(' ', "_"),
            self.collection,
            self.quarter,
            self.year
        )
    }
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.).round() / 100.
}

/// Percentage of `n_dates` days on which both series carry the same label, rounded to two
/// decimals. Noise matches noise, an unset day never matches.
pub fn percent_same_cluster(a: &[Option<Label>], b: &[Option<Label>], n_dates: usize) -> f64 {
    if n_dates == 0 {
        return 0.;
    }
    let same = a
        .iter()
        .zip(b.iter())
        .filter(|(a, b)| a.is_some() && a == b)
        .count();
    round_to_cents(same as f64 / n_dates as f64 * 100.)
}

/// Similarity of every ordered pair of distinct cities of `collection`, grouped by reference
/// city. Both `(a, b)` and `(b, a)` are produced, self pairs never are.
pub fn collection_similarity(
    labels: &QuarterLabelTable,
    collection: &str,
    quarter: Quarter,
    year: i32,
) -> Vec<SimilarityRecord> {
    let cities = labels.cities(collection);
    let rows: Vec<Vec<Option<Label>>> = cities
        .iter()
        .map(|city| labels.row(collection, city))
        .collect();
    let n_dates = labels.n_dates();

    let mut records = Vec::with_capacity(cities.len() * cities.len().saturating_sub(1));
    for (r, ref_city) in cities.iter().enumerate() {
        for (c, city) in cities.iter().enumerate() {
            if r == c {
                continue;
            }
            records.push(SimilarityRecord {
                city: city.to_string(),
                ref_city: ref_city.to_string(),
                collection: collection.to_string(),
                quarter,
                year,
                percent: percent_same_cluster(&rows[r], &rows[c], n_dates),
            });
        }
    }
    records
}
