use std::collections::HashSet;

use geocluster::Float;
use ndarray::{ArrayBase, Data, Ix2};

/// Number of pairwise different rows of `records`. Zero and negative zero are the same value,
/// rows holding a NaN are all considered different.
pub fn count_distinct_rows<F: Float>(records: &ArrayBase<impl Data<Elem = F>, Ix2>) -> usize {
    let mut seen = HashSet::with_capacity(records.nrows());
    let mut with_nan = 0;
    for row in records.rows() {
        let key: Option<Vec<u64>> = row
            .iter()
            .map(|x| {
                x.to_f64()
                    .filter(|v| !v.is_nan())
                    .map(|v| if v == 0.0 { 0u64 } else { v.to_bits() })
            })
            .collect();
        match key {
            Some(key) => {
                seen.insert(key);
            }
            None => with_nan += 1,
        }
    }
    seen.len() + with_nan
}
