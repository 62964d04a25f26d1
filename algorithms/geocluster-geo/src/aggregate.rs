use std::collections::{BTreeMap, HashMap};

use geo::{Distance, Haversine, Intersects, Point};
use tracing::debug;

use crate::error::{GeoError, Result};
use crate::hyperparams::AggregationValidParams;
use crate::layer::RegionLayer;

/// One observation at a location and time, one optional value per feature
#[derive(Clone, Debug, PartialEq)]
pub struct PointSample<T> {
    pub longitude: f64,
    pub latitude: f64,
    pub time: T,
    pub values: Vec<Option<f64>>,
}

impl<T> PointSample<T> {
    pub fn new(longitude: f64, latitude: f64, time: T, values: Vec<Option<f64>>) -> Self {
        Self {
            longitude,
            latitude,
            time,
            values,
        }
    }
}

/// Mean of every feature over the points of a region at one time. A feature none of the
/// points carried is `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionMean<T> {
    pub region: String,
    pub time: T,
    pub values: Vec<Option<f64>>,
    pub n_points: usize,
}

/// Outcome of the expanding containment: which locations feed which region.
///
/// A location feeds at most one region. It belongs to the first region of the layer that
/// contains it. A location outside every region may be claimed by a region containing no
/// location, the first one whose growing radius around its centroid reaches it. Locations
/// nobody claims are left out.
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    region: Vec<Option<usize>>,
    members: Vec<Vec<usize>>,
    radius: Vec<Option<f64>>,
}

impl Assignment {
    /// Region fed by location `idx`
    pub fn region(&self, idx: usize) -> Option<usize> {
        self.region[idx]
    }

    /// Locations feeding region `region`, ascending
    pub fn members(&self, region: usize) -> &[usize] {
        &self.members[region]
    }

    /// Radius, in meters, at which the gap region `region` found its locations. `None` for
    /// regions containing locations.
    pub fn gap_radius(&self, region: usize) -> Option<f64> {
        self.radius[region]
    }

    /// Locations feeding no region
    pub fn unassigned(&self) -> Vec<usize> {
        (0..self.region.len())
            .filter(|&idx| self.region[idx].is_none())
            .collect()
    }
}

impl AggregationValidParams {
    /// Assigns `locations`, `x` being the longitude, to the regions of `layer`. Fails when a
    /// region still has no location once the radius reached `max_radius`.
    pub fn assign(&self, layer: &RegionLayer, locations: &[Point<f64>]) -> Result<Assignment> {
        let n_regions = layer.len();
        let mut members = vec![Vec::new(); n_regions];
        let mut region: Vec<Option<usize>> = locations
            .iter()
            .enumerate()
            .map(|(idx, location)| {
                let found = layer
                    .regions()
                    .iter()
                    .position(|r| r.geometry().intersects(location));
                if let Some(found) = found {
                    members[found].push(idx);
                }
                found
            })
            .collect();

        let mut radius = vec![None; n_regions];
        let mut gaps: Vec<usize> = (0..n_regions).filter(|&r| members[r].is_empty()).collect();
        for r in self.radii() {
            if gaps.is_empty() {
                break;
            }
            debug!(radius = r, gaps = gaps.len(), "filling regions without points");
            gaps.retain(|&gap| {
                let centroid = layer.centroid(gap);
                let found: Vec<usize> = locations
                    .iter()
                    .enumerate()
                    .filter(|&(idx, &location)| {
                        region[idx].is_none() && Haversine::distance(centroid, location) <= r
                    })
                    .map(|(idx, _)| idx)
                    .collect();
                if found.is_empty() {
                    return true;
                }
                for &idx in &found {
                    region[idx] = Some(gap);
                }
                members[gap] = found;
                radius[gap] = Some(r);
                false
            });
        }

        if !gaps.is_empty() {
            return Err(GeoError::UnresolvedGaps {
                regions: gaps
                    .into_iter()
                    .map(|r| layer.regions()[r].name().to_string())
                    .collect(),
                max_radius: self.max_radius,
            });
        }
        Ok(Assignment {
            region,
            members,
            radius,
        })
    }

    /// Averages `samples` per region and time. Rows come sorted by time, then by region in
    /// layer order.
    pub fn aggregate<T: Ord + Clone>(
        &self,
        layer: &RegionLayer,
        samples: &[PointSample<T>],
    ) -> Result<Vec<RegionMean<T>>> {
        let n_features = match samples.first() {
            Some(sample) => sample.values.len(),
            None => return Ok(Vec::new()),
        };

        let mut location_of = Vec::with_capacity(samples.len());
        let mut locations = Vec::new();
        let mut known: HashMap<(u64, u64), usize> = HashMap::new();
        for (index, sample) in samples.iter().enumerate() {
            if sample.values.len() != n_features {
                return Err(GeoError::FeatureCountMismatch {
                    index,
                    expected: n_features,
                    found: sample.values.len(),
                });
            }
            if !(sample.longitude.is_finite() && sample.latitude.is_finite()) {
                return Err(GeoError::InvalidCoordinate(index));
            }
            let key = (sample.longitude.to_bits(), sample.latitude.to_bits());
            let location = *known.entry(key).or_insert_with(|| {
                locations.push(Point::new(sample.longitude, sample.latitude));
                locations.len() - 1
            });
            location_of.push(location);
        }

        let assignment = self.assign(layer, &locations)?;
        let mut groups: BTreeMap<(T, usize), Accumulator> = BTreeMap::new();
        for (sample, &location) in samples.iter().zip(location_of.iter()) {
            if let Some(region) = assignment.region(location) {
                groups
                    .entry((sample.time.clone(), region))
                    .or_insert_with(|| Accumulator::new(n_features))
                    .add(&sample.values);
            }
        }
        debug!(
            locations = locations.len(),
            dropped = assignment.unassigned().len(),
            rows = groups.len(),
            "aggregated samples by region"
        );

        Ok(groups
            .into_iter()
            .map(|((time, region), acc)| RegionMean {
                region: layer.regions()[region].name().to_string(),
                time,
                n_points: acc.n_points,
                values: acc.means(),
            })
            .collect())
    }
}

struct Accumulator {
    sums: Vec<f64>,
    counts: Vec<usize>,
    n_points: usize,
}

impl Accumulator {
    fn new(n_features: usize) -> Self {
        Self {
            sums: vec![0.; n_features],
            counts: vec![0; n_features],
            n_points: 0,
        }
    }

    fn add(&mut self, values: &[Option<f64>]) {
        self.n_points += 1;
        for (idx, value) in values.iter().enumerate() {
            if let Some(v) = value {
                self.sums[idx] += v;
                self.counts[idx] += 1;
            }
        }
    }

    fn means(&self) -> Vec<Option<f64>> {
        self.sums
            .iter()
            .zip(self.counts.iter())
            .map(|(&sum, &count)| {
                if count == 0 {
                    None
                } else {
                    Some(sum / count as f64)
                }
            })
            .collect()
    }
}
