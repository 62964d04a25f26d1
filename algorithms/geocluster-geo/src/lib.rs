//! `geocluster-geo` reduces raw point samples to one averaged record per municipality and
//! time step.
//!
//! The reference geometry is a [`RegionLayer`], an immutable set of named polygons usually
//! read from a GeoJSON `FeatureCollection`. Points are first assigned to the polygon that
//! contains them; municipalities left without any point then take the points outside every
//! polygon lying within a circle around their centroid, whose radius grows until every
//! municipality is covered. A point feeds a single municipality.
//!
//! ```
//! use geocluster::ParamGuard;
//! use geocluster_geo::{AggregationParams, PointSample, Region, RegionLayer};
//! use geo::{polygon, MultiPolygon};
//!
//! let square = |x0: f64| {
//!     MultiPolygon::new(vec![polygon![
//!         (x: x0, y: 40.0),
//!         (x: x0 + 0.1, y: 40.0),
//!         (x: x0 + 0.1, y: 40.1),
//!         (x: x0, y: 40.1),
//!     ]])
//! };
//! let layer = RegionLayer::new(vec![
//!     Region::new("Alpha", square(16.0)),
//!     Region::new("Beta", square(16.1)),
//! ])
//! .unwrap();
//!
//! let samples = vec![
//!     PointSample::new(16.02, 40.05, 1, vec![Some(10.0)]),
//!     PointSample::new(16.04, 40.05, 1, vec![Some(20.0)]),
//!     PointSample::new(16.15, 40.05, 1, vec![Some(5.0)]),
//! ];
//! let means = AggregationParams::default()
//!     .check()
//!     .unwrap()
//!     .aggregate(&layer, &samples)
//!     .unwrap();
//! assert_eq!(means[0].region, "Alpha");
//! assert_eq!(means[0].values, vec![Some(15.0)]);
//! assert_eq!(means[1].values, vec![Some(5.0)]);
//! ```
mod aggregate;
mod error;
mod hyperparams;
mod layer;

pub use aggregate::{Assignment, PointSample, RegionMean};
pub use error::{GeoError, Result};
pub use hyperparams::{AggregationParams, AggregationParamsError, AggregationValidParams};
pub use layer::{Region, RegionLayer};
