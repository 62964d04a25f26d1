use std::collections::HashSet;
use std::fs;
use std::path::Path;

use geo::{Centroid, Coord, LineString, MultiPolygon, Point, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{GeoError, Result};

/// A named municipality polygon, coordinates in EPSG:4326 (`x` is the longitude)
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    name: String,
    geometry: MultiPolygon<f64>,
}

impl Region {
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            geometry,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }
}

/// Immutable partition of a territory into named municipalities.
///
/// Names are unique and every region has a centroid, the layer is validated once when built
/// and shared read-only afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionLayer {
    regions: Vec<Region>,
    centroids: Vec<Point<f64>>,
}

impl RegionLayer {
    pub fn new(regions: Vec<Region>) -> Result<Self> {
        if regions.is_empty() {
            return Err(GeoError::EmptyLayer);
        }
        let mut names = HashSet::with_capacity(regions.len());
        let mut centroids = Vec::with_capacity(regions.len());
        for region in &regions {
            if !names.insert(region.name.as_str()) {
                return Err(GeoError::DuplicateRegion(region.name.clone()));
            }
            let centroid = region
                .geometry
                .centroid()
                .ok_or_else(|| GeoError::EmptyGeometry(region.name.clone()))?;
            centroids.push(centroid);
        }
        Ok(Self { regions, centroids })
    }

    /// Reads a GeoJSON `FeatureCollection` of `Polygon` and `MultiPolygon` features, the region
    /// name being the string property `name_property` of each feature.
    pub fn from_geojson_str(geojson: &str, name_property: &str) -> Result<Self> {
        let collection: FeatureCollection = serde_json::from_str(geojson)?;
        let regions = collection
            .features
            .into_iter()
            .enumerate()
            .map(|(idx, feature)| feature.into_region(idx, name_property))
            .collect::<Result<Vec<_>>>()?;
        Self::new(regions)
    }

    pub fn from_path(path: impl AsRef<Path>, name_property: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_geojson_str(&content, name_property)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(|r| r.name.as_str())
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.regions.iter().position(|r| r.name == name)
    }

    pub(crate) fn centroid(&self, idx: usize) -> Point<f64> {
        self.centroids[idx]
    }
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    geometry: Option<Value>,
}

#[derive(Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum Geometry {
    Polygon(Vec<Vec<Vec<f64>>>),
    MultiPolygon(Vec<Vec<Vec<Vec<f64>>>>),
}

impl Feature {
    fn into_region(self, idx: usize, name_property: &str) -> Result<Region> {
        let name = self
            .properties
            .as_ref()
            .and_then(|p| p.get(name_property))
            .and_then(Value::as_str)
            .ok_or_else(|| GeoError::MissingName(idx, name_property.to_string()))?
            .to_string();
        let geometry = self
            .geometry
            .ok_or_else(|| GeoError::UnsupportedGeometry(idx, "null".to_string()))?;
        let kind = geometry
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let geometry: Geometry = serde_json::from_value(geometry)
            .map_err(|_| GeoError::UnsupportedGeometry(idx, kind))?;
        let polygons = match geometry {
            Geometry::Polygon(rings) => vec![polygon(idx, rings)?],
            Geometry::MultiPolygon(polygons) => polygons
                .into_iter()
                .map(|rings| polygon(idx, rings))
                .collect::<Result<Vec<_>>>()?,
        };
        Ok(Region::new(name, MultiPolygon::new(polygons)))
    }
}

fn polygon(idx: usize, rings: Vec<Vec<Vec<f64>>>) -> Result<Polygon<f64>> {
    let mut rings = rings
        .into_iter()
        .map(|ring| {
            ring.into_iter()
                .map(|position| match position.as_slice() {
                    // a third value, the altitude, is ignored
                    [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
                    _ => Err(GeoError::MalformedCoordinate(idx)),
                })
                .collect::<Result<Vec<_>>>()
                .map(LineString::new)
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter();
    let exterior = rings.next().ok_or(GeoError::MalformedCoordinate(idx))?;
    Ok(Polygon::new(exterior, rings.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geo::polygon;

    const LAYER: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"COMUNE": "Bari", "PRO_COM": 72006},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[16.0, 41.0], [16.2, 41.0], [16.2, 41.2], [16.0, 41.2], [16.0, 41.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": {"COMUNE": "Tremiti"},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[15.0, 42.0, 3.0], [15.1, 42.0, 3.0], [15.1, 42.1, 3.0], [15.0, 42.0, 3.0]]],
                        [[[15.2, 42.0], [15.3, 42.0], [15.3, 42.1], [15.2, 42.0]]]
                    ]
                }
            }
        ]
    }"#;

    #[test]
    fn reads_geojson() {
        let layer = RegionLayer::from_geojson_str(LAYER, "COMUNE").unwrap();
        assert_eq!(layer.names().collect::<Vec<_>>(), vec!["Bari", "Tremiti"]);
        assert_eq!(layer.regions()[1].geometry().0.len(), 2);
        assert_eq!(layer.position("Tremiti"), Some(1));
        let centroid = layer.centroid(0);
        assert_abs_diff_eq!(centroid.x(), 16.1, epsilon = 1e-9);
        assert_abs_diff_eq!(centroid.y(), 41.1, epsilon = 1e-9);
    }

    #[test]
    fn missing_name_property() {
        let err = RegionLayer::from_geojson_str(LAYER, "NAME").unwrap_err();
        assert!(matches!(err, GeoError::MissingName(0, _)));
    }

    #[test]
    fn unsupported_geometry() {
        let layer = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"COMUNE": "X"},
             "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}}
        ]}"#;
        let err = RegionLayer::from_geojson_str(layer, "COMUNE").unwrap_err();
        assert!(matches!(err, GeoError::UnsupportedGeometry(0, ref kind) if kind == "Point"));
    }

    #[test]
    fn duplicate_and_empty() {
        let square = MultiPolygon::new(vec![polygon![
            (x: 0., y: 0.),
            (x: 1., y: 0.),
            (x: 1., y: 1.),
            (x: 0., y: 1.),
        ]]);
        let err = RegionLayer::new(vec![
            Region::new("A", square.clone()),
            Region::new("A", square.clone()),
        ])
        .unwrap_err();
        assert!(matches!(err, GeoError::DuplicateRegion(ref name) if name == "A"));
        assert!(matches!(
            RegionLayer::new(vec![]).unwrap_err(),
            GeoError::EmptyLayer
        ));
        assert!(matches!(
            RegionLayer::new(vec![Region::new("B", MultiPolygon::new(vec![]))]).unwrap_err(),
            GeoError::EmptyGeometry(_)
        ));
    }
}
