use approx::assert_abs_diff_eq;
use geo::Point;
use geocluster::ParamGuard;
use geocluster_datasets::MunicipalityGrid;
use geocluster_geo::{AggregationParams, AggregationValidParams, GeoError, PointSample};

fn params() -> AggregationValidParams {
    AggregationParams::default().check().unwrap()
}

fn to_points(lattice: &[(f64, f64)]) -> Vec<Point<f64>> {
    lattice.iter().map(|&(x, y)| Point::new(x, y)).collect()
}

#[test]
fn every_point_has_exactly_one_home() {
    let grid = MunicipalityGrid::new(5, 4);
    let layer = grid.layer().unwrap();
    let locations = to_points(&grid.lattice(3));
    let assignment = params().assign(&layer, &locations).unwrap();

    for idx in 0..locations.len() {
        // lattice points are laid out cell by cell, 9 per cell
        assert_eq!(assignment.region(idx), Some(idx / 9));
    }
    for region in 0..layer.len() {
        assert_eq!(assignment.members(region).len(), 9);
        assert_eq!(assignment.gap_radius(region), None);
    }
    assert!(assignment.unassigned().is_empty());
}

/// A 3 by 3 grid whose central cell holds no sample, plus two samples west of the grid
fn grid_with_a_hole() -> (MunicipalityGrid, Vec<(f64, f64)>) {
    let grid = MunicipalityGrid::new(3, 3);
    let mut lattice: Vec<(f64, f64)> = grid
        .lattice(2)
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| idx / 4 != 4)
        .map(|(_, p)| p)
        .collect();
    // about 15.5 km and 16.9 km from the centre of the grid
    lattice.push((15.97, 40.62));
    lattice.push((15.95, 40.65));
    (grid, lattice)
}

#[test]
fn empty_cells_take_unassigned_points_only() {
    let (grid, lattice) = grid_with_a_hole();
    let layer = grid.layer().unwrap();
    let locations = to_points(&lattice);
    let assignment = params().assign(&layer, &locations).unwrap();

    assert_eq!(assignment.gap_radius(4), Some(16_000.));
    assert_eq!(assignment.members(4), &[32]);
    assert_eq!(assignment.unassigned(), vec![33]);
    for idx in 0..32 {
        assert_ne!(assignment.region(idx), Some(4));
    }
    let n_members: usize = (0..layer.len()).map(|r| assignment.members(r).len()).sum();
    assert_eq!(n_members, 33);
}

#[test]
fn no_sample_is_counted_twice() {
    let (grid, lattice) = grid_with_a_hole();
    let layer = grid.layer().unwrap();
    let samples: Vec<PointSample<u32>> = lattice
        .iter()
        .map(|&(x, y)| PointSample::new(x, y, 0, vec![Some(1.)]))
        .collect();
    let means = params().aggregate(&layer, &samples).unwrap();

    assert_eq!(means.len(), 9);
    let n_points: usize = means.iter().map(|m| m.n_points).sum();
    // the farthest sample west of the grid is left out
    assert_eq!(n_points, samples.len() - 1);
    let hole = means.iter().find(|m| m.region == grid.name(1, 1)).unwrap();
    assert_eq!(hole.n_points, 1);
}

#[test]
fn unreachable_region_is_fatal() {
    let grid = MunicipalityGrid::new(2, 1).cell_size(1.);
    let layer = grid.layer().unwrap();
    // the only point already belongs to the first cell, none is left for the second
    let locations = vec![Point::new(16.2, 41.)];
    let params = AggregationParams::default()
        .max_radius(50_000.)
        .check()
        .unwrap();
    match params.assign(&layer, &locations) {
        Err(GeoError::UnresolvedGaps {
            regions,
            max_radius,
        }) => {
            assert_eq!(regions, vec![grid.name(0, 1)]);
            assert_abs_diff_eq!(max_radius, 50_000.);
        }
        other => panic!("expected unresolved gaps, got {:?}", other),
    }
}

#[test]
fn means_per_region_and_day() {
    let grid = MunicipalityGrid::new(2, 2);
    let layer = grid.layer().unwrap();
    let lattice = grid.lattice(2);

    let mut samples = Vec::new();
    for day in 0..3u32 {
        for (idx, &(x, y)) in lattice.iter().enumerate() {
            let cell = idx / 4;
            // the first point of every cell misses the second feature
            let second = if idx % 4 == 0 { None } else { Some(idx as f64) };
            samples.push(PointSample::new(
                x,
                y,
                day,
                vec![Some((cell * 10 + day as usize) as f64), second],
            ));
        }
    }
    let means = params().aggregate(&layer, &samples).unwrap();

    assert_eq!(means.len(), 12);
    for (row, mean) in means.iter().enumerate() {
        let day = (row / 4) as u32;
        let cell = row % 4;
        assert_eq!(mean.time, day);
        assert_eq!(mean.region, grid.names()[cell]);
        assert_eq!(mean.n_points, 4);
        assert_abs_diff_eq!(mean.values[0].unwrap(), (cell * 10) as f64 + day as f64);
        let expected = (4 * cell + 1 + 4 * cell + 2 + 4 * cell + 3) as f64 / 3.;
        assert_abs_diff_eq!(mean.values[1].unwrap(), expected);
    }
}

#[test]
fn repeated_locations_are_one_point() {
    let grid = MunicipalityGrid::new(1, 1);
    let layer = grid.layer().unwrap();
    let (x, y) = grid.cell_center(0, 0);
    let samples = vec![
        PointSample::new(x, y, "2021-01-01", vec![Some(1.)]),
        PointSample::new(x, y, "2021-01-01", vec![Some(3.)]),
        PointSample::new(x, y, "2021-01-02", vec![None]),
    ];
    let means = params().aggregate(&layer, &samples).unwrap();
    assert_eq!(means.len(), 2);
    assert_eq!(means[0].values, vec![Some(2.)]);
    assert_eq!(means[0].n_points, 2);
    assert_eq!(means[1].values, vec![None]);
}
