//! Synthetic territories made of square municipalities
use geo::{polygon, MultiPolygon};
use geocluster_geo::{Region, RegionLayer, Result};

/// A rectangle of `n_rows` by `n_cols` square municipalities, `cell` degrees wide, whose south
/// west corner sits at `origin` (longitude, latitude).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MunicipalityGrid {
    origin: (f64, f64),
    cell: f64,
    n_cols: usize,
    n_rows: usize,
}

impl MunicipalityGrid {
    /// A grid of 0.1 degree cells starting at (16.0, 40.5), inside Apulia
    pub fn new(n_cols: usize, n_rows: usize) -> Self {
        Self {
            origin: (16.0, 40.5),
            cell: 0.1,
            n_cols,
            n_rows,
        }
    }

    pub fn origin(mut self, longitude: f64, latitude: f64) -> Self {
        self.origin = (longitude, latitude);
        self
    }

    pub fn cell_size(mut self, cell: f64) -> Self {
        self.cell = cell;
        self
    }

    pub fn n_cells(&self) -> usize {
        self.n_cols * self.n_rows
    }

    /// Name of the municipality at `row`, `col`. Names hold a space.
    pub fn name(&self, row: usize, col: usize) -> String {
        format!("Comune {}-{}", row, col)
    }

    /// Names in layer order, row major
    pub fn names(&self) -> Vec<String> {
        self.cells().map(|(row, col)| self.name(row, col)).collect()
    }

    /// Center (longitude, latitude) of the cell at `row`, `col`
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let (x0, y0) = self.corner(row, col);
        (x0 + self.cell / 2., y0 + self.cell / 2.)
    }

    pub fn layer(&self) -> Result<RegionLayer> {
        RegionLayer::new(
            self.cells()
                .map(|(row, col)| {
                    let (x0, y0) = self.corner(row, col);
                    let side = self.cell;
                    let square = polygon![
                        (x: x0, y: y0),
                        (x: x0 + side, y: y0),
                        (x: x0 + side, y: y0 + side),
                        (x: x0, y: y0 + side),
                    ];
                    Region::new(self.name(row, col), MultiPolygon::new(vec![square]))
                })
                .collect(),
        )
    }

    /// `per_side * per_side` locations strictly inside every cell, cell by cell in layer order
    pub fn lattice(&self, per_side: usize) -> Vec<(f64, f64)> {
        let step = self.cell / (per_side + 1) as f64;
        self.cells()
            .flat_map(|(row, col)| {
                let (x0, y0) = self.corner(row, col);
                (1..=per_side).flat_map(move |i| {
                    (1..=per_side).map(move |j| (x0 + step * j as f64, y0 + step * i as f64))
                })
            })
            .collect()
    }

    fn corner(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin.0 + self.cell * col as f64,
            self.origin.1 + self.cell * row as f64,
        )
    }

    fn cells(&self) -> impl Iterator<Item = (usize, usize)> {
        let n_cols = self.n_cols;
        (0..self.n_rows).flat_map(move |row| (0..n_cols).map(move |col| (row, col)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn layer_of_a_grid() {
        let grid = MunicipalityGrid::new(2, 3).origin(10., 20.).cell_size(1.);
        let layer = grid.layer().unwrap();
        assert_eq!(layer.len(), 6);
        assert_eq!(layer.position("Comune 2-1"), Some(5));
        let (x, y) = grid.cell_center(2, 1);
        assert_abs_diff_eq!(x, 11.5);
        assert_abs_diff_eq!(y, 22.5);
    }

    #[test]
    fn lattice_is_inside_cells() {
        let grid = MunicipalityGrid::new(2, 1).origin(0., 0.).cell_size(1.);
        let lattice = grid.lattice(1);
        assert_eq!(lattice, vec![(0.5, 0.5), (1.5, 0.5)]);
        let lattice = grid.lattice(3);
        assert_eq!(lattice.len(), 18);
        assert!(lattice[..9].iter().all(|&(x, y)| x > 0. && x < 1. && y > 0. && y < 1.));
    }
}
