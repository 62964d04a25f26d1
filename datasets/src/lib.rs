//! `geocluster-datasets` provides synthetic data ready to be used in tests and examples.
//!
//! ## Current State
//!
//! * [gaussian blobs](generate::generate_blobs): well separated clusters around given centroids;
//! * [municipality grids](regions::MunicipalityGrid): a rectangular territory split in square
//!   municipalities, with a lattice of sample locations inside every cell.
//!
//! ```
//! use geocluster_datasets::{generate_blobs, MunicipalityGrid};
//! use ndarray::array;
//! use rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256Plus;
//!
//! let mut rng = Xoshiro256Plus::seed_from_u64(42);
//! let records = generate_blobs(10, &array![[0., 0.], [5., 5.]], &mut rng);
//! assert_eq!(records.dim(), (20, 2));
//!
//! let grid = MunicipalityGrid::new(3, 2);
//! assert_eq!(grid.layer().unwrap().len(), 6);
//! assert_eq!(grid.lattice(2).len(), 24);
//! ```
pub mod generate;
pub mod regions;

pub use generate::{generate_blob, generate_blobs, generate_blobs_with_distribution};
pub use regions::MunicipalityGrid;
