mod algorithm;
mod hyperparams;
mod selection;

pub use algorithm::*;
pub use hyperparams::*;
pub use selection::*;
