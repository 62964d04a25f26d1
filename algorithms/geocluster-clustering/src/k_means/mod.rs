mod algorithm;
mod errors;
mod hyperparams;
mod init;
mod selection;

pub use algorithm::*;
pub use errors::*;
pub use hyperparams::*;
pub use selection::*;
