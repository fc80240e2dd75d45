mod asp;
mod bsp;
mod error;
mod model;
mod ssp;
mod state;

#[cfg(test)]
mod testing;

pub use asp::AspModel;
pub use bsp::BspModel;
pub use error::{ModelErr, Result};
pub use model::ConsistencyModel;
pub use ssp::SspModel;
pub use state::ModelCore;
