pub mod classifier;
pub mod color;
pub mod model;
