pub mod expand;
pub mod model;
pub mod timezone;
