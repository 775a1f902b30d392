pub mod extractors;
pub mod model;
pub mod normalizer;
pub mod url;
