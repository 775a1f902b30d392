pub mod merge;
pub mod sessions;
pub mod sources;
