pub mod aggregator;
pub mod cache;
pub mod catalog;
pub mod category;
pub mod config;
pub mod event;
pub mod manual;
pub mod presentation;
pub mod schedule;
pub mod tracing;
