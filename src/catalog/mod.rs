pub mod api;
pub mod auth;
pub mod dto;
pub mod error;
pub mod integrations;
