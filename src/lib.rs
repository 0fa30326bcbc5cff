pub mod artifact;
pub mod capability;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod obsolescence;
pub mod syntax;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;
