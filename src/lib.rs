pub mod api;
pub mod builder;
pub mod classifier;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod notifier;
pub mod utils;
