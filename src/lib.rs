// Main library entry point for solgraph.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ports;

pub use error::{Result, SolgraphError};
