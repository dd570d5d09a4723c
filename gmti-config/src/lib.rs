//! Configuration library for the GMTI operator console.
//!
//! This crate owns everything the console reads from disk before it talks to
//! the engine: scenario descriptor discovery and parsing, and the layered
//! console settings (defaults, TOML file, `.env`, environment).
#![allow(missing_docs)]

pub mod catalog;
pub mod constants;
pub mod loader;
pub mod models;
pub mod validation;

pub use catalog::{CatalogListing, ScenarioCatalog};
pub use loader::{
    ConfigLoad, ConfigLoader, ConfigLoaderOptions, EnvConfig,
    error::ConfigLoadError,
};
pub use models::{
    ConsoleConfig, EndpointError, EngineCommandConfig, EngineEndpoints,
};
pub use validation::{ConfigWarning, ConfigWarnings};
