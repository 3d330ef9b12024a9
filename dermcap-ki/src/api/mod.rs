//! HTTP API handlers for dermcap-ki
//!
//! The operator form posts here; each request runs one full validation pass.

pub mod health;
pub mod import;
pub mod locations;

pub use health::health_routes;
pub use import::import_routes;
pub use locations::location_routes;
