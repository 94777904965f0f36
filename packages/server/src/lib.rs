//! Thin routing layer over the `synergia` client: accepts credentials,
//! returns the aggregated profile as a JSON envelope, and maps classified
//! error kinds to transport status codes.

pub mod app;
pub mod config;
pub mod routes;

pub use app::build_app;
pub use config::Config;
