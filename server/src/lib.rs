pub mod boot;
pub mod config;
pub mod routes;
pub mod services;

pub use boot::{Bootstrap, Service};
pub use config::{Config, Profile};
pub use routes::{build_app, AppState};
