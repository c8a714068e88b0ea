pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod store;
pub mod upload;

pub use config::AppConfig;
pub use db::create_pool;
pub use service::{DefectService, ReconcileService, ShipmentService, StatusService};
pub use store::PgStore;
