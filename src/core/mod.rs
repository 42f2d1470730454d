//! Core module - storage, validation, configuration and the service façade

pub mod backup;
pub mod config;
pub mod dashboard;
pub mod entity;
pub mod error;
pub mod export;
pub mod import;
pub mod service;
pub mod store;
pub mod validation;

pub use config::Config;
pub use dashboard::{Activity, Dashboard, DashboardStats};
pub use entity::Record;
pub use error::{BmsError, Result};
pub use service::{BmsService, FilterOptions};
pub use store::{ListFilter, SortOrder, Store};
pub use validation::{FieldError, Fields, ValidationErrors};
