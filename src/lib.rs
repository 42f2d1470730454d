//! BMS: Business Management System
//!
//! Tracks handovers, requirements, issues and test-suite results in a local
//! SQLite database, with CSV export/import, a dashboard of simple aggregates
//! and best-effort email notifications.

pub mod cli;
pub mod core;
pub mod entities;
pub mod notify;
