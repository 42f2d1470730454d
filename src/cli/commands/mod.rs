//! CLI command implementations

pub mod utils;

pub mod completions;
pub mod config;
pub mod db;
pub mod export;
pub mod handover;
pub mod import;
pub mod init;
pub mod issue;
pub mod mail;
pub mod req;
pub mod status;
pub mod suite;
