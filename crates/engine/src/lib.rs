//! Database engine for tesseradb
//!
//! Ties the store, WAL, transactions, and extension registry into one
//! `Database` handle with a closure-style transaction API.

pub mod config;
pub mod database;

pub use config::DatabaseConfig;
pub use database::Database;
