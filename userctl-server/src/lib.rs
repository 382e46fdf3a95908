//! userctl-server: user CRUD over HTTP, backed by PostgreSQL
//!
//! Layers, leaf to root:
//! - `models`: validated user input and the persisted row
//! - `db`: pool, scoped sessions, repository, `UserStore` handles
//! - `http`: axum router, handlers, error mapping

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod models;
pub mod state;

pub use config::{DatabaseConfig, DatabaseSource};
pub use error::{Error, Result};
pub use state::AppState;
