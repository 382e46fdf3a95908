//! Database layer - connection pool, sessions, repositories, stores
//!
//! # Design Principles
//!
//! - Bounded connection pool; no shared connection between requests
//! - One transaction per store operation, committed or rolled back explicitly
//! - Unique index on email; violations become `DbError::Conflict`
//! - Handlers only see the `UserStore` trait object

pub mod error;
pub mod memory;
pub mod migrations;
pub mod pool;
pub mod repos;
pub mod session;
pub mod store;

pub use error::DbError;
pub use memory::MemoryUserStore;
pub use pool::{create_pool_with_config, PoolConfig};
pub use repos::UserRepo;
pub use session::Session;
pub use store::{PgUserStore, UserStore};
