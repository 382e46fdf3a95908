//! Repository implementations for database access
//!
//! Repositories borrow a `Session` and never commit themselves; the
//! caller decides the outcome via `Session::finish`.

pub mod users;

pub use users::UserRepo;
