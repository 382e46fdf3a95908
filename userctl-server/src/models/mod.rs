//! Domain models with validation at construction
//!
//! All user input is validated when creating these types.
//! Invalid input returns ValidationError, not panic.

pub mod validation;
pub mod user;

pub use validation::ValidationError;
pub use user::{EmailAddress, NewUser, PersonName, User, UserChanges, UserList};
