//! Business services.

pub mod users;

pub use users::{NewUser, UserRecord, UserService, UserStore};
