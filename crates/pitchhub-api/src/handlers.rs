//! Request handlers.

pub mod auth;
pub mod files;
pub mod health;
pub mod pitches;
pub mod profiles;
mod upload;

pub use auth::*;
pub use files::*;
pub use health::*;
pub use pitches::*;
pub use profiles::*;
