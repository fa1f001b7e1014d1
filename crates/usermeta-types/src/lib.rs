//! Usermeta Types - plain data definitions
//!
//! Shared by the core and the server. No async runtime or storage
//! dependencies live here.

pub mod principal;
pub mod user;

pub use principal::*;
pub use user::*;
