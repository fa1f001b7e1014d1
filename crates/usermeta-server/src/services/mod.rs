//! Business logic services

pub mod auth;
pub mod metas;

pub use auth::AuthService;
pub use metas::MetaService;
