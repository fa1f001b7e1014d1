//! CLI subcommands

pub mod database;
pub mod serve;
