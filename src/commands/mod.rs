//! CLI subcommands

pub mod artifact;
pub mod list;
