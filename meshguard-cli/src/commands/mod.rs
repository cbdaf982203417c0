//! CLI subcommands.

pub mod check;
pub mod common;
pub mod init;
pub mod run;
pub mod status;
