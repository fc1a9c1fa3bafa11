//! CLI subcommand implementations for the billgrab binary.

pub mod check_config;
pub mod doctor;
pub mod output;
pub mod run_cmd;
