pub mod config;
pub mod exit_status;
