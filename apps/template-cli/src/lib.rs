//! `tmplctl`: operator tool for template schemas and structured content

pub mod cli;
pub mod commands;
pub mod config;

pub use cli::{Args, Command};
pub use commands::run;
pub use config::AppConfig;
