pub mod apis;
pub mod common;
pub mod config;
pub mod extract;
pub mod infra;
pub mod logging;
pub mod output;
pub mod pipeline;
