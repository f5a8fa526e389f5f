//! CLI command modules.

pub mod agent;
pub mod http;
pub mod tasks;
