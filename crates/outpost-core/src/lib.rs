//! outpost-core: wire envelope and configuration shared by every Outpost crate.

pub mod config;
pub mod wire;

pub use config::AgentConfig;
pub use wire::{AgentRequest, AgentResponse, Exception, ProtocolVersion};
