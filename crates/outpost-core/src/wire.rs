//! Request/response envelope exchanged with the orchestrator.
//!
//! A request names an action, carries its positional arguments as untyped
//! JSON, and optionally the negotiated protocol version. Responses carry
//! either a `value` or an `exception`, never both.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Negotiated wire protocol version.
///
/// Actions may branch on it (sync vs async) and may receive it as an
/// injected leading parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolVersion(pub u32);

impl ProtocolVersion {
    pub const fn new(version: u32) -> Self {
        Self(version)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Request ───────────────────────────────────────────────────────────────────

/// A decoded command from the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    /// Registered action name, e.g. "ping" or "get_task".
    pub method: String,
    /// Positional arguments, matched against the action's declared parameters.
    #[serde(default)]
    pub arguments: Vec<Value>,
    /// Negotiated protocol version. Absent means the agent's configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<ProtocolVersion>,
}

impl AgentRequest {
    pub fn new(method: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            arguments,
            protocol: None,
        }
    }

    pub fn with_protocol(mut self, protocol: ProtocolVersion) -> Self {
        self.protocol = Some(protocol);
        self
    }
}

// ── Response ──────────────────────────────────────────────────────────────────

/// Error body of an exception response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exception {
    pub message: String,
}

/// Response envelope: `{"value": ...}` or `{"exception": {"message": ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentResponse {
    Value { value: Value },
    Exception { exception: Exception },
}

impl AgentResponse {
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value {
            value: value.into(),
        }
    }

    pub fn exception(message: impl Into<String>) -> Self {
        Self::Exception {
            exception: Exception {
                message: message.into(),
            },
        }
    }

    pub fn is_exception(&self) -> bool {
        matches!(self, Self::Exception { .. })
    }

    /// The carried value, if this is a value response.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value { value } => Some(value),
            Self::Exception { .. } => None,
        }
    }

    /// The exception message, if this is an exception response.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Value { .. } => None,
            Self::Exception { exception } => Some(&exception.message),
        }
    }
}
