//! Acting principal passed into engine operations
//!
//! Identity and session management live outside this system; the engines
//! only consume a resolved actor for audit and receipt attribution.

use serde::{Deserialize, Serialize};

/// Role of the acting principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActorRole {
    Admin,
    Operator,
    Viewer,
    System,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Admin => "ADMIN",
            ActorRole::Operator => "OPERATOR",
            ActorRole::Viewer => "VIEWER",
            ActorRole::System => "SYSTEM",
        }
    }
}

/// Resolved identity of the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub username: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(username: impl Into<String>, role: ActorRole) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    /// Fallback principal for work with no authenticated actor behind it.
    pub fn system() -> Self {
        Self {
            username: "SYSTEM".to_string(),
            role: ActorRole::System,
        }
    }
}
