//! Security Policy Definitions

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authorization tier. The sole axis this engine authorizes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Visitor,
    Viewer,
    Manager,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Visitor, Role::Viewer, Role::Manager, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Visitor => "visitor",
            Role::Viewer => "viewer",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    /// Parse a role name coming from the authentication layer.
    ///
    /// Unlike a lenient default, an unknown name is a configuration error:
    /// it means the layer that assigned the role is broken.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "visitor" => Ok(Role::Visitor),
            "viewer" => Ok(Role::Viewer),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            other => Err(EngineError::Configuration(format!(
                "Unknown role '{}' reached the query engine",
                other
            ))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated user, as handed over by the login layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    pub full_name: String,
}

impl User {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, role: Role) -> Self {
        let username = username.into();
        Self {
            user_id: user_id.into(),
            full_name: username.clone(),
            username,
            role,
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = full_name.into();
        self
    }
}
