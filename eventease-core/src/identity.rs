use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Client,
    Organizer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "CLIENT",
            Role::Organizer => "ORGANIZER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CLIENT" | "CUSTOMER" => Ok(Role::Client),
            "ORGANIZER" => Ok(Role::Organizer),
            "ADMIN" | "SUPER_ADMIN" => Ok(Role::Admin),
            other => Err(CoreError::AuthorizationError(format!("Unknown role: {}", other))),
        }
    }
}

/// Verified identity of whoever is calling, passed explicitly into every
/// engine and query call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
    pub role: Role,
    pub display_name: Option<String>,
}

impl Caller {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            display_name: None,
        }
    }

    pub fn client(id: impl Into<String>) -> Self {
        Self::new(id, Role::Client)
    }

    pub fn organizer(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            display_name: Some(name.into()),
            ..Self::new(id, Role::Organizer)
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    pub fn require_role(&self, role: Role) -> CoreResult<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(CoreError::AuthorizationError(format!(
                "{} role required, caller is {}",
                role, self.role
            )))
        }
    }
}

/// Turns a presented credential into a verified caller
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> CoreResult<Caller>;
}
