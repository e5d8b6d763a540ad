use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Staff member or requester on whose behalf a request is made.
/// Identity is established upstream; this service only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Option<Uuid>,
    pub role: ActorRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Admin,
    Scheduler,
    Staff,
    Requester,
}

impl ActorRole {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(ActorRole::Admin),
            "scheduler" => Some(ActorRole::Scheduler),
            "staff" | "vet" | "receptionist" => Some(ActorRole::Staff),
            "requester" | "owner" | "client" => Some(ActorRole::Requester),
            _ => None,
        }
    }
}

impl Actor {
    pub fn anonymous() -> Self {
        Self {
            id: None,
            role: ActorRole::Staff,
        }
    }

    /// Privileged schedulers book straight into `Confirmed`.
    pub fn is_privileged(&self) -> bool {
        matches!(self.role, ActorRole::Admin | ActorRole::Scheduler)
    }
}
