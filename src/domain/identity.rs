//! Caller identity as supplied by the upstream auth gateway

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Account kinds sharing one base identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    Artisan,
    Supplier,
    TourismProvider,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Artisan => "artisan",
            Self::Supplier => "supplier",
            Self::TourismProvider => "tourism_provider",
            Self::Admin => "admin",
        }
    }

    /// The part this role plays in an order workflow.
    pub fn actor_role(&self) -> ActorRole {
        match self {
            Self::Customer => ActorRole::Buyer,
            Self::Artisan | Self::Supplier | Self::TourismProvider => ActorRole::Seller,
            Self::Admin => ActorRole::Admin,
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "artisan" => Ok(Self::Artisan),
            "supplier" => Ok(Self::Supplier),
            "tourism_provider" | "provider" => Ok(Self::TourismProvider),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole { Buyer, Seller, Admin }

/// Reference to whoever performed an action, recorded on the order timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRef {
    pub id: Uuid,
    pub role: ActorRole,
}

/// Verified caller of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn new(id: Uuid, role: UserRole) -> Self { Self { id, role } }
    pub fn is_admin(&self) -> bool { self.role == UserRole::Admin }
    pub fn is_seller(&self) -> bool { self.role.actor_role() == ActorRole::Seller }
    pub fn actor_ref(&self) -> ActorRef { ActorRef { id: self.id, role: self.role.actor_role() } }
}
