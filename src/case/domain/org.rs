//! Organisations and users as referenced (not owned) by cases and tasks.

use super::{OrgId, UserId};
use serde::{Deserialize, Serialize};

/// An organisation participating in cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Org {
    id: OrgId,
    name: String,
}

impl Org {
    /// Creates an organisation record.
    #[must_use]
    pub const fn new(id: OrgId, name: String) -> Self {
        Self { id, name }
    }

    /// Returns the organisation identifier.
    #[must_use]
    pub const fn id(&self) -> OrgId {
        self.id
    }

    /// Returns the organisation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A user acting on cases and tasks.
///
/// Users double as the actor passed to every mutating lifecycle operation;
/// permission checks read the org membership and the admin flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    name: String,
    org_id: OrgId,
    admin: bool,
}

impl User {
    /// Creates a user record.
    #[must_use]
    pub const fn new(id: UserId, name: String, org_id: OrgId, admin: bool) -> Self {
        Self {
            id,
            name,
            org_id,
            admin,
        }
    }

    /// Returns the user identifier.
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// Returns the user display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the identifier of the user's organisation.
    #[must_use]
    pub const fn org_id(&self) -> OrgId {
        self.org_id
    }

    /// Returns whether the user holds the admin role.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.admin
    }
}
