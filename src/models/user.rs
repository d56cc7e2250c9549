use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role. Ordering follows privilege: every role holds the
/// capabilities of the roles below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    Client,
    Staff,
    Admin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ClientPortal,
    StaffPortal,
    ModulePermissions,
    Superuser,
}

const GUEST_CAPABILITIES: &[Capability] = &[];
const CLIENT_CAPABILITIES: &[Capability] = &[Capability::ClientPortal];
const STAFF_CAPABILITIES: &[Capability] = &[
    Capability::ClientPortal,
    Capability::StaffPortal,
    Capability::ModulePermissions,
];
const ADMIN_CAPABILITIES: &[Capability] = &[
    Capability::ClientPortal,
    Capability::StaffPortal,
    Capability::ModulePermissions,
    Capability::Superuser,
];

impl Role {
    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            Role::Guest => GUEST_CAPABILITIES,
            Role::Client => CLIENT_CAPABILITIES,
            Role::Staff => STAFF_CAPABILITIES,
            Role::Admin => ADMIN_CAPABILITIES,
        }
    }

    pub fn grants(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Client => "client",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    /// Normalized email, unique across users
    pub email: String,
    /// Unique across users
    pub company_name: String,
    /// Argon2 hash in PHC string format
    pub password_hash: String,
    /// Whether the user can log in
    pub active: bool,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> &str {
        if self.company_name.is_empty() {
            &self.email
        } else {
            &self.company_name
        }
    }

    pub fn short_name(&self) -> &str {
        &self.email
    }

    pub fn is_client(&self) -> bool {
        self.role.grants(Capability::ClientPortal)
    }

    pub fn is_staff(&self) -> bool {
        self.role.grants(Capability::StaffPortal)
    }

    pub fn is_superuser(&self) -> bool {
        self.role.grants(Capability::Superuser)
    }

    pub fn has_perm(&self, _perm: &str) -> bool {
        self.role.grants(Capability::ModulePermissions)
    }

    pub fn has_module_perms(&self, _app_label: &str) -> bool {
        self.role.grants(Capability::ModulePermissions)
    }

    /// Raise the role to at least `Client`. Never demotes.
    pub fn promote_to_client(&mut self) {
        self.role = self.role.max(Role::Client);
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.email)
    }
}
