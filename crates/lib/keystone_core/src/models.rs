//! Session domain models.
//!
//! [`Claims`] is the only claims shape in the crate. It is produced by the
//! token codec (or from an [`AccountSnapshot`]) and consumed everywhere else.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Permission granting every action on every resource.
pub const WILDCARD_ALL: &str = "*:*";

/// Authorization claims carried by an access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub roles: BTreeSet<String>,
    /// `action:resource` strings, optionally with `*` in either position.
    pub permissions: BTreeSet<String>,
    pub is_admin: bool,
    pub tenant_id: Option<String>,
}

impl Claims {
    /// Whether `role` is one of the granted roles. Admins get no bypass here.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Whether `permission` is granted.
    ///
    /// Admins always pass. Otherwise an exact match wins, then
    /// `*:resource`, `action:*` and finally `*:*`. A permission without a
    /// `:` separator can only match exactly or through `*:*`.
    pub fn has_permission(&self, permission: &str) -> bool {
        if self.is_admin || self.permissions.contains(permission) {
            return true;
        }
        match permission.split_once(':') {
            Some((action, resource)) => [
                format!("*:{resource}"),
                format!("{action}:*"),
                WILDCARD_ALL.to_string(),
            ]
            .iter()
            .any(|candidate| self.permissions.contains(candidate)),
            None => self.permissions.contains(WILDCARD_ALL),
        }
    }
}

/// Everything extracted from a successfully decoded access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedToken {
    /// Subject (standard JWT `sub` claim).
    pub subject: String,
    pub expires_at: DateTime<Utc>,
    pub claims: Claims,
}

/// Access/refresh token pair.
///
/// Refresh endpoints that do not rotate refresh tokens leave
/// `refresh_token` empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Claims reported by the account endpoint, used when no valid token is
/// stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

impl From<AccountSnapshot> for Claims {
    fn from(snapshot: AccountSnapshot) -> Self {
        Self {
            roles: snapshot.roles.into_iter().collect(),
            permissions: snapshot.permissions.into_iter().collect(),
            is_admin: snapshot.is_admin,
            tenant_id: snapshot.tenant_id,
        }
    }
}

/// Composite access query for [`crate::access::AccessEvaluator::can_access`].
///
/// Every clause that is set must pass. `any` only switches the list clauses
/// (`permissions`, `roles`) from all-of to any-of; empty lists are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessOptions {
    pub permission: Option<String>,
    pub role: Option<String>,
    pub permissions: Vec<String>,
    pub roles: Vec<String>,
    pub any: bool,
}

impl AccessOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn any(mut self, any: bool) -> Self {
        self.any = any;
        self
    }
}

/// Navigation entry guarded by a permission string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuDescriptor {
    /// Required permission; empty or missing means unrestricted.
    pub perms: Option<String>,
    pub disabled: bool,
    pub hidden: bool,
}
