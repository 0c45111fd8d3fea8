//! Authorization queries over the session's current claims.

use std::sync::Arc;

use crate::cache::ClaimsCache;
use crate::models::{AccessOptions, Claims, MenuDescriptor};

/// One role, or a list of roles of which any one suffices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleQuery<'a> {
    One(&'a str),
    Any(Vec<&'a str>),
}

impl RoleQuery<'_> {
    fn matches(&self, claims: &Claims) -> bool {
        match self {
            RoleQuery::One(role) => claims.has_role(role),
            RoleQuery::Any(roles) => roles.iter().any(|role| claims.has_role(role)),
        }
    }
}

impl<'a> From<&'a str> for RoleQuery<'a> {
    fn from(role: &'a str) -> Self {
        RoleQuery::One(role)
    }
}

impl<'a> From<&'a String> for RoleQuery<'a> {
    fn from(role: &'a String) -> Self {
        RoleQuery::One(role)
    }
}

impl<'a> From<&'a [&'a str]> for RoleQuery<'a> {
    fn from(roles: &'a [&'a str]) -> Self {
        RoleQuery::Any(roles.to_vec())
    }
}

impl<'a, const N: usize> From<&'a [&'a str; N]> for RoleQuery<'a> {
    fn from(roles: &'a [&'a str; N]) -> Self {
        RoleQuery::Any(roles.to_vec())
    }
}

impl<'a> From<&'a [String]> for RoleQuery<'a> {
    fn from(roles: &'a [String]) -> Self {
        RoleQuery::Any(roles.iter().map(String::as_str).collect())
    }
}

/// Answers role and permission questions for UI code.
///
/// Every method reads the claims cache once and never suspends. Without
/// claims every check fails, except menus that require no permission.
#[derive(Clone)]
pub struct AccessEvaluator {
    cache: Arc<ClaimsCache>,
}

impl AccessEvaluator {
    pub fn new(cache: Arc<ClaimsCache>) -> Self {
        Self { cache }
    }

    pub fn has_role<'a>(&self, roles: impl Into<RoleQuery<'a>>) -> bool {
        self.cache
            .claims()
            .is_some_and(|claims| roles.into().matches(&claims))
    }

    /// See [`Claims::has_permission`] for the matching order.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.cache
            .claims()
            .is_some_and(|claims| claims.has_permission(permission))
    }

    /// Evaluate a composite query. All set clauses must pass.
    pub fn can_access(&self, options: &AccessOptions) -> bool {
        self.cache
            .claims()
            .is_some_and(|claims| evaluate(&claims, options))
    }

    pub fn can_access_menu(&self, menu: &MenuDescriptor) -> bool {
        if menu.disabled || menu.hidden {
            return false;
        }
        let claims = self.cache.claims();
        if claims.as_ref().is_some_and(|c| c.is_admin) {
            return true;
        }
        match menu.perms.as_deref() {
            None | Some("") => true,
            Some(perms) => claims.is_some_and(|c| c.has_permission(perms)),
        }
    }

    pub fn get_roles(&self) -> Vec<String> {
        self.cache
            .claims()
            .map(|c| c.roles.into_iter().collect())
            .unwrap_or_default()
    }

    pub fn get_permissions(&self) -> Vec<String> {
        self.cache
            .claims()
            .map(|c| c.permissions.into_iter().collect())
            .unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        self.cache.claims().is_some_and(|c| c.is_admin)
    }

    pub fn tenant_id(&self) -> Option<String> {
        self.cache.claims().and_then(|c| c.tenant_id)
    }
}

fn evaluate(claims: &Claims, options: &AccessOptions) -> bool {
    if claims.is_admin {
        return true;
    }
    if let Some(permission) = &options.permission
        && !claims.has_permission(permission)
    {
        return false;
    }
    if let Some(role) = &options.role
        && !claims.has_role(role)
    {
        return false;
    }
    if !options.permissions.is_empty() {
        let mut checks = options.permissions.iter().map(|p| claims.has_permission(p));
        let passed = if options.any {
            checks.any(|ok| ok)
        } else {
            checks.all(|ok| ok)
        };
        if !passed {
            return false;
        }
    }
    if !options.roles.is_empty() {
        let mut checks = options.roles.iter().map(|r| claims.has_role(r));
        let passed = if options.any {
            checks.any(|ok| ok)
        } else {
            checks.all(|ok| ok)
        };
        if !passed {
            return false;
        }
    }
    true
}
