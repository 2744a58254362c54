use thiserror::Error;

use storeledger_core::UserId;

use crate::{Permission, Role, permissions_for_roles};

/// A fully resolved principal for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl Principal {
    /// Resolve permissions from roles via the static policy.
    pub fn from_roles(user_id: UserId, roles: Vec<Role>) -> Self {
        let permissions = permissions_for_roles(&roles);
        Self {
            user_id,
            roles,
            permissions,
        }
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn is_admin(&self) -> bool {
        self.permissions.iter().any(Permission::is_wildcard)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Command-side authorization contract.
///
/// The API layer checks these before invoking a service.
pub trait CommandAuthorization {
    fn required_permissions(&self) -> &[Permission];
}

/// Pure permission check: no IO, no panics.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let granted = principal
        .permissions
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if granted {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_is_allowed_everything() {
        let p = Principal::from_roles(UserId::new(), vec![Role::ADMIN]);
        assert!(p.is_admin());
        assert!(authorize(&p, &Permission::DELIVERIES_MANAGE).is_ok());
        assert!(authorize(&p, &Permission::new("stock.transfer")).is_ok());
    }

    #[test]
    fn customer_cannot_manage_deliveries() {
        let p = Principal::from_roles(UserId::new(), vec![Role::CUSTOMER]);
        assert_eq!(
            authorize(&p, &Permission::DELIVERIES_MANAGE),
            Err(AuthzError::Forbidden("deliveries.manage".into()))
        );
        assert!(authorize(&p, &Permission::PURCHASES_VIEW_OWN).is_ok());
    }
}
