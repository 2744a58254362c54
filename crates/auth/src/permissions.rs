use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "deliveries.manage"). The wildcard
/// `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const ALL: Permission = Permission(Cow::Borrowed("*"));
    pub const PURCHASES_VIEW_OWN: Permission = Permission(Cow::Borrowed("purchases.view_own"));
    pub const PURCHASES_VIEW: Permission = Permission(Cow::Borrowed("purchases.view"));
    pub const PRODUCTS_MANAGE_OWN: Permission = Permission(Cow::Borrowed("products.manage_own"));
    pub const PRODUCTS_MANAGE: Permission = Permission(Cow::Borrowed("products.manage"));
    pub const DELIVERIES_MANAGE: Permission = Permission(Cow::Borrowed("deliveries.manage"));
    pub const DELIVERIES_MANAGE_SUPPLIER: Permission =
        Permission(Cow::Borrowed("deliveries.manage_supplier"));

    // Granted only through the wildcard.
    pub const DELIVERIES_APPROVE: Permission = Permission(Cow::Borrowed("deliveries.approve"));
    pub const STORES_MANAGE: Permission = Permission(Cow::Borrowed("stores.manage"));
    pub const STOCK_VIEW: Permission = Permission(Cow::Borrowed("stock.view"));
    pub const STOCK_TRANSFER: Permission = Permission(Cow::Borrowed("stock.transfer"));
    pub const REPORTS_VIEW: Permission = Permission(Cow::Borrowed("reports.view"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static role→permission policy.
///
/// Unknown roles grant nothing. Duplicates are removed.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    let mut out: Vec<Permission> = Vec::new();
    for role in roles {
        let granted: &[Permission] = match role.as_str() {
            "admin" => &[Permission::ALL],
            "customer" => &[Permission::PURCHASES_VIEW_OWN, Permission::PURCHASES_VIEW],
            "supplier" => &[
                Permission::PRODUCTS_MANAGE_OWN,
                Permission::DELIVERIES_MANAGE,
                Permission::DELIVERIES_MANAGE_SUPPLIER,
                Permission::PRODUCTS_MANAGE,
            ],
            _ => &[],
        };
        for p in granted {
            if !out.contains(p) {
                out.push(p.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_gets_wildcard() {
        assert_eq!(permissions_for_roles(&[Role::ADMIN]), vec![Permission::ALL]);
    }

    #[test]
    fn supplier_can_manage_deliveries_but_customer_cannot() {
        let supplier = permissions_for_roles(&[Role::SUPPLIER]);
        let customer = permissions_for_roles(&[Role::CUSTOMER]);
        assert!(supplier.contains(&Permission::DELIVERIES_MANAGE));
        assert!(!customer.contains(&Permission::DELIVERIES_MANAGE));
        assert!(customer.contains(&Permission::PURCHASES_VIEW_OWN));
        assert!(!supplier.contains(&Permission::DELIVERIES_APPROVE));
    }

    #[test]
    fn unknown_role_grants_nothing_and_duplicates_collapse() {
        assert!(permissions_for_roles(&[Role::new("auditor")]).is_empty());
        let twice = permissions_for_roles(&[Role::CUSTOMER, Role::CUSTOMER]);
        assert_eq!(twice.len(), 2);
    }
}
