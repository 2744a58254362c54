//! API-side authorization guard for commands.
//!
//! Checked at the route boundary before any service is invoked, keeping
//! domain crates and infra auth-agnostic.

use storeledger_auth::{AuthzError, CommandAuthorization, Principal, authorize};

use crate::context::PrincipalContext;

pub fn principal_of(ctx: &PrincipalContext) -> Principal {
    Principal::from_roles(ctx.user_id(), ctx.roles().to_vec())
}

/// Check authorization for a command in the current request context.
pub fn authorize_command<C: CommandAuthorization>(
    ctx: &PrincipalContext,
    command: &C,
) -> Result<(), AuthzError> {
    let principal = principal_of(ctx);
    for perm in command.required_permissions() {
        authorize(&principal, perm)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use storeledger_auth::{Permission, Role};
    use storeledger_core::UserId;

    use crate::app::routes::common::CmdAuth;

    #[test]
    fn supplier_can_register_deliveries_but_not_approve() {
        let ctx = PrincipalContext::new(UserId::new(), vec![Role::SUPPLIER]);
        let register = CmdAuth::new((), vec![Permission::DELIVERIES_MANAGE_SUPPLIER]);
        let approve = CmdAuth::new((), vec![Permission::DELIVERIES_APPROVE]);

        assert!(authorize_command(&ctx, &register).is_ok());
        assert!(matches!(
            authorize_command(&ctx, &approve),
            Err(AuthzError::Forbidden(p)) if p == "deliveries.approve"
        ));
    }
}
