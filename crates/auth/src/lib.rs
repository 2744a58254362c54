//! `storeledger-auth` — authentication/authorization boundary.
//!
//! Decoupled from HTTP and storage: token validation, role→permission policy
//! and the permission check itself.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod roles;

pub use authorize::{AuthzError, CommandAuthorization, Principal, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtError, JwtValidator};
pub use permissions::{Permission, permissions_for_roles};
pub use roles::Role;
