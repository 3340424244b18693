//! `pathways-auth` — pure identity/permission boundary of the client core.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod claims;
pub mod identity;
pub mod permissions;
pub mod roles;

pub use claims::{TokenClaims, TokenDecodeError, TokenExpiry, decode_claims, evaluate_expiry};
pub use identity::CurrentUser;
pub use permissions::can_manage_users;
pub use roles::{CompanyRole, UserType};
