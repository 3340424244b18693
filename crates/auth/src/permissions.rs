//! User-management capability derivation.

use crate::identity::CurrentUser;
use crate::roles::{CompanyRole, UserType};

/// Whether `user` may manage the user accounts of their company.
///
/// Employer admins pass unconditionally, whatever their secondary role
/// says: the account that created the company keeps its rights. Company
/// users need the `company_admin` secondary role. Platform admins and
/// super-admins always pass.
///
/// Pure policy check: no IO, no panics.
pub fn can_manage_users(user: Option<&CurrentUser>) -> bool {
    let Some(user) = user else {
        return false;
    };

    match user.user_type {
        UserType::EmployerAdmin => true,
        UserType::CompanyUser => user.role == Some(CompanyRole::CompanyAdmin),
        UserType::Admin | UserType::SuperAdmin => true,
        UserType::Refugee | UserType::Unknown => false,
    }
}
