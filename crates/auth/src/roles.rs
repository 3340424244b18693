//! Role tags carried by an authenticated identity.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Primary role tag of an identity. Drives routing and, partially,
/// permissions.
///
/// `Admin` is a platform-staff tag that grants user management but has no
/// dashboard of its own. `Unknown` absorbs role tags introduced after this
/// client shipped, so one unrecognized string does not invalidate a whole
/// persisted identity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    SuperAdmin,
    Admin,
    EmployerAdmin,
    CompanyUser,
    Refugee,
    #[serde(other)]
    Unknown,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::SuperAdmin => "super_admin",
            UserType::Admin => "admin",
            UserType::EmployerAdmin => "employer_admin",
            UserType::CompanyUser => "company_user",
            UserType::Refugee => "refugee",
            UserType::Unknown => "unknown",
        }
    }

    /// Total parse: unrecognized tags map to `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "super_admin" => UserType::SuperAdmin,
            "admin" => UserType::Admin,
            "employer_admin" => UserType::EmployerAdmin,
            "company_user" => UserType::CompanyUser,
            "refugee" => UserType::Refugee,
            _ => UserType::Unknown,
        }
    }

    /// Default data-protection consent for a freshly assembled identity.
    ///
    /// Refugees must consent explicitly during onboarding; staff and
    /// employer accounts are treated as consented at creation time.
    pub fn default_consent(&self) -> bool {
        matches!(
            self,
            UserType::SuperAdmin | UserType::Admin | UserType::EmployerAdmin | UserType::CompanyUser
        )
    }
}

impl core::fmt::Display for UserType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secondary role, only meaningful for `UserType::CompanyUser` identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyRole {
    CompanyAdmin,
    CompanyUser,
}

impl CompanyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyRole::CompanyAdmin => "company_admin",
            CompanyRole::CompanyUser => "company_user",
        }
    }
}

impl core::fmt::Display for CompanyRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompanyRole {
    type Err = UnknownCompanyRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "company_admin" => Ok(CompanyRole::CompanyAdmin),
            "company_user" => Ok(CompanyRole::CompanyUser),
            other => Err(UnknownCompanyRole(other.to_string())),
        }
    }
}

/// A secondary-role string outside the known pair.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown company role: {0}")]
pub struct UnknownCompanyRole(pub String);
