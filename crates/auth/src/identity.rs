//! The authenticated principal as the client sees it.

use serde::{Deserialize, Serialize};

use pathways_core::{AccountId, CompanyId};

use crate::roles::{CompanyRole, UserType};

/// Client-side record of the authenticated principal.
///
/// At most one of these is materialized per session store. The record is
/// trusted as delivered by the login response - the client performs no shape
/// validation, because the backend re-authorizes every request regardless of
/// what this copy claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: AccountId,
    pub email: String,
    pub user_type: UserType,

    /// Secondary role; only meaningful when `user_type` is `CompanyUser`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<CompanyRole>,

    /// Present for company-scoped identities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,

    #[serde(default)]
    pub has_consented_data_protection: bool,

    // Display-only profile fields; no invariants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl CurrentUser {
    /// Minimal identity for the given role; consent defaults per role.
    pub fn new(id: AccountId, email: impl Into<String>, user_type: UserType) -> Self {
        Self {
            id,
            email: email.into(),
            user_type,
            role: None,
            company_id: None,
            has_consented_data_protection: user_type.default_consent(),
            first_name: None,
            last_name: None,
            phone: None,
        }
    }

    /// Whether this record denotes a real signed-in principal.
    pub fn is_present(&self) -> bool {
        !self.id.is_empty()
    }
}
