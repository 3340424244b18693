//! Top-level screens of the client.

use serde::{Deserialize, Serialize};

/// Identifier of a top-level screen.
///
/// The UI renders exactly one of these at a time; transitions are decided by
/// the [`ViewRouter`](crate::router::ViewRouter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppView {
    Landing,
    EmployerRegistration,
    RefugeeRegistration,
    SuperAdminDashboard,
    EmployerAdminDashboard,
    RefugeeDashboard,
    JobBoard,
    UnifiedLogin,
    EmailVerification,
    UnhcrValidation,
}

impl AppView {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppView::Landing => "landing",
            AppView::EmployerRegistration => "employer-registration",
            AppView::RefugeeRegistration => "refugee-registration",
            AppView::SuperAdminDashboard => "super-admin-dashboard",
            AppView::EmployerAdminDashboard => "employer-admin-dashboard",
            AppView::RefugeeDashboard => "refugee-dashboard",
            AppView::JobBoard => "job-board",
            AppView::UnifiedLogin => "unified-login",
            AppView::EmailVerification => "email-verification",
            AppView::UnhcrValidation => "unhcr-validation",
        }
    }

    /// Dashboards force a return to the landing page on logout; every other
    /// view survives a logged-out session tick untouched.
    pub fn is_dashboard(&self) -> bool {
        matches!(
            self,
            AppView::SuperAdminDashboard
                | AppView::EmployerAdminDashboard
                | AppView::RefugeeDashboard
        )
    }
}

impl core::fmt::Display for AppView {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
