//! Session-driven view selection.

use pathways_auth::UserType;
use pathways_session::SessionState;

use crate::view::AppView;

/// Deep-link intent captured from the mount-time URL query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLink {
    /// Either `EmailVerification` or `UnhcrValidation`.
    pub view: AppView,
    /// Percent-decoded address the link was mailed to.
    pub email: String,
}

/// What the one-time mount check decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountOutcome {
    pub deep_link: Option<DeepLink>,
    /// Query string that should remain visible in the URL - empty when a
    /// deep link matched and was captured.
    pub remaining_query: String,
}

/// Chooses the top-level screen from session state and mount-time URL
/// intent.
///
/// Session ticks received while the store is still loading are ignored, so
/// the landing page never flashes before the persisted session is known.
#[derive(Debug)]
pub struct ViewRouter {
    view: AppView,
    mounted: bool,
}

impl ViewRouter {
    pub fn new() -> Self {
        Self {
            view: AppView::Landing,
            mounted: false,
        }
    }

    pub fn current_view(&self) -> AppView {
        self.view
    }

    /// One-time mount hook. Inspects `query` (the URL query string, with or
    /// without the leading `?`) for out-of-band deep-link triggers; a match
    /// takes precedence over whatever session state says at mount time.
    /// Calls after the first are no-ops.
    pub fn mount(&mut self, query: &str) -> MountOutcome {
        if self.mounted {
            return MountOutcome {
                deep_link: None,
                remaining_query: query.to_string(),
            };
        }
        self.mounted = true;

        match parse_deep_link(query) {
            Some(link) => {
                self.view = link.view;
                MountOutcome {
                    deep_link: Some(link),
                    remaining_query: String::new(),
                }
            }
            None => MountOutcome {
                deep_link: None,
                remaining_query: query.to_string(),
            },
        }
    }

    /// Re-evaluate the visible view against a session snapshot.
    ///
    /// Logged out only forces a transition when a dashboard is showing, so a
    /// user mid-registration is not kicked back to landing by an unrelated
    /// session tick.
    pub fn sync_session(&mut self, state: &SessionState) {
        let SessionState::Ready(user) = state else {
            return;
        };

        match user {
            Some(user) if user.is_present() => {
                match dashboard_for(user.user_type) {
                    Some(dashboard) => self.view = dashboard,
                    None => {
                        tracing::warn!(user_type = %user.user_type, "no dashboard for user type; staying put");
                    }
                }
            }
            _ => {
                if self.view.is_dashboard() {
                    self.view = AppView::Landing;
                }
            }
        }
    }

    /// Route straight off a login response, without a store round-trip.
    pub fn handle_login_success(&mut self, user_type: UserType) {
        match dashboard_for(user_type) {
            Some(dashboard) => self.view = dashboard,
            None => {
                tracing::warn!(user_type = %user_type, "login succeeded for user type with no dashboard");
            }
        }
    }

    /// UI-driven transition (registration flows, job board, login screen).
    pub fn navigate(&mut self, view: AppView) {
        self.view = view;
    }
}

impl Default for ViewRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Dashboard for a role tag; `None` for tags with no dashboard of their own.
pub fn dashboard_for(user_type: UserType) -> Option<AppView> {
    match user_type {
        UserType::SuperAdmin => Some(AppView::SuperAdminDashboard),
        UserType::EmployerAdmin | UserType::CompanyUser => Some(AppView::EmployerAdminDashboard),
        UserType::Refugee => Some(AppView::RefugeeDashboard),
        UserType::Admin | UserType::Unknown => None,
    }
}

/// Parse the two recognized deep-link triggers out of a raw query string.
/// Both the action and an email are required for a match.
fn parse_deep_link(query: &str) -> Option<DeepLink> {
    let mut action = None;
    let mut email = None;

    for pair in query.trim_start_matches('?').split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let Ok(value) = urlencoding::decode(value) else {
            continue;
        };
        match key {
            "action" => action = Some(value.into_owned()),
            "email" => email = Some(value.into_owned()),
            _ => {}
        }
    }

    let view = match action.as_deref() {
        Some("verify") => AppView::EmailVerification,
        Some("unhcr-validate") => AppView::UnhcrValidation,
        _ => return None,
    };

    Some(DeepLink { view, email: email? })
}
