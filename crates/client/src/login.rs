//! Login trial sequence and identity assembly.
//!
//! The platform has no single "what am I" endpoint: the client tries the
//! three role-specific login endpoints in a fixed order and keeps the first
//! one that accepts the credentials.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use pathways_auth::{CompanyRole, CurrentUser, UserType, decode_claims};
use pathways_core::{AccountId, CompanyId, DomainError, Email};
use pathways_session::SessionStore;

/// Payload of a successful login call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: LoginProfile,
}

/// Profile fields of the login response body. Everything is optional or
/// defaulted: older backend versions omit fields that now live in the token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub user_type: Option<UserType>,
    #[serde(default)]
    pub role: Option<CompanyRole>,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Error)]
pub enum LoginError {
    /// The endpoint understood the request and said no; the trial moves on.
    #[error("credentials rejected")]
    Rejected,

    /// Every endpoint in the trial rejected the credentials.
    #[error("no login endpoint accepted the credentials")]
    AllRejected,

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] DomainError),

    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({0}): {1}")]
    Api(u16, String),

    #[error("malformed response body: {0}")]
    Parse(String),
}

/// One of the three role-specific login endpoints.
///
/// Callers are generic over this trait; no dyn dispatch is needed, so the
/// auto-trait caveats of `async fn` in a public trait don't bite here.
#[allow(async_fn_in_trait)]
pub trait LoginBackend {
    async fn login_super_admin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, LoginError>;

    async fn login_company(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, LoginError>;

    async fn login_refugee(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, LoginError>;
}

/// Outcome of a successful unified login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession {
    pub user: CurrentUser,
    pub access_token: String,
}

impl AuthenticatedSession {
    /// Persist this session into `store`. Token first, so a reload between
    /// the two writes never sees an identity without its token.
    pub fn establish(self, store: &SessionStore) {
        store.set_auth_token(&self.access_token);
        store.set_current_user(self.user);
    }
}

#[derive(Debug, Clone, Copy)]
enum Endpoint {
    SuperAdmin,
    Company,
    Refugee,
}

impl Endpoint {
    const TRIAL_ORDER: [Endpoint; 3] = [Endpoint::SuperAdmin, Endpoint::Company, Endpoint::Refugee];

    fn name(&self) -> &'static str {
        match self {
            Endpoint::SuperAdmin => "super_admin",
            Endpoint::Company => "company",
            Endpoint::Refugee => "refugee",
        }
    }

    /// Role assumed when neither the response body nor the token says.
    fn fallback_user_type(&self) -> UserType {
        match self {
            Endpoint::SuperAdmin => UserType::SuperAdmin,
            // The company endpoint serves admins and sub-users alike; the
            // body/claims normally disambiguate, sub-user is the safe floor.
            Endpoint::Company => UserType::CompanyUser,
            Endpoint::Refugee => UserType::Refugee,
        }
    }
}

/// Try the three role-specific endpoints in order; the first success wins.
///
/// Credential rejections fall through to the next endpoint. Transport and
/// server errors abort the whole trial: retrying a different role against a
/// dead backend only multiplies the failure.
pub async fn unified_login(
    backend: &impl LoginBackend,
    email: &str,
    password: &str,
) -> Result<AuthenticatedSession, LoginError> {
    let email = Email::new(email)?;
    let email = email.as_str();

    for endpoint in Endpoint::TRIAL_ORDER {
        let result = match endpoint {
            Endpoint::SuperAdmin => backend.login_super_admin(email, password).await,
            Endpoint::Company => backend.login_company(email, password).await,
            Endpoint::Refugee => backend.login_refugee(email, password).await,
        };

        match result {
            Ok(response) => {
                return Ok(assemble_session(response, endpoint.fallback_user_type(), email));
            }
            Err(LoginError::Rejected) => {
                tracing::debug!(endpoint = endpoint.name(), "credentials rejected; trying next");
            }
            Err(other) => return Err(other),
        }
    }

    Err(LoginError::AllRejected)
}

/// Build the client-side identity from a login response.
///
/// Body fields win; `company_id`/`role`/`user_type` fall back to the token
/// claims (company-scoped logins carry their scoping there), then to the
/// endpoint's implied role. Consent defaults per role.
fn assemble_session(
    response: LoginResponse,
    fallback_type: UserType,
    login_email: &str,
) -> AuthenticatedSession {
    let LoginResponse { access_token, user: profile } = response;

    // Best-effort enrichment; an undecodable token just contributes nothing.
    let claims = decode_claims(&access_token).unwrap_or_default();

    let user_type = profile
        .user_type
        .or_else(|| claims.user_type.as_deref().map(UserType::from_tag))
        .unwrap_or(fallback_type);

    let role = profile
        .role
        .or_else(|| claims.role.as_deref().and_then(|r| r.parse().ok()));

    let company_id = profile
        .company_id
        .or(claims.company_id)
        .map(CompanyId::new);

    let email = if profile.email.is_empty() {
        login_email.to_string()
    } else {
        profile.email
    };

    let mut user = CurrentUser::new(AccountId::new(profile.id), email, user_type);
    user.role = role;
    user.company_id = company_id;
    user.first_name = profile.first_name;
    user.last_name = profile.last_name;
    user.phone = profile.phone;

    AuthenticatedSession { user, access_token }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP backend
// ─────────────────────────────────────────────────────────────────────────────

/// `reqwest`-based implementation against the platform REST backend.
pub struct HttpLoginBackend {
    api_url: String,
    client: reqwest::Client,
}

impl HttpLoginBackend {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn post_login(
        &self,
        path: &str,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, LoginError> {
        let url = format!("{}{}", self.api_url, path);
        let body = serde_json::json!({ "email": email, "password": password });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LoginError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(LoginError::Rejected);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LoginError::Api(status.as_u16(), detail));
        }

        response
            .json()
            .await
            .map_err(|e| LoginError::Parse(e.to_string()))
    }
}

impl LoginBackend for HttpLoginBackend {
    async fn login_super_admin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, LoginError> {
        self.post_login("/auth/super-admin/login", email, password).await
    }

    async fn login_company(&self, email: &str, password: &str) -> Result<LoginResponse, LoginError> {
        self.post_login("/auth/company/login", email, password).await
    }

    async fn login_refugee(&self, email: &str, password: &str) -> Result<LoginResponse, LoginError> {
        self.post_login("/auth/refugee/login", email, password).await
    }
}
