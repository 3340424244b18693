//! Storage keys owned by the session store.

/// Serialized `CurrentUser` record.
pub const CURRENT_USER: &str = "pathways.current_user";

/// Raw bearer token as returned by the login endpoint.
pub const AUTH_TOKEN: &str = "pathways.auth_token";

/// Email address last sent through UNHCR validation. Written by the
/// validation deep-link flow; only ever erased here.
pub const VALIDATION_EMAIL: &str = "pathways.validation_email";

/// Cached API responses. Written by the UI layer; only ever erased here.
pub const API_CACHE: &str = "pathways.api_cache";

/// Every key the store erases on logout.
pub const MANAGED: [&str; 4] = [CURRENT_USER, AUTH_TOKEN, VALIDATION_EMAIL, API_CACHE];
