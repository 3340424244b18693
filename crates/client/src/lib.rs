//! `pathways-client` — view routing and login flow of the client shell.
//!
//! Everything here sits between the session core and the (out-of-tree) UI:
//! which top-level screen to show, and how an identity gets established in
//! the first place.

pub mod login;
pub mod router;
pub mod view;

pub use login::{
    AuthenticatedSession, HttpLoginBackend, LoginBackend, LoginError, LoginProfile, LoginResponse,
    unified_login,
};
pub use router::{DeepLink, MountOutcome, ViewRouter};
pub use view::AppView;
