//! Client-side session gate.
//!
//! Decides, from a cached server-confirmed identity, whether a route renders,
//! shows a loading state, or redirects. The server stays the authority; this
//! only keeps the UI from showing pages the visitor cannot use.

mod auth_entry;
mod guard;
mod http;
mod navigator;
mod routes;
mod session;
mod verify_email;

pub use auth_entry::{AuthOverlay, AuthView, enter_auth};
pub use guard::{GuardDecision, Location, NavState, Redirect, RouteRequirement, evaluate};
pub use http::HttpApi;
pub use navigator::{History, Navigator, Outcome};
pub use routes::{Page, RouteMatch, RouteRecord, RouteTable, storefront_routes};
pub use session::{
    FetchError, IdentitySource, SessionContext, SessionState, SessionUser, SessionView,
};
pub use verify_email::{EmailVerifier, VerifyEmailFlow, VerifyEmailStatus};
