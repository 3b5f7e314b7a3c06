//! Route guard decisions.

use crate::db::UserRole;

use super::session::SessionState;

/// Access requirement attached to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRequirement {
    /// Rendered regardless of session state.
    Open,
    /// Only for visitors who are not logged in (login, register).
    PublicOnly,
    /// Any authenticated user.
    Authenticated,
    /// Authenticated user with exactly this role.
    Role(UserRole),
}

/// A history entry: a path plus optional navigation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub pathname: String,
    pub state: Option<NavState>,
}

impl Location {
    pub fn new(pathname: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            state: None,
        }
    }

    pub fn with_state(pathname: impl Into<String>, state: NavState) -> Self {
        Self {
            pathname: pathname.into(),
            state: Some(state),
        }
    }

    /// Path the visitor was originally headed to, if a guard recorded one.
    pub fn from_pathname(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.from.pathname.as_str())
    }
}

/// Navigation state carried through a redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavState {
    /// The location the visitor tried to reach.
    pub from: Box<Location>,
}

impl NavState {
    pub fn from_location(location: &Location) -> Self {
        Self {
            from: Box::new(location.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
    pub state: Option<NavState>,
    /// Guard redirects replace the current history entry.
    pub replace: bool,
}

impl Redirect {
    fn replace(to: impl Into<String>, state: Option<NavState>) -> Self {
        Self {
            to: to.into(),
            state,
            replace: true,
        }
    }

    pub fn location(&self) -> Location {
        Location {
            pathname: self.to.clone(),
            state: self.state.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Render,
    /// Show a loading indicator and nothing else.
    Loading,
    Redirect(Redirect),
}

/// Decide what a guarded route does for the current session.
///
/// Loading always wins: no redirect is issued until the session has resolved.
pub fn evaluate(
    requirement: RouteRequirement,
    session: SessionState,
    location: &Location,
) -> GuardDecision {
    if requirement == RouteRequirement::Open {
        return GuardDecision::Render;
    }

    match (requirement, session) {
        (_, SessionState::Loading) => GuardDecision::Loading,

        (RouteRequirement::PublicOnly, SessionState::Unauthenticated) => GuardDecision::Render,
        (RouteRequirement::PublicOnly, SessionState::Authenticated(_)) => {
            let to = location.from_pathname().unwrap_or("/");
            GuardDecision::Redirect(Redirect::replace(to, None))
        }

        (_, SessionState::Unauthenticated) => GuardDecision::Redirect(Redirect::replace(
            "/login",
            Some(NavState::from_location(location)),
        )),

        (RouteRequirement::Role(required), SessionState::Authenticated(role))
            if role != required =>
        {
            GuardDecision::Redirect(Redirect::replace("/", None))
        }

        (_, SessionState::Authenticated(_)) => GuardDecision::Render,
    }
}
