//! Client navigation: history, route resolution and guard redirects.

use tracing::{debug, warn};

use super::auth_entry::{AuthOverlay, enter_auth};
use super::guard::{GuardDecision, Location, evaluate};
use super::routes::{Page, RouteTable};
use super::session::{SessionContext, SessionView};

/// Redirect chains longer than this are treated as a loop.
const MAX_REDIRECTS: usize = 8;

/// Browser-style history stack.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Location>,
    index: usize,
}

impl History {
    pub fn new(initial: Location) -> Self {
        Self {
            entries: vec![initial],
            index: 0,
        }
    }

    pub fn current(&self) -> &Location {
        &self.entries[self.index]
    }

    /// Push a new entry, discarding any forward entries.
    pub fn push(&mut self, location: Location) {
        self.entries.truncate(self.index + 1);
        self.entries.push(location);
        self.index = self.entries.len() - 1;
    }

    pub fn replace(&mut self, location: Location) {
        self.entries[self.index] = location;
    }

    /// Step back one entry; returns false at the start of history.
    pub fn back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What the router shows for the current history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Render {
        page: Page,
        params: Vec<(String, String)>,
        location: Location,
    },
    /// A guard is waiting for the session to resolve.
    Loading { location: Location },
    /// Nothing matched, or redirects did not converge.
    Nothing,
}

impl Outcome {
    pub fn page(&self) -> Option<Page> {
        match self {
            Outcome::Render { page, .. } => Some(*page),
            _ => None,
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        match self {
            Outcome::Render { params, .. } => params
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }
}

pub struct Navigator {
    routes: RouteTable<Page>,
    session: SessionContext,
    history: History,
    overlay: AuthOverlay,
}

impl Navigator {
    /// Start at `/`.
    pub fn new(routes: RouteTable<Page>, session: SessionContext) -> Self {
        Self {
            routes,
            session,
            history: History::new(Location::new("/")),
            overlay: AuthOverlay::default(),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn location(&self) -> &Location {
        self.history.current()
    }

    pub fn overlay(&self) -> &AuthOverlay {
        &self.overlay
    }

    /// Follow a link.
    pub fn navigate(&mut self, pathname: &str) -> Outcome {
        self.history.push(Location::new(pathname));
        self.render()
    }

    /// Navigate without adding a history entry.
    pub fn replace(&mut self, pathname: &str) -> Outcome {
        self.history.replace(Location::new(pathname));
        self.render()
    }

    /// Browser back button. `None` at the start of history.
    pub fn back(&mut self) -> Option<Outcome> {
        if !self.history.back() {
            return None;
        }
        Some(self.render())
    }

    /// Resolve the current entry, applying guard redirects until a page renders.
    pub fn render(&mut self) -> Outcome {
        self.session.ensure_loaded();

        for _ in 0..MAX_REDIRECTS {
            let location = self.history.current().clone();
            let Some(matched) = self.routes.resolve(&location.pathname) else {
                return Outcome::Nothing;
            };
            let requirement = matched.record.requirement;
            let page = matched.record.component;
            let params = matched.params;

            match evaluate(requirement, self.session.view().state(), &location) {
                GuardDecision::Loading => return Outcome::Loading { location },
                GuardDecision::Redirect(redirect) => {
                    debug!(from = %location.pathname, to = %redirect.to, "Guard redirect");
                    if redirect.replace {
                        self.history.replace(redirect.location());
                    } else {
                        self.history.push(redirect.location());
                    }
                }
                GuardDecision::Render => match page {
                    Page::AuthEntry(view) => {
                        enter_auth(view, &location, &mut self.overlay, &mut self.history);
                    }
                    page => {
                        return Outcome::Render {
                            page,
                            params,
                            location,
                        };
                    }
                },
            }
        }

        warn!(path = %self.history.current().pathname, "Redirect loop, rendering nothing");
        Outcome::Nothing
    }

    /// Wait for the session to resolve, then render.
    pub async fn settle(&mut self) -> Outcome {
        self.session.settled().await;
        self.render()
    }

    /// Call after the login or register request succeeded.
    ///
    /// Closes the overlay, waits for the refreshed identity, then moves on to
    /// the page a guard originally turned the visitor away from.
    pub async fn complete_login(&mut self) -> (SessionView, Outcome) {
        let return_to = self.overlay.close();
        let view = self.session.revalidate_and_wait().await;
        if let Some(path) = return_to {
            self.history.push(Location::new(path));
        }
        (view, self.render())
    }

    /// Call after the logout request succeeded.
    pub async fn complete_logout(&mut self) -> (SessionView, Outcome) {
        let view = self.session.revalidate_and_wait().await;
        (view, self.render())
    }
}
