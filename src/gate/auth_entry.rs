//! Login and register overlay.
//!
//! `/login` and `/register` are not pages. Visiting either opens the overlay
//! on the matching view and replaces the history entry with `/`.

use super::guard::Location;
use super::navigator::History;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthView {
    #[default]
    Login,
    Register,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthOverlay {
    open: bool,
    view: AuthView,
    return_to: Option<String>,
}

impl AuthOverlay {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn view(&self) -> AuthView {
        self.view
    }

    /// Where to go after a successful login, if a guard sent us here.
    pub fn return_to(&self) -> Option<&str> {
        self.return_to.as_deref()
    }

    pub fn open(&mut self, view: AuthView, return_to: Option<String>) {
        self.open = true;
        self.view = view;
        self.return_to = return_to;
    }

    /// Toggle between login and register without closing.
    pub fn switch_view(&mut self, view: AuthView) {
        self.view = view;
    }

    /// Close the overlay and hand back the pending return target.
    pub fn close(&mut self) -> Option<String> {
        self.open = false;
        self.return_to.take()
    }
}

/// Open the overlay for `view` and rewrite the current entry to `/`.
pub fn enter_auth(
    view: AuthView,
    location: &Location,
    overlay: &mut AuthOverlay,
    history: &mut History,
) {
    let return_to = location
        .from_pathname()
        .filter(|path| *path != "/")
        .map(str::to_string);
    overlay.open(view, return_to);
    history.replace(Location::new("/"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::guard::NavState;

    #[test]
    fn test_enter_register_replaces_history() {
        let mut history = History::new(Location::new("/"));
        history.push(Location::new("/register"));
        let mut overlay = AuthOverlay::default();

        let here = history.current().clone();
        enter_auth(AuthView::Register, &here, &mut overlay, &mut history);

        assert!(overlay.is_open());
        assert_eq!(overlay.view(), AuthView::Register);
        assert_eq!(history.current().pathname, "/");
        assert_eq!(history.len(), 2);
        assert_eq!(overlay.return_to(), None);
    }

    #[test]
    fn test_enter_login_keeps_origin() {
        let mut history = History::new(Location::new("/"));
        let here = Location::with_state(
            "/login",
            NavState::from_location(&Location::new("/checkout")),
        );
        history.push(here.clone());
        let mut overlay = AuthOverlay::default();

        enter_auth(AuthView::Login, &here, &mut overlay, &mut history);

        assert_eq!(overlay.view(), AuthView::Login);
        assert_eq!(overlay.return_to(), Some("/checkout"));
        assert_eq!(history.current(), &Location::new("/"));
    }

    #[test]
    fn test_close_yields_return_target() {
        let mut overlay = AuthOverlay::default();
        overlay.open(AuthView::Login, Some("/orders".to_string()));
        overlay.switch_view(AuthView::Register);
        assert_eq!(overlay.view(), AuthView::Register);

        assert_eq!(overlay.close(), Some("/orders".to_string()));
        assert!(!overlay.is_open());
        assert_eq!(overlay.close(), None);
    }
}
