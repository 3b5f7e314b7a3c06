//! Client-side session state derived from the identity endpoint.
//!
//! [`SessionContext`] is the one shared source of truth for every guard. It
//! caches the last identity response, runs at most one fetch at a time, and
//! drops responses from fetches that were superseded by a newer revalidation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::db::UserRole;

/// Identity record returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub uuid: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default)]
    pub is_verified: bool,
}

/// Failure to obtain an identity. Guards never see these; they all collapse
/// to an unauthenticated view.
#[derive(Debug)]
pub enum FetchError {
    /// Transport failure (connection refused, timeout, ...)
    Network(String),
    /// Unexpected HTTP status
    Status(u16),
    /// The server refused the request with an explanation
    Rejected { status: u16, message: String },
    /// Response body did not have the expected shape
    Decode(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Network(e) => write!(f, "Network error: {}", e),
            FetchError::Status(code) => write!(f, "Unexpected status {}", code),
            FetchError::Rejected { status, message } => write!(f, "{} ({})", message, status),
            FetchError::Decode(e) => write!(f, "Invalid response: {}", e),
        }
    }
}

impl std::error::Error for FetchError {}

/// Where the current identity comes from.
///
/// `Ok(None)` means the server answered "not logged in".
pub trait IdentitySource: Send + Sync + 'static {
    fn fetch_identity(&self) -> BoxFuture<'_, Result<Option<SessionUser>, FetchError>>;
}

/// The client's belief about the current session.
///
/// While `is_loading` is true the other fields hold whatever the previous
/// fetch produced and must not be treated as authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub is_loading: bool,
    pub is_authenticated: bool,
    pub user: Option<SessionUser>,
    pub is_verified: bool,
}

impl SessionView {
    /// Nothing known yet.
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            is_authenticated: false,
            user: None,
            is_verified: false,
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            is_loading: false,
            is_authenticated: false,
            user: None,
            is_verified: false,
        }
    }

    pub fn authenticated(user: SessionUser) -> Self {
        Self {
            is_loading: false,
            is_authenticated: true,
            is_verified: user.is_verified,
            user: Some(user),
        }
    }

    /// Derive the view from an identity fetch outcome.
    pub fn from_fetch(result: Result<Option<SessionUser>, FetchError>) -> Self {
        match result {
            Ok(Some(user)) => Self::authenticated(user),
            Ok(None) => Self::unauthenticated(),
            Err(e) => {
                debug!(error = %e, "Identity fetch failed, treating as logged out");
                Self::unauthenticated()
            }
        }
    }

    /// Collapse to the guard state machine.
    pub fn state(&self) -> SessionState {
        if self.is_loading {
            return SessionState::Loading;
        }
        match (&self.user, self.is_authenticated) {
            (Some(user), true) => SessionState::Authenticated(user.role),
            _ => SessionState::Unauthenticated,
        }
    }
}

/// Session state as seen by route guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Unauthenticated,
    Authenticated(UserRole),
}

#[derive(Default)]
struct Control {
    /// Bumped on every fetch start; responses carrying an older value are dropped.
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
    settled: bool,
}

struct Shared {
    source: Arc<dyn IdentitySource>,
    view: watch::Sender<SessionView>,
    control: Mutex<Control>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, generation: u64, result: Result<Option<SessionUser>, FetchError>) {
        let mut control = self.lock();
        if control.generation != generation {
            debug!(
                generation,
                current = control.generation,
                "Discarding stale identity response"
            );
            return;
        }
        control.in_flight = None;
        control.settled = true;
        self.view.send_replace(SessionView::from_fetch(result));
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(handle) = self.lock().in_flight.take() {
            handle.abort();
        }
    }
}

/// Shared, injectable handle to the session.
///
/// Cloning is cheap and every clone observes the same cached view. Fetches
/// run on the tokio runtime, so methods that may start one must be called
/// from within a runtime. Dropping the last clone cancels any in-flight fetch.
#[derive(Clone)]
pub struct SessionContext {
    shared: Arc<Shared>,
}

impl SessionContext {
    pub fn new(source: impl IdentitySource) -> Self {
        Self::from_source(Arc::new(source))
    }

    pub fn from_source(source: Arc<dyn IdentitySource>) -> Self {
        let (view, _) = watch::channel(SessionView::loading());
        Self {
            shared: Arc::new(Shared {
                source,
                view,
                control: Mutex::new(Control::default()),
            }),
        }
    }

    /// Current view snapshot.
    pub fn view(&self) -> SessionView {
        self.shared.view.borrow().clone()
    }

    /// Receive every view transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.shared.view.subscribe()
    }

    /// Start the identity fetch unless one is running or a result is cached.
    ///
    /// Safe to call from every guard on every render; concurrent callers share
    /// one request.
    pub fn ensure_loaded(&self) {
        let mut control = self.shared.lock();
        if control.in_flight.is_some() || control.settled {
            return;
        }
        self.start_fetch(&mut control);
    }

    /// Discard the cached result and fetch again.
    ///
    /// The view re-enters loading immediately (keeping the stale user for
    /// display) and any fetch still running is cancelled.
    pub fn revalidate(&self) {
        let mut control = self.shared.lock();
        if let Some(handle) = control.in_flight.take() {
            handle.abort();
        }
        self.shared.view.send_modify(|view| view.is_loading = true);
        self.start_fetch(&mut control);
    }

    /// Wait until the view is no longer loading, starting a fetch if needed.
    pub async fn settled(&self) -> SessionView {
        self.ensure_loaded();
        let mut rx = self.subscribe();
        match rx.wait_for(|view| !view.is_loading).await {
            Ok(view) => SessionView::clone(&view),
            Err(_) => SessionView::unauthenticated(),
        }
    }

    /// Revalidate and wait for the fresh result. Use this before navigating
    /// after login or logout so guards never act on the old session.
    pub async fn revalidate_and_wait(&self) -> SessionView {
        self.revalidate();
        self.settled().await
    }

    fn start_fetch(&self, control: &mut Control) {
        control.generation += 1;
        control.settled = false;
        let generation = control.generation;

        let source = self.shared.source.clone();
        let shared = Arc::downgrade(&self.shared);
        control.in_flight = Some(tokio::spawn(async move {
            let result = source.fetch_identity().await;
            if let Some(shared) = shared.upgrade() {
                shared.apply(generation, result);
            }
        }));
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_view_state_mapping() {
        assert_eq!(SessionView::loading().state(), SessionState::Loading);
        assert_eq!(SessionView::unauthenticated().state(), SessionState::Unauthenticated);
        assert_eq!(
            SessionView::authenticated(user(UserRole::Admin, true)).state(),
            SessionState::Authenticated(UserRole::Admin)
        );
    }

    #[test]
    fn test_loading_hides_stale_user() {
        let mut view = SessionView::authenticated(user(UserRole::Admin, true));
        view.is_loading = true;
        assert_eq!(view.state(), SessionState::Loading);
    }

    #[test]
    fn test_fetch_error_is_unauthenticated() {
        let view = SessionView::from_fetch(Err(FetchError::Status(500)));
        assert_eq!(view, SessionView::unauthenticated());
    }

    #[test]
    fn test_verified_flag_follows_user() {
        let view = SessionView::authenticated(user(UserRole::User, true));
        assert!(view.is_verified);
        let view = SessionView::authenticated(user(UserRole::User, false));
        assert!(!view.is_verified);
    }

    #[tokio::test]
    async fn test_starts_loading_until_fetched() {
        let ctx = SessionContext::new(FixedSource::new(Some(user(UserRole::User, false))));
        assert!(ctx.view().is_loading);

        let view = ctx.settled().await;
        assert!(view.is_authenticated);
        assert_eq!(view.state(), SessionState::Authenticated(UserRole::User));
    }

    #[tokio::test]
    async fn test_concurrent_guards_share_one_fetch() {
        let source = FixedSource::new(Some(user(UserRole::User, true)));
        let calls = source.calls.clone();
        let ctx = SessionContext::new(source);

        let guards: Vec<SessionContext> = (0..5).map(|_| ctx.clone()).collect();
        for guard in &guards {
            guard.ensure_loaded();
        }
        let views = futures::future::join_all(guards.iter().map(|g| g.settled())).await;

        assert!(views.iter().all(|v| v.is_authenticated));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Cached: later mounts do not refetch.
        ctx.ensure_loaded();
        ctx.settled().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_revalidate_refetches() {
        let source = FixedSource::new(None);
        let calls = source.calls.clone();
        let ctx = SessionContext::new(source);

        ctx.settled().await;
        let view = ctx.revalidate_and_wait().await;
        assert!(!view.is_authenticated);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_network_error_settles_unauthenticated() {
        let ctx = SessionContext::new(FixedSource::failing());
        let view = ctx.settled().await;
        assert_eq!(view.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_superseded_response_is_discarded() {
        let (source, mut senders) = ScriptedSource::new(2);
        let calls = source.calls.clone();
        let ctx = SessionContext::new(source);

        ctx.ensure_loaded();
        tokio::task::yield_now().await;
        ctx.revalidate();
        tokio::task::yield_now().await;

        let second = senders.pop().unwrap();
        let first = senders.pop().unwrap();

        // The first fetch was cancelled, so its reply may have nowhere to go.
        let _ = first.send(Ok(Some(user(UserRole::Admin, true))));
        second.send(Ok(None)).unwrap();

        let view = ctx.settled().await;
        assert_eq!(view.state(), SessionState::Unauthenticated);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_generation_not_applied() {
        let (source, _senders) = ScriptedSource::new(1);
        let ctx = SessionContext::new(source);
        ctx.ensure_loaded();

        // Generation 1 is current; a late reply tagged 0 must be ignored.
        ctx.shared.apply(0, Ok(Some(user(UserRole::Admin, true))));
        assert!(ctx.view().is_loading);
        assert!(ctx.view().user.is_none());
    }

    #[tokio::test]
    async fn test_revalidate_keeps_stale_user_while_loading() {
        let (source, mut senders) = ScriptedSource::new(2);
        let ctx = SessionContext::new(source);

        ctx.ensure_loaded();
        senders.remove(0).send(Ok(Some(user(UserRole::Admin, true)))).unwrap();
        ctx.settled().await;

        ctx.revalidate();
        let view = ctx.view();
        assert!(view.is_loading);
        assert!(view.user.is_some());
        assert_eq!(view.state(), SessionState::Loading);

        senders.remove(0).send(Ok(None)).unwrap();
        assert_eq!(ctx.settled().await.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let ctx = SessionContext::new(FixedSource::new(Some(user(UserRole::User, false))));
        let mut rx = ctx.subscribe();
        assert!(rx.borrow().is_loading);

        ctx.ensure_loaded();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_authenticated);
    }
}
