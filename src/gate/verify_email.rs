//! Email verification page.

use futures::future::BoxFuture;
use tracing::{debug, info};

use super::session::{FetchError, SessionContext};

/// Submits a verification token to the server.
pub trait EmailVerifier: Send + Sync {
    fn verify_email<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<(), FetchError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyEmailStatus {
    /// Request not finished yet.
    Pending,
    Verified,
    /// Token invalid, expired or already used.
    Failed,
    /// Already verified; leave the page without a request.
    RedirectHome,
}

impl VerifyEmailStatus {
    pub fn message(&self) -> &'static str {
        match self {
            VerifyEmailStatus::Pending => "Verifying your email...",
            VerifyEmailStatus::Verified => "Your email has been verified.",
            VerifyEmailStatus::Failed => "This verification link is invalid or has expired.",
            VerifyEmailStatus::RedirectHome => "Your email is already verified.",
        }
    }
}

/// One mount of the verification page.
///
/// Submits its token at most once; later calls to [`run`](Self::run) return
/// the settled status.
#[derive(Debug)]
pub struct VerifyEmailFlow {
    token: String,
    status: VerifyEmailStatus,
    attempted: bool,
}

impl VerifyEmailFlow {
    pub fn mount(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            status: VerifyEmailStatus::Pending,
            attempted: false,
        }
    }

    pub fn status(&self) -> VerifyEmailStatus {
        self.status
    }

    pub async fn run(
        &mut self,
        session: &SessionContext,
        verifier: &dyn EmailVerifier,
    ) -> VerifyEmailStatus {
        if self.attempted || self.status == VerifyEmailStatus::RedirectHome {
            return self.status;
        }

        let view = session.settled().await;
        if view.is_authenticated && view.is_verified {
            self.status = VerifyEmailStatus::RedirectHome;
            return self.status;
        }

        self.attempted = true;
        self.status = match verifier.verify_email(&self.token).await {
            Ok(()) => {
                info!("Email verified");
                session.revalidate();
                VerifyEmailStatus::Verified
            }
            Err(e) => {
                debug!(error = %e, "Email verification failed");
                VerifyEmailStatus::Failed
            }
        };
        self.status
    }
}
