//! HTTP client for the auth API.
//!
//! The session cookie lives in the client's cookie store, so credentials are
//! sent with every request the same way a browser would.

use futures::future::BoxFuture;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::session::{FetchError, IdentitySource, SessionUser};
use super::verify_email::EmailVerifier;

#[derive(Deserialize)]
struct UserEnvelope {
    user: SessionUser,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone)]
pub struct HttpApi {
    base: Url,
    client: Client,
}

impl HttpApi {
    /// `base` is the API root, e.g. `http://127.0.0.1:5000/api`.
    pub fn new(base: &str) -> Result<Self, FetchError> {
        let mut base = Url::parse(base).map_err(|e| FetchError::Network(e.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self { base, client })
    }

    fn url(&self, path: &str) -> Result<Url, FetchError> {
        self.base
            .join(path)
            .map_err(|e| FetchError::Network(e.to_string()))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<SessionUser, FetchError> {
        let response = self
            .client
            .post(self.url("auth/login")?)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(network)?;
        read_user(response).await
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<SessionUser, FetchError> {
        let response = self
            .client
            .post(self.url("auth/register")?)
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await
            .map_err(network)?;
        read_user(response).await
    }

    pub async fn logout(&self) -> Result<(), FetchError> {
        let response = self
            .client
            .post(self.url("auth/logout")?)
            .send()
            .await
            .map_err(network)?;
        ensure_success(response).await.map(|_| ())
    }

    async fn me(&self) -> Result<Option<SessionUser>, FetchError> {
        let response = self
            .client
            .get(self.url("auth/me")?)
            .send()
            .await
            .map_err(network)?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        read_user(response).await.map(Some)
    }

    async fn submit_verification(&self, token: &str) -> Result<(), FetchError> {
        let mut url = self.url("auth/verify-email/")?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Network("API base cannot hold a path".to_string()))?
            .pop_if_empty()
            .push(token);
        let response = self.client.get(url).send().await.map_err(network)?;
        ensure_success(response).await.map(|_| ())
    }
}

impl IdentitySource for HttpApi {
    fn fetch_identity(&self) -> BoxFuture<'_, Result<Option<SessionUser>, FetchError>> {
        Box::pin(self.me())
    }
}

impl EmailVerifier for HttpApi {
    fn verify_email<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<(), FetchError>> {
        Box::pin(self.submit_verification(token))
    }
}

fn network(e: reqwest::Error) -> FetchError {
    FetchError::Network(e.to_string())
}

async fn ensure_success(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match response.json::<ErrorBody>().await {
        Ok(body) => Err(FetchError::Rejected {
            status: status.as_u16(),
            message: body.error,
        }),
        Err(_) => Err(FetchError::Status(status.as_u16())),
    }
}

async fn read_user(response: Response) -> Result<SessionUser, FetchError> {
    let response = ensure_success(response).await?;
    response
        .json::<UserEnvelope>()
        .await
        .map(|envelope| envelope.user)
        .map_err(|e| FetchError::Decode(e.to_string()))
}
