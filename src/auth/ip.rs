//! Client IP extraction utilities.

use std::net::SocketAddr;

use axum::{extract::ConnectInfo, http::request::Parts};

/// Trait for types that provide access to HTTP headers and extensions.
/// Implemented for both `Parts` and `Request` to allow flexible IP extraction.
pub trait HasHeadersAndExtensions {
    fn headers(&self) -> &axum::http::HeaderMap;
    fn extensions(&self) -> &axum::http::Extensions;
}

impl HasHeadersAndExtensions for Parts {
    fn headers(&self) -> &axum::http::HeaderMap {
        &self.headers
    }
    fn extensions(&self) -> &axum::http::Extensions {
        &self.extensions
    }
}

impl<B> HasHeadersAndExtensions for axum::extract::Request<B> {
    fn headers(&self) -> &axum::http::HeaderMap {
        axum::extract::Request::headers(self)
    }
    fn extensions(&self) -> &axum::http::Extensions {
        axum::extract::Request::extensions(self)
    }
}

/// Extract client IP address based on configuration.
///
/// If `ip_header` is set (e.g. `X-Forwarded-For` behind a proxy), the first
/// address in that header is used and a missing header is an error; there is
/// no fallback to the socket address, which would be the proxy's.
///
/// If `ip_header` is None, uses the SocketAddr from ConnectInfo.
pub fn extract_client_ip<T: HasHeadersAndExtensions>(
    source: &T,
    ip_header: Option<&str>,
) -> Result<String, &'static str> {
    match ip_header {
        Some(name) => {
            let header_value = source
                .headers()
                .get(name)
                .ok_or("IP header not present")?
                .to_str()
                .map_err(|_| "IP header contains invalid characters")?;
            let first = header_value
                .split(',')
                .next()
                .map(str::trim)
                .unwrap_or_default();
            first
                .parse::<std::net::IpAddr>()
                .map(|ip| ip.to_string())
                .map_err(|_| "IP header does not contain an IP address")
        }
        None => source
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string())
            .ok_or("No client IP available"),
    }
}
