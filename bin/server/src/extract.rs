//! Request extractors.

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use std::convert::Infallible;
use std::net::SocketAddr;

/// Key used when the caller's address is unknown.
pub const FALLBACK_CLIENT_KEY: &str = "127.0.0.1";

/// The caller's network identity, used as the rate limit bucket.
///
/// Taken from the first `X-Forwarded-For` entry, then the peer address,
/// then [`FALLBACK_CLIENT_KEY`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

impl<S> FromRequestParts<S> for ClientKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(forwarded) = forwarded {
            return Ok(Self(forwarded.to_string()));
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        Ok(Self(peer.unwrap_or_else(|| FALLBACK_CLIENT_KEY.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn key_for(request: Request<()>) -> String {
        let (mut parts, ()) = request.into_parts();
        let ClientKey(key) = ClientKey::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        key
    }

    #[tokio::test]
    async fn first_forwarded_entry_wins() {
        let request = Request::builder()
            .header("x-forwarded-for", " 203.0.113.7 , 10.0.0.1")
            .body(())
            .unwrap();
        assert_eq!(key_for(request).await, "203.0.113.7");
    }

    #[tokio::test]
    async fn peer_address_is_used_without_header() {
        let mut request = Request::builder().body(()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 4], 5123))));
        assert_eq!(key_for(request).await, "192.0.2.4");
    }

    #[tokio::test]
    async fn unknown_caller_uses_fallback() {
        let request = Request::builder()
            .header("x-forwarded-for", "")
            .body(())
            .unwrap();
        assert_eq!(key_for(request).await, FALLBACK_CLIENT_KEY);
    }
}
