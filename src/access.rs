//! IP allow-list for administrative endpoints
//!
//! The caller's address is the first entry of `X-Forwarded-For` when the
//! server sits behind a proxy, otherwise the socket peer address.

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::state::AppState;

/// Addresses allowed through the gate
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    ips: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(ips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ips: ips.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_allowed(&self, ip: &str) -> bool {
        self.ips.contains(ip)
    }
}

/// Resolve the caller's address from proxy headers or the peer socket
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    match forwarded {
        Some(ip) => Some(ip.to_string()),
        None => peer.map(|addr| addr.ip().to_string()),
    }
}

/// Middleware rejecting callers outside the allow-list with 403
pub async fn require_allowed_ip(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(request.headers(), peer);

    match ip {
        Some(ip) if state.allow_list().is_allowed(&ip) => next.run(request).await,
        Some(ip) => {
            tracing::warn!(client_ip = %ip, path = %request.uri().path(), "Access denied");
            AppError::Forbidden(format!("Access denied for IP address: {}", ip)).into_response()
        }
        None => {
            tracing::warn!(path = %request.uri().path(), "Access denied: unknown client address");
            AppError::Forbidden("Access denied: unknown client address".to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_allow_list() {
        let list = AllowList::new(["127.0.0.1", "10.0.0.7"]);
        assert!(list.is_allowed("127.0.0.1"));
        assert!(!list.is_allowed("10.0.0.8"));
        assert!(!AllowList::default().is_allowed("127.0.0.1"));
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(" 203.0.113.9 , 10.0.0.1"));
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();

        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let peer: SocketAddr = "[::1]:5000".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)).as_deref(), Some("::1"));
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }
}
