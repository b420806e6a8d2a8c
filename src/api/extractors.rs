//! Request extractors shared by handlers and middleware.

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum_auth::AuthBasic;
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::state::AppState;

/// Header carrying a link password as an alternative to HTTP Basic auth.
pub const LINK_PASSWORD_HEADER: &str = "x-link-password";

/// Resolved identity of the calling client.
///
/// Used as the rate-limit key and as the audit actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

impl ClientKey {
    pub fn from_parts(parts: &Parts, state: &AppState) -> Self {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self(state.client_identity.resolve(&parts.headers, peer))
    }
}

impl FromRequestParts<AppState> for ClientKey {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts, state))
    }
}

/// Password offered for a protected link, if any.
///
/// `X-Link-Password` takes precedence over the password part of
/// `Authorization: Basic`; the Basic user name is ignored.
#[derive(Debug, Clone, Default)]
pub struct LinkPassword(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for LinkPassword {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(LINK_PASSWORD_HEADER)
            .and_then(|h| h.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        if header.is_some() {
            return Ok(Self(header));
        }

        let basic = AuthBasic::from_request_parts(parts, state)
            .await
            .ok()
            .and_then(|AuthBasic((_, password))| password)
            .filter(|p| !p.is_empty());

        Ok(Self(basic))
    }
}
