// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

//! # Session provider
//!
//! Server-side sessions keyed by a random cookie id. The session carries
//! the keys the trust-broker core consumes: the authenticated user, the
//! stashed pending OpenID request (consume-once), the in-flight OAuth2
//! authorization state, the CSRF token and the flash-message queue.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::Response,
};
use chrono::{TimeDelta, Utc};
use rand::distr::{Alphanumeric, SampleString};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::error;

pub mod backend;
pub mod error;
#[cfg(test)]
pub mod mock;
pub mod types;
#[cfg(test)]
pub use mock::MockSessionProvider;

use crate::api::error::GatehouseApiError;
use crate::config::Config;
use crate::gatehouse::ServiceState;
use crate::session::backend::{SessionBackend, sql::SqlBackend};
use crate::session::error::SessionProviderError;
use crate::session::types::{FlashMessage, FlashQueue, SessionData};

pub use types::SessionApi;

const SESSION_ID_LENGTH: usize = 32;

#[derive(Clone, Debug)]
pub struct SessionProvider {
    backend_driver: Box<dyn SessionBackend>,
}

impl SessionProvider {
    pub fn new(config: &Config) -> Result<Self, SessionProviderError> {
        let mut backend_driver = Box::new(SqlBackend::default());
        backend_driver.set_config(config.clone());
        Ok(Self { backend_driver })
    }
}

#[async_trait]
impl SessionApi for SessionProvider {
    /// Load a live session by its cookie id.
    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn load<'a>(
        &self,
        state: &ServiceState,
        id: &'a str,
    ) -> Result<Option<SessionData>, SessionProviderError> {
        self.backend_driver.load(state, id).await
    }

    /// Persist the session state.
    #[tracing::instrument(level = "debug", skip(self, state, data))]
    async fn save(
        &self,
        state: &ServiceState,
        data: SessionData,
    ) -> Result<(), SessionProviderError> {
        self.backend_driver.save(state, data).await
    }

    /// Drop the session row.
    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn delete<'a>(
        &self,
        state: &ServiceState,
        id: &'a str,
    ) -> Result<(), SessionProviderError> {
        self.backend_driver.delete(state, id).await
    }
}

#[derive(Debug)]
struct SessionInner {
    data: SessionData,
    dirty: bool,
    /// Not persisted yet; the middleware must emit the cookie.
    fresh: bool,
}

/// Handle to the per-request session, shared between the middleware, the
/// policy chain and the handlers. Mutations mark it dirty; the middleware
/// persists it after the handler ran.
#[derive(Clone, Debug)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
}

impl Session {
    /// Fresh session with a random id.
    pub fn create(ttl_minutes: i64) -> Self {
        let data = SessionData {
            id: Alphanumeric.sample_string(&mut rand::rng(), SESSION_ID_LENGTH),
            username: None,
            pending_openid: None,
            openid_user: None,
            oauth_client_id: None,
            oauth_redirect_uri: None,
            oauth_response_type: None,
            csrf_token: None,
            flash: Vec::new(),
            expires_at: Utc::now() + TimeDelta::minutes(ttl_minutes),
        };
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                data,
                dirty: false,
                fresh: true,
            })),
        }
    }

    pub fn from_data(data: SessionData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                data,
                dirty: false,
                fresh: false,
            })),
        }
    }

    pub fn id(&self) -> String {
        self.inner.lock().unwrap().data.id.clone()
    }

    pub fn username(&self) -> Option<String> {
        self.inner.lock().unwrap().data.username.clone()
    }

    /// Record a completed login. Also marks the user id for a pending
    /// OpenID completion, the way the login flow used to set both keys.
    pub fn login<S: Into<String>>(&self, username: S) {
        let mut inner = self.inner.lock().unwrap();
        let username = username.into();
        inner.data.username = Some(username.clone());
        inner.data.openid_user = Some(username);
        inner.dirty = true;
    }

    /// Forced or voluntary logout: drop the authenticated user and any
    /// in-flight per-user state, keep the flash queue so the user sees why.
    pub fn logout(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.data.username = None;
        inner.data.openid_user = None;
        inner.data.oauth_client_id = None;
        inner.data.oauth_redirect_uri = None;
        inner.data.oauth_response_type = None;
        inner.dirty = true;
    }

    /// Stash a checkid request awaiting login. Only the first request is
    /// kept until it is consumed; returns whether this one was stashed.
    pub fn stash_pending_openid(&self, params: HashMap<String, String>) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.data.pending_openid.is_some() {
            return false;
        }
        inner.data.pending_openid = Some(params);
        inner.dirty = true;
        true
    }

    pub fn has_pending_openid(&self) -> bool {
        self.inner.lock().unwrap().data.pending_openid.is_some()
    }

    /// Consume-once accessor for the completion state: returns the stashed
    /// request and the freshly authenticated user only when both are
    /// present, clearing both. A crash after this point loses the pending
    /// request; it is intentionally not idempotent.
    pub fn take_openid_completion(&self) -> Option<(HashMap<String, String>, String)> {
        let mut inner = self.inner.lock().unwrap();
        if inner.data.pending_openid.is_some() && inner.data.openid_user.is_some() {
            let params = inner.data.pending_openid.take().unwrap();
            let user = inner.data.openid_user.take().unwrap();
            inner.dirty = true;
            Some((params, user))
        } else {
            None
        }
    }

    pub fn set_oauth_flow<S: Into<String>>(
        &self,
        client_id: S,
        redirect_uri: S,
        response_type: Option<String>,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner.data.oauth_client_id = Some(client_id.into());
        inner.data.oauth_redirect_uri = Some(redirect_uri.into());
        inner.data.oauth_response_type = response_type;
        inner.dirty = true;
    }

    pub fn oauth_client_id(&self) -> Option<String> {
        self.inner.lock().unwrap().data.oauth_client_id.clone()
    }

    pub fn oauth_redirect_uri(&self) -> Option<String> {
        self.inner.lock().unwrap().data.oauth_redirect_uri.clone()
    }

    /// Get or create the CSRF token of this session.
    pub fn csrf_token(&self) -> String {
        let mut inner = self.inner.lock().unwrap();
        if let Some(token) = &inner.data.csrf_token {
            return token.clone();
        }
        let token = Alphanumeric.sample_string(&mut rand::rng(), SESSION_ID_LENGTH);
        inner.data.csrf_token = Some(token.clone());
        inner.dirty = true;
        token
    }

    pub fn flash_error<S: Into<String>>(&self, message: S) {
        self.flash(FlashQueue::Error, message);
    }

    pub fn flash<S: Into<String>>(&self, queue: FlashQueue, message: S) {
        let mut inner = self.inner.lock().unwrap();
        inner.data.flash.push(FlashMessage {
            queue,
            message: message.into(),
        });
        inner.dirty = true;
    }

    /// Drain the flash queue.
    pub fn take_flash(&self) -> Vec<FlashMessage> {
        let mut inner = self.inner.lock().unwrap();
        if inner.data.flash.is_empty() {
            return Vec::new();
        }
        inner.dirty = true;
        std::mem::take(&mut inner.data.flash)
    }

    fn snapshot(&self) -> (SessionData, bool, bool) {
        let inner = self.inner.lock().unwrap();
        (inner.data.clone(), inner.dirty, inner.fresh)
    }
}

impl FromRequestParts<ServiceState> for Session {
    type Rejection = GatehouseApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| GatehouseApiError::InternalError("session layer missing".to_string()))
    }
}

fn session_id_from_cookies(headers: &axum::http::HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name == cookie_name).then(|| value.to_string())
            })
        })
}

/// Outermost request layer: resolves the session from the cookie (or
/// creates one), exposes it through request extensions, and persists it
/// after the downstream stack ran. A failed save is logged and absorbed;
/// the response still reaches the client.
pub async fn session_middleware(
    State(state): State<ServiceState>,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_name = state.config.session.cookie_name.clone();
    let session = match session_id_from_cookies(request.headers(), &cookie_name) {
        Some(id) => match state.provider.get_session_provider().load(&state, &id).await {
            Ok(Some(data)) => Some(Session::from_data(data)),
            Ok(None) => None,
            Err(err) => {
                error!("Failed to load the session: {}", err);
                None
            }
        },
        None => None,
    };
    let session =
        session.unwrap_or_else(|| Session::create(state.config.session.ttl_minutes));

    request.extensions_mut().insert(session.clone());
    let mut response = next.run(request).await;

    let (data, dirty, fresh) = session.snapshot();
    if dirty || fresh {
        if let Err(err) = state.provider.get_session_provider().save(&state, data).await {
            error!("Failed to persist the session: {}", err);
        }
    }
    if fresh {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            cookie_name,
            session.id()
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_openid_stash_is_single_shot() {
        let session = Session::create(30);
        let first = HashMap::from([("openid.mode".to_string(), "checkid_setup".to_string())]);
        let second = HashMap::from([("openid.mode".to_string(), "checkid_immediate".to_string())]);

        assert!(session.stash_pending_openid(first.clone()));
        // A second request must not displace the pending one.
        assert!(!session.stash_pending_openid(second));

        // Completion requires the freshly authenticated user as well.
        assert!(session.take_openid_completion().is_none());

        session.login("frodo");
        let (params, user) = session.take_openid_completion().unwrap();
        assert_eq!(first, params);
        assert_eq!("frodo", user);

        // Consumed exactly once.
        assert!(session.take_openid_completion().is_none());
    }

    #[test]
    fn test_logout_clears_user_state_keeps_flash() {
        let session = Session::create(30);
        session.login("frodo");
        session.set_oauth_flow("rp.example.com", "https://rp.example.com/cb", None);
        session.flash_error("You must log in again");

        session.logout();
        assert!(session.username().is_none());
        assert!(session.oauth_client_id().is_none());
        let flash = session.take_flash();
        assert_eq!(1, flash.len());
        assert!(session.take_flash().is_empty());
    }

    #[test]
    fn test_csrf_token_is_sticky() {
        let session = Session::create(30);
        let token = session.csrf_token();
        assert_eq!(token, session.csrf_token());
        assert_eq!(SESSION_ID_LENGTH, token.len());
    }

    #[test]
    fn test_session_id_from_cookies() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "other=1; gatehouse_session=abc123; trail=x".parse().unwrap(),
        );
        assert_eq!(
            Some("abc123".to_string()),
            session_id_from_cookies(&headers, "gatehouse_session")
        );
        assert_eq!(None, session_id_from_cookies(&headers, "missing"));
    }
}
