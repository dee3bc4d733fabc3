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

//! # Request pipeline policies
//!
//! The ordered chain of request-wrapping checks every request passes
//! through: disabled-account enforcement, per-domain password timeout,
//! first-login-per-domain gating, pending-OpenID completion and
//! redirect-target validation. Each policy may call through, inspect and
//! rewrite the response, or short-circuit with a forced logout. Policies
//! never raise past this layer: a failed store read is logged and the
//! request proceeds as if the check passed nothing worth acting on.

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, StatusCode, header},
    middleware,
    response::Response,
};
use std::collections::HashMap;
use url::Url;

pub mod initial_login;
pub mod openid_pending;
pub mod password_timeout;
pub mod user_disabled;
pub mod valid_referrer;

use crate::config::Config;
use crate::gatehouse::ServiceState;
use crate::session::{Session, session_middleware};

pub use initial_login::initial_login;
pub use openid_pending::openid_pending_completion;
pub use password_timeout::password_timeout;
pub use user_disabled::user_disabled;
pub use valid_referrer::valid_referrer;

/// Wrap the router with the policy chain. The session layer is the
/// outermost wrapper; the policies wrap downstream in their documented
/// order, so `user_disabled` sees the request first and the response
/// last.
pub fn apply(router: Router, state: &ServiceState) -> Router {
    router
        .layer(middleware::from_fn_with_state(state.clone(), valid_referrer))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            openid_pending_completion,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), initial_login))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            password_timeout,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), user_disabled))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
}

/// The session handle of the request, when the session layer ran.
pub(crate) fn session_of(request: &Request) -> Option<Session> {
    request.extensions().get::<Session>().cloned()
}

/// Query parameters of the request, for stashing interrupted OpenID
/// requests on a forced logout.
pub(crate) fn query_params(request: &Request) -> HashMap<String, String> {
    request
        .uri()
        .query()
        .and_then(|query| serde_urlencoded::from_str(query).ok())
        .unwrap_or_default()
}

/// Home route of this provider, the landing spot of every forced
/// redirect.
pub(crate) fn home_url(config: &Config) -> Url {
    config
        .default
        .public_endpoint
        .clone()
        .unwrap_or_else(|| Url::parse("http://localhost:8080").expect("static url"))
}

/// Turn the response into a redirect to the given location, keeping the
/// rest of the headers intact.
pub(crate) fn rewrite_redirect(response: &mut Response, location: &Url) {
    *response.status_mut() = StatusCode::FOUND;
    if let Ok(value) = HeaderValue::from_str(location.as_str()) {
        response.headers_mut().insert(header::LOCATION, value);
    }
}

/// Forced logout: drop the per-user session state and land the user on
/// the home route. An interrupted OpenID request is stashed so it can be
/// answered after the next login.
pub(crate) fn force_logout(
    session: &Session,
    params: &HashMap<String, String>,
    config: &Config,
    response: &mut Response,
) {
    if params.contains_key("openid.mode") {
        session.stash_pending_openid(params.clone());
    }
    session.logout();
    rewrite_redirect(response, &home_url(config));
}
