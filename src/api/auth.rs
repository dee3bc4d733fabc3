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
//! # Login and logout
//!
//! The credential-backed login the checkid flow redirects to. A
//! successful login records a `login` activity carrying the referring
//! domain; the lockout threshold of that domain applies to failures.

use axum::{
    Json,
    extract::{Form, State},
    http::HeaderMap,
};
use tracing::info;

use crate::activity::{
    ActivityApi,
    types::{ActivityKind, ActivityRecordBuilder},
};
use crate::api::error::GatehouseApiError;
use crate::api::types::{LoginForm, LoginResponse};
use crate::common::referrer_domain;
use crate::gatehouse::ServiceState;
use crate::identity::{IdentityApi, types::UserPasswordAuthRequestBuilder};
use crate::registry::RegistryApi;
use crate::session::Session;

/// Authenticate with username and password.
#[utoipa::path(
    post,
    path = "/auth/login",
    description = "Password login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = OK, description = "Logged in", body = LoginResponse),
        (status = UNAUTHORIZED, description = "Invalid credentials or unusable account"),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<ServiceState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Json<LoginResponse>, GatehouseApiError> {
    let came_from = headers
        .get(axum::http::header::REFERER)
        .and_then(|value| value.to_str().ok())
        .map(String::from);
    let domain_name = referrer_domain(&headers);

    // The lockout threshold of the originating domain applies, with the
    // control-panel default behind it.
    let defaults = state
        .provider
        .get_registry_provider()
        .domain_defaults(&state)
        .await?;
    let max_attempts = match &domain_name {
        Some(name) => state
            .provider
            .get_registry_provider()
            .find_domain(&state, name)
            .await?
            .map(|domain| domain.max_attempts(defaults.max_attempts)),
        None => None,
    }
    .or(Some(defaults.max_attempts));

    let mut auth = UserPasswordAuthRequestBuilder::default()
        .username(form.username.clone())
        .password(form.password.clone())
        .build()
        .map_err(|err| GatehouseApiError::BadRequest(err.to_string()))?;
    auth.max_attempts = max_attempts;

    let user = state
        .provider
        .get_identity_provider()
        .authenticate_by_password(&state, &auth)
        .await?;

    session.login(&user.username);
    let mut record = ActivityRecordBuilder::default();
    record.username(user.username.clone()).kind(ActivityKind::Login);
    if let Some(came_from) = came_from {
        record.came_from(came_from);
    }
    state
        .provider
        .get_activity_provider()
        .record(
            &state,
            record
                .build()
                .map_err(crate::activity::error::ActivityProviderError::from)?,
        )
        .await?;

    info!("User {} logged in", user.username);
    Ok(Json(LoginResponse {
        username: user.username,
    }))
}

/// Drop the authenticated session.
#[utoipa::path(
    post,
    path = "/auth/logout",
    description = "Logout",
    responses(
        (status = OK, description = "Logged out"),
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<ServiceState>,
    session: Session,
) -> Result<Json<serde_json::Value>, GatehouseApiError> {
    if let Some(username) = session.username() {
        state
            .provider
            .get_activity_provider()
            .record(
                &state,
                ActivityRecordBuilder::default()
                    .username(username)
                    .kind(ActivityKind::Logout)
                    .build()
                    .map_err(crate::activity::error::ActivityProviderError::from)?,
            )
            .await?;
    }
    session.logout();
    Ok(Json(serde_json::json!({"logged_out": true})))
}
