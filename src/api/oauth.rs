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
//! # OAuth2 endpoints
//!
//! The authorization-code flow of registered client applications:
//! issuing client secrets, asking the user to authorize a client,
//! delivering the temporary code, exchanging it for an access token, and
//! the resource endpoints validating tokens against the user directory.

use axum::{
    Json,
    extract::{Form, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::activity::{
    ActivityApi,
    types::{ActivityKind, ActivityRecordBuilder},
};
use crate::api::error::GatehouseApiError;
use crate::api::types::*;
use crate::common::referrer_domain;
use crate::gatehouse::ServiceState;
use crate::identity::IdentityApi;
use crate::oauth::OauthApi;
use crate::registry::RegistryApi;
use crate::session::Session;

/// Generate and return a new secret for the client application. The
/// plaintext exists in this response only; the store keeps its hash.
#[utoipa::path(
    post,
    path = "/oauth2/create_secret",
    description = "Generate a new client secret for a registered domain",
    request_body(content = CreateSecretRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = OK, description = "The freshly generated secret", body = ClientSecretResponse),
        (status = NOT_FOUND, description = "Unknown domain"),
    ),
    tag = "oauth2"
)]
pub async fn create_secret(
    State(state): State<ServiceState>,
    session: Session,
    Form(request): Form<CreateSecretRequest>,
) -> Result<impl IntoResponse, GatehouseApiError> {
    let domain = state
        .provider
        .get_registry_provider()
        .get_domain(&state, &request.domain)
        .await?
        .ok_or_else(|| GatehouseApiError::NotFound {
            resource: "domain".into(),
            identifier: request.domain.clone(),
        })?;

    let plain_secret = state
        .provider
        .get_oauth_provider()
        .create_client_secret(&state, &domain.name)
        .await?;

    if let Some(username) = session.username() {
        state
            .provider
            .get_activity_provider()
            .record(
                &state,
                ActivityRecordBuilder::default()
                    .username(username)
                    .kind(ActivityKind::CreateSecret)
                    .detail(serde_json::json!({"domain": domain.name}))
                    .build()
                    .map_err(crate::activity::error::ActivityProviderError::from)?,
            )
            .await?;
    }

    Ok(Json(ClientSecretResponse {
        domain: domain.name,
        display_name: domain.display_name,
        plain_secret,
    }))
}

/// Ask the user for permission for the application to act as them. The
/// in-flight client id and redirect URI are kept in the session for the
/// decision POST.
#[utoipa::path(
    get,
    path = "/oauth2/authorize_client",
    description = "Start the client authorization decision",
    params(AuthorizeClientQuery),
    responses(
        (status = OK, description = "Authorization decision context", body = AuthorizationContext),
        (status = FORBIDDEN, description = "Redirect URL not valid for the referring domain"),
    ),
    tag = "oauth2"
)]
pub async fn authorize_client(
    State(state): State<ServiceState>,
    session: Session,
    headers: HeaderMap,
    Query(query): Query<AuthorizeClientQuery>,
) -> Result<impl IntoResponse, GatehouseApiError> {
    // Stored before validation, the way the decision handler expects
    // them.
    session.set_oauth_flow(
        query.domain.clone(),
        query.redirect_uri.clone(),
        query.response_type.clone(),
    );

    let referrer = referrer_domain(&headers);
    let valid = state
        .provider
        .get_oauth_provider()
        .validate_redirect_uri(&state, referrer.as_deref(), &query.redirect_uri)
        .await?;
    if !valid {
        return Err(GatehouseApiError::Forbidden(
            "Redirect URL not valid for referring domain".into(),
        ));
    }

    let domain = state
        .provider
        .get_registry_provider()
        .get_domain(&state, &query.domain)
        .await?
        .ok_or_else(|| GatehouseApiError::NotFound {
            resource: "domain".into(),
            identifier: query.domain.clone(),
        })?;

    Ok(Json(AuthorizationContext {
        domain: domain.name,
        display_name: domain.display_name,
        csrf_token: session.csrf_token(),
    }))
}

/// The user's decision: on approval a temporary authorization code is
/// persisted and delivered to the client through the redirect URI; on
/// denial the client learns `code=none`.
#[utoipa::path(
    post,
    path = "/oauth2/process_authorization",
    description = "Deliver the authorization decision to the client",
    request_body(content = ProcessAuthorizationForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = FOUND, description = "Redirect to the client with the code"),
        (status = FORBIDDEN, description = "Stale or forged decision form"),
    ),
    tag = "oauth2"
)]
pub async fn process_authorization(
    State(state): State<ServiceState>,
    session: Session,
    Form(form): Form<ProcessAuthorizationForm>,
) -> Result<Response, GatehouseApiError> {
    if form.csrf_token.as_deref() != Some(session.csrf_token().as_str()) {
        return Err(GatehouseApiError::Forbidden("invalid csrf token".into()));
    }

    let redirect_uri = session.oauth_redirect_uri().unwrap_or_default();
    let auth_code = if form.submit.is_some() {
        let username = session
            .username()
            .ok_or(GatehouseApiError::Unauthorized(None))?;
        let client_id = session
            .oauth_client_id()
            .ok_or_else(|| GatehouseApiError::BadRequest("no authorization in flight".into()))?;

        let auth_code = state.provider.get_oauth_provider().generate_authorization_code();
        state
            .provider
            .get_oauth_provider()
            .persist_authorization_code(&state, &client_id, &username, &auth_code)
            .await?;
        // The approval is the durable consent record the checkid
        // authorization decision looks for.
        state
            .provider
            .get_activity_provider()
            .record(
                &state,
                ActivityRecordBuilder::default()
                    .username(username)
                    .kind(ActivityKind::Consent)
                    .came_from_fqdn(client_id.clone())
                    .build()
                    .map_err(crate::activity::error::ActivityProviderError::from)?,
            )
            .await?;
        info!("Authorization code issued for client {}", client_id);
        auth_code
    } else {
        "none".to_string()
    };

    let location = format!("{redirect_uri}?code={auth_code}");
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

/// Authenticate the client application and exchange its code for an
/// access token.
#[utoipa::path(
    post,
    path = "/oauth2/request_access_token/{code}",
    description = "Exchange an authorization code for an access token",
    params(("code" = String, Path, description = "The authorization code")),
    request_body(content = AccessTokenForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = OK, description = "The access token", body = AccessTokenResponse),
        (status = FORBIDDEN, description = "Request for authentication token denied"),
    ),
    tag = "oauth2"
)]
pub async fn request_access_token(
    State(state): State<ServiceState>,
    Path(code): Path<String>,
    Form(form): Form<AccessTokenForm>,
) -> Result<impl IntoResponse, GatehouseApiError> {
    let oauth = state.provider.get_oauth_provider();
    let client_valid = oauth
        .validate_client_secret(&state, &form.domain, &form.secret)
        .await?;
    let code_valid = oauth.validate_auth_code(&state, &form.domain, &code).await?;
    if !(client_valid && code_valid) {
        return Err(GatehouseApiError::Forbidden(
            "request for authentication token denied".into(),
        ));
    }

    let token = oauth.generate_access_token();
    oauth
        .persist_access_token(&state, &form.domain, &code, &token)
        .await?;
    Ok(Json(AccessTokenResponse {
        access_token: token,
    }))
}

/// Validate the application token and return the user details. Served
/// CORS-open so browser applications can call it directly.
#[utoipa::path(
    post,
    path = "/oauth2/get_user_details",
    description = "User details behind a valid access token",
    request_body(content = UserDetailsForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = OK, description = "User details", body = UserDetailsResponse),
        (status = FORBIDDEN, description = "Access token not valid for domain"),
        (status = NOT_FOUND, description = "User not found"),
    ),
    tag = "oauth2"
)]
pub async fn get_user_details(
    State(state): State<ServiceState>,
    Form(form): Form<UserDetailsForm>,
) -> Result<impl IntoResponse, GatehouseApiError> {
    let username = state
        .provider
        .get_oauth_provider()
        .user_for_access_token(&state, &form.domain, &form.token)
        .await?
        .ok_or_else(|| {
            GatehouseApiError::Forbidden("access token not valid for domain".into())
        })?;

    let user = state
        .provider
        .get_identity_provider()
        .get_user(&state, &username)
        .await?
        .ok_or_else(|| GatehouseApiError::NotFound {
            resource: "user".into(),
            identifier: username.clone(),
        })?;

    Ok(Json(UserDetailsResponse {
        username: user.username,
        email: user.email,
        given_name: user.first_name,
        surname: user.last_name,
    }))
}

/// Validate a (user, token) pair for service-to-service checks.
#[utoipa::path(
    post,
    path = "/oauth2/validate_user_token",
    description = "Whether the token is live and belongs to the user",
    request_body(content = ValidateTokenForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = OK, description = "Validity verdict", body = TokenValidity),
    ),
    tag = "oauth2"
)]
pub async fn validate_user_token(
    State(state): State<ServiceState>,
    Form(form): Form<ValidateTokenForm>,
) -> Result<impl IntoResponse, GatehouseApiError> {
    let valid = state
        .provider
        .get_oauth_provider()
        .validate_user_with_access_token(&state, &form.user, &form.token)
        .await?;
    Ok(Json(TokenValidity { valid }))
}
