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
//! Gatehouse API
use axum::{Json, extract::State};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::api::error::GatehouseApiError;
use crate::api::types::ServiceInfo;
use crate::gatehouse::ServiceState;

pub mod auth;
pub mod error;
pub mod oauth;
pub mod openid;
pub mod types;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gatehouse",
        description = "Identity provider brokering OpenID assertions and OAuth2 tokens",
        version = "0.1.0"
    ),
    tags(
        (name = "openid", description = "OpenID 2.0 protocol and discovery"),
        (name = "oauth2", description = "OAuth2 authorization code and token flow"),
        (name = "auth", description = "Login and logout"),
    )
)]
pub struct ApiDoc;

pub fn openapi_router() -> OpenApiRouter<ServiceState> {
    // The user-details resource is CORS-open for browser applications;
    // everything else stays same-origin.
    let cors_open = OpenApiRouter::new()
        .routes(routes!(oauth::get_user_details))
        .layer(CorsLayer::permissive());

    OpenApiRouter::new()
        .routes(routes!(home))
        .routes(routes!(openid::openid_get, openid::openid_post))
        .routes(routes!(openid::yadis))
        .routes(routes!(openid::yadis_user))
        .routes(routes!(auth::login))
        .routes(routes!(auth::logout))
        .routes(routes!(oauth::create_secret))
        .routes(routes!(oauth::authorize_client))
        .routes(routes!(oauth::process_authorization))
        .routes(routes!(oauth::request_access_token))
        .routes(routes!(oauth::validate_user_token))
        .merge(cors_open)
}

/// Home route, the landing spot of policy-forced redirects.
#[utoipa::path(
    get,
    path = "/",
    description = "Service document",
    responses(
        (status = OK, description = "Service document", body = ServiceInfo),
    ),
    tag = "home"
)]
async fn home(State(state): State<ServiceState>) -> Result<Json<ServiceInfo>, GatehouseApiError> {
    let mut base = state
        .config
        .default
        .public_endpoint
        .clone()
        .unwrap_or_else(|| url::Url::parse("http://localhost:8080").expect("static url"));
    base.set_path("/openid");
    let openid_endpoint = base.to_string();
    base.set_path("/yadis");
    let yadis_endpoint = base.to_string();

    Ok(Json(ServiceInfo {
        name: "gatehouse".into(),
        openid_endpoint,
        yadis_endpoint,
    }))
}
