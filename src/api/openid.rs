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
//! # OpenID endpoint
//!
//! The protocol endpoint accepts OpenID key-value parameters via GET or
//! POST and relays the engine result onto the wire: an HTTP redirect for
//! indirect responses, the key-value body for direct ones, and an empty
//! body for undecodable parameter sets. The yadis routes serve the XRDS
//! capability documents relying parties discover the endpoint through.

use axum::{
    extract::{Form, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;

use crate::api::error::GatehouseApiError;
use crate::gatehouse::ServiceState;
use crate::openid::{OpenIdApi, ProcessResult, SERVICE_TYPE_URIS};
use crate::session::Session;

/// OpenID endpoint (GET).
#[utoipa::path(
    get,
    path = "/openid",
    description = "OpenID 2.0/1.1/1.0 protocol endpoint",
    responses(
        (status = OK, description = "Direct protocol response"),
        (status = FOUND, description = "Indirect protocol response"),
    ),
    tag = "openid"
)]
pub async fn openid_get(
    State(state): State<ServiceState>,
    session: Session,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, GatehouseApiError> {
    process(&state, &session, params).await
}

/// OpenID endpoint (POST).
#[utoipa::path(
    post,
    path = "/openid",
    description = "OpenID 2.0/1.1/1.0 protocol endpoint",
    responses(
        (status = OK, description = "Direct protocol response"),
        (status = FOUND, description = "Indirect protocol response"),
    ),
    tag = "openid"
)]
pub async fn openid_post(
    State(state): State<ServiceState>,
    session: Session,
    Form(params): Form<HashMap<String, String>>,
) -> Result<impl IntoResponse, GatehouseApiError> {
    process(&state, &session, params).await
}

async fn process(
    state: &ServiceState,
    session: &Session,
    params: HashMap<String, String>,
) -> Result<Response, GatehouseApiError> {
    let result = state
        .provider
        .get_openid_provider()
        .process(state, session, &params)
        .await?;

    Ok(match result {
        ProcessResult::Redirect(url) => (
            StatusCode::FOUND,
            [(header::LOCATION, url.to_string())],
        )
            .into_response(),
        ProcessResult::Body(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response(),
        ProcessResult::Empty => (StatusCode::OK, String::new()).into_response(),
    })
}

/// XRDS capability document of the anonymous identity.
#[utoipa::path(
    get,
    path = "/yadis",
    description = "Yadis/XRDS service discovery document",
    responses(
        (status = OK, description = "XRDS document", content_type = "application/xrds+xml"),
    ),
    tag = "openid"
)]
pub async fn yadis(State(state): State<ServiceState>) -> impl IntoResponse {
    xrds_response(&state, None)
}

/// XRDS capability document of one user's identity.
#[utoipa::path(
    get,
    path = "/yadis/{username}",
    description = "Yadis/XRDS service discovery document of a user",
    params(("username" = String, Path, description = "Username of the identity")),
    responses(
        (status = OK, description = "XRDS document", content_type = "application/xrds+xml"),
    ),
    tag = "openid"
)]
pub async fn yadis_user(
    State(state): State<ServiceState>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    xrds_response(&state, Some(&username))
}

fn xrds_response(state: &ServiceState, username: Option<&str>) -> Response {
    let mut base = state
        .config
        .default
        .public_endpoint
        .clone()
        .unwrap_or_else(|| url::Url::parse("http://localhost:8080").expect("static url"));
    base.set_path("/openid");
    let endpoint = base.to_string();

    let mut types = String::new();
    for type_uri in SERVICE_TYPE_URIS {
        types.push_str(&format!("      <Type>{type_uri}</Type>\n"));
    }
    let local_id = username
        .map(|name| {
            let mut identity = base.clone();
            identity.set_path(&format!("/user/{name}"));
            format!("      <LocalID>{identity}</LocalID>\n")
        })
        .unwrap_or_default();

    let document = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <xrds:XRDS xmlns:xrds=\"xri://$xrds\" xmlns=\"xri://$xrd*($v*2.0)\">\n\
         \x20 <XRD>\n\
         \x20   <Service priority=\"0\">\n\
         {types}\
         {local_id}\
         \x20     <URI>{endpoint}</URI>\n\
         \x20   </Service>\n\
         \x20 </XRD>\n\
         </xrds:XRDS>\n"
    );

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xrds+xml")],
        document,
    )
        .into_response()
}
