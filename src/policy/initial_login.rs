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

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{error, info};

use crate::activity::{ActivityApi, types::ActivityKind};
use crate::common::{referrer_domain, request_host};
use crate::gatehouse::ServiceState;
use crate::policy::{force_logout, query_params, session_of};

/// First use of a relying party must go through a direct login: a user
/// arriving from a domain they have never logged in from is logged out
/// and sent home (with any interrupted OpenID request stashed).
pub async fn initial_login(
    State(state): State<ServiceState>,
    request: Request,
    next: Next,
) -> Response {
    let session = session_of(&request);
    let domain_name = referrer_domain(request.headers());
    let host = request_host(request.headers());
    let params = query_params(&request);

    let mut response = next.run(request).await;

    let Some(session) = session else {
        return response;
    };
    let Some(username) = session.username() else {
        return response;
    };
    let Some(domain_name) = domain_name else {
        return response;
    };

    // Requests against the provider itself are always local.
    if host.as_deref() == Some(domain_name.as_str()) {
        return response;
    }

    let domain_logins = match state
        .provider
        .get_activity_provider()
        .count_for_domain(&state, &username, ActivityKind::Login, &domain_name)
        .await
    {
        Ok(count) => count,
        Err(err) => {
            error!("Initial login check failed: {}", err);
            return response;
        }
    };

    if domain_logins == 0 {
        info!(
            "User {} has not logged in from {} yet",
            username, domain_name
        );
        session.flash_error(format!(
            "You must log in again to be returned to: {domain_name}"
        ));
        force_logout(&session, &params, &state.config, &mut response);
    }
    response
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::{Router, http::StatusCode, middleware::from_fn_with_state, routing::get};
    use tower::ServiceExt;

    use super::*;
    use crate::activity::MockActivityProvider;
    use crate::policy::test_support::{ok_handler, state_with};
    use crate::provider::Provider;
    use crate::session::Session;

    fn provider_with_login_count(count: u64) -> Provider {
        let mut activity_mock = MockActivityProvider::default();
        activity_mock
            .expect_count_for_domain()
            .withf(|_, u: &'_ str, k: &ActivityKind, d: &'_ str| {
                u == "frodo" && *k == ActivityKind::Login && d == "rp.example.com"
            })
            .returning(move |_, _, _, _| Ok(count));
        Provider::mocked_builder()
            .activity(activity_mock)
            .build()
            .unwrap()
    }

    fn request(session: &Session, host: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri("/")
            .header("referer", "https://rp.example.com/app")
            .header("host", host)
            .extension(session.clone())
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_domain_forces_fresh_login() {
        let state = state_with(provider_with_login_count(0));
        let session = Session::create(30);
        session.login("frodo");

        let app = Router::new()
            .route("/", get(ok_handler))
            .layer(from_fn_with_state(state.clone(), initial_login));

        let response = app
            .oneshot(request(&session, "id.example.com"))
            .await
            .unwrap();
        assert_eq!(StatusCode::FOUND, response.status());
        assert!(session.username().is_none());
    }

    #[tokio::test]
    async fn test_known_domain_passes() {
        let state = state_with(provider_with_login_count(3));
        let session = Session::create(30);
        session.login("frodo");

        let app = Router::new()
            .route("/", get(ok_handler))
            .layer(from_fn_with_state(state.clone(), initial_login));

        let response = app
            .oneshot(request(&session, "id.example.com"))
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(Some("frodo".to_string()), session.username());
    }

    #[tokio::test]
    async fn test_local_request_exempt() {
        // Referrer domain equals the request host: the site itself.
        let state = state_with(Provider::mocked_builder().build().unwrap());
        let session = Session::create(30);
        session.login("frodo");

        let app = Router::new()
            .route("/", get(ok_handler))
            .layer(from_fn_with_state(state.clone(), initial_login));

        let response = app
            .oneshot(request(&session, "rp.example.com"))
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(Some("frodo".to_string()), session.username());
    }
}
