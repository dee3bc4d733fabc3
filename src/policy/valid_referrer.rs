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
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::{error, info};

use crate::common::{domain_of, request_host};
use crate::gatehouse::ServiceState;
use crate::policy::{home_url, rewrite_redirect, session_of};
use crate::registry::RegistryApi;

/// No response may redirect the user to an unregistered domain: when the
/// outgoing Location points at a domain without a profile, the redirect
/// is dropped in favor of the home route and the user is told why.
pub async fn valid_referrer(
    State(state): State<ServiceState>,
    request: Request,
    next: Next,
) -> Response {
    let session = session_of(&request);
    let host = request_host(request.headers());

    let mut response = next.run(request).await;

    let Some(location) = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
    else {
        return response;
    };
    // Relative redirects stay on this site.
    let Some(domain_name) = domain_of(&location) else {
        return response;
    };
    if host.as_deref() == Some(domain_name.as_str()) {
        return response;
    }

    let registered = match state
        .provider
        .get_registry_provider()
        .find_domain(&state, &domain_name)
        .await
    {
        Ok(domain) => domain.is_some(),
        Err(err) => {
            error!("Redirect target check failed: {}", err);
            return response;
        }
    };

    if !registered {
        info!("Invalid requesting domain, not redirecting: {}", domain_name);
        if let Some(session) = session {
            session.flash_error(format!(
                "Invalid requesting domain, not redirecting: {domain_name}"
            ));
        }
        rewrite_redirect(&mut response, &home_url(&state.config));
    }
    response
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        http::StatusCode,
        middleware::from_fn_with_state,
        response::Redirect,
        routing::get,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::policy::test_support::{request_with_session, state_with};
    use crate::provider::Provider;
    use crate::registry::MockRegistryProvider;
    use crate::registry::types::Domain;
    use crate::session::Session;

    fn registry_knowing(known: &'static str) -> MockRegistryProvider {
        let mut registry_mock = MockRegistryProvider::default();
        registry_mock.expect_find_domain().returning(move |_, name: &'_ str| {
            if name == known {
                Ok(Some(Domain {
                    name: name.into(),
                    ..Default::default()
                }))
            } else {
                Ok(None)
            }
        });
        registry_mock
    }

    async fn redirect_to_rp() -> Redirect {
        Redirect::to("https://rp.example.com/return")
    }

    #[tokio::test]
    async fn test_registered_target_kept() {
        let state = state_with(
            Provider::mocked_builder()
                .registry(registry_knowing("rp.example.com"))
                .build()
                .unwrap(),
        );
        let session = Session::create(30);

        let app = Router::new()
            .route("/", get(redirect_to_rp))
            .layer(from_fn_with_state(state.clone(), valid_referrer));

        let response = app
            .oneshot(request_with_session("/", &session))
            .await
            .unwrap();
        assert_eq!(
            "https://rp.example.com/return",
            response.headers()[header::LOCATION].to_str().unwrap()
        );
    }

    #[tokio::test]
    async fn test_unregistered_target_dropped() {
        let state = state_with(
            Provider::mocked_builder()
                .registry(registry_knowing("other.example.com"))
                .build()
                .unwrap(),
        );
        let session = Session::create(30);

        let app = Router::new()
            .route("/", get(redirect_to_rp))
            .layer(from_fn_with_state(state.clone(), valid_referrer));

        let response = app
            .oneshot(request_with_session("/", &session))
            .await
            .unwrap();
        assert_eq!(StatusCode::FOUND, response.status());
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("http://localhost:8080"), "{location}");
        let flash = session.take_flash();
        assert!(flash[0].message.contains("rp.example.com"));
    }

    #[tokio::test]
    async fn test_plain_response_untouched() {
        let state = state_with(Provider::mocked_builder().build().unwrap());
        let session = Session::create(30);

        let app = Router::new()
            .route("/", get(crate::policy::test_support::ok_handler))
            .layer(from_fn_with_state(state.clone(), valid_referrer));

        let response = app
            .oneshot(request_with_session("/", &session))
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, response.status());
    }
}
