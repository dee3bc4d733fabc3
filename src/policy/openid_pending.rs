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
use tracing::{debug, error};

use crate::gatehouse::ServiceState;
use crate::openid::{OpenIdApi, ProcessResult};
use crate::policy::{rewrite_redirect, session_of};

/// When a login completed while a checkid request was waiting, answer the
/// relying party: re-invoke the protocol engine with the stashed
/// parameters exactly once and point the response at its assertion. The
/// stash and the freshly-authenticated marker are consumed together;
/// re-delivery is impossible by construction.
pub async fn openid_pending_completion(
    State(state): State<ServiceState>,
    request: Request,
    next: Next,
) -> Response {
    let session = session_of(&request);

    let mut response = next.run(request).await;

    let Some(session) = session else {
        return response;
    };
    let Some((params, user)) = session.take_openid_completion() else {
        return response;
    };
    debug!("Replaying the pending openid request for {}", user);

    match state
        .provider
        .get_openid_provider()
        .process(&state, &session, &params)
        .await
    {
        Ok(ProcessResult::Redirect(url)) => rewrite_redirect(&mut response, &url),
        Ok(_) => {
            // The stash did not hold a valid protocol request after all;
            // the original response stands.
        }
        Err(err) => {
            error!("Replaying the pending openid request failed: {}", err);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        http::{StatusCode, header},
        middleware::from_fn_with_state,
        routing::get,
    };
    use std::collections::HashMap;
    use tower::ServiceExt;
    use url::Url;

    use super::*;
    use crate::openid::MockOpenIdProvider;
    use crate::policy::test_support::{ok_handler, request_with_session, state_with};
    use crate::provider::Provider;
    use crate::session::Session;

    fn pending_params() -> HashMap<String, String> {
        HashMap::from([("openid.mode".to_string(), "checkid_setup".to_string())])
    }

    #[tokio::test]
    async fn test_completion_rewrites_redirect_and_consumes() {
        let mut openid_mock = MockOpenIdProvider::default();
        openid_mock
            .expect_process()
            .withf(|_, _, params: &HashMap<String, String>| params.contains_key("openid.mode"))
            .returning(|_, _, _| {
                Ok(ProcessResult::Redirect(
                    Url::parse("https://rp.example.com/return?openid.mode=id_res").unwrap(),
                ))
            });
        let state = state_with(
            Provider::mocked_builder()
                .openid(openid_mock)
                .build()
                .unwrap(),
        );

        let session = Session::create(30);
        session.stash_pending_openid(pending_params());
        session.login("frodo");

        let app = Router::new()
            .route("/", get(ok_handler))
            .layer(from_fn_with_state(state.clone(), openid_pending_completion));

        let response = app
            .oneshot(request_with_session("/", &session))
            .await
            .unwrap();
        assert_eq!(StatusCode::FOUND, response.status());
        assert!(
            response.headers()[header::LOCATION]
                .to_str()
                .unwrap()
                .starts_with("https://rp.example.com/return")
        );
        // Single shot: both keys are gone.
        assert!(!session.has_pending_openid());
        assert!(session.take_openid_completion().is_none());
    }

    #[tokio::test]
    async fn test_no_completion_without_fresh_login() {
        let state = state_with(Provider::mocked_builder().build().unwrap());
        let session = Session::create(30);
        session.stash_pending_openid(pending_params());
        // No login happened; the stash stays for later.

        let app = Router::new()
            .route("/", get(ok_handler))
            .layer(from_fn_with_state(state.clone(), openid_pending_completion));

        let response = app
            .oneshot(request_with_session("/", &session))
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, response.status());
        assert!(session.has_pending_openid());
    }

    #[tokio::test]
    async fn test_undecodable_stash_leaves_response() {
        let mut openid_mock = MockOpenIdProvider::default();
        openid_mock
            .expect_process()
            .returning(|_, _, _| Ok(ProcessResult::Empty));
        let state = state_with(
            Provider::mocked_builder()
                .openid(openid_mock)
                .build()
                .unwrap(),
        );

        let session = Session::create(30);
        session.stash_pending_openid(pending_params());
        session.login("frodo");

        let app = Router::new()
            .route("/", get(ok_handler))
            .layer(from_fn_with_state(state.clone(), openid_pending_completion));

        let response = app
            .oneshot(request_with_session("/", &session))
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, response.status());
        // Consumed regardless: the replay happens exactly once.
        assert!(!session.has_pending_openid());
    }
}
