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
    response::{IntoResponse, Redirect, Response},
};
use tracing::{error, info};

use crate::gatehouse::ServiceState;
use crate::identity::IdentityApi;
use crate::policy::{home_url, session_of};

/// Disabled users are logged out instead of served: the account check
/// runs before the downstream handler and short-circuits straight to the
/// home route.
pub async fn user_disabled(
    State(state): State<ServiceState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(session) = session_of(&request) else {
        return next.run(request).await;
    };
    if let Some(username) = session.username() {
        match state
            .provider
            .get_identity_provider()
            .get_user(&state, &username)
            .await
        {
            Ok(Some(user)) if user.admin_disabled => {
                info!("User logged out because of admin_disabled: {}", username);
                session.flash_error("This account has been disabled.");
                session.logout();
                return Redirect::to(home_url(&state.config).as_str()).into_response();
            }
            Ok(_) => {}
            Err(err) => {
                // Absorbed; the policy layer never raises.
                error!("Account state check failed: {}", err);
            }
        }
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use axum::{Router, http::StatusCode, middleware::from_fn_with_state, routing::get};
    use tower::ServiceExt;

    use super::*;
    use crate::identity::MockIdentityProvider;
    use crate::identity::types::UserResponse;
    use crate::policy::test_support::{ok_handler, request_with_session, state_with};
    use crate::provider::Provider;
    use crate::session::Session;

    #[tokio::test]
    async fn test_disabled_user_logged_out() {
        let mut identity_mock = MockIdentityProvider::default();
        identity_mock.expect_get_user().returning(|_, u: &'_ str| {
            Ok(Some(UserResponse {
                username: u.into(),
                admin_disabled: true,
                ..Default::default()
            }))
        });
        let state = state_with(
            Provider::mocked_builder()
                .identity(identity_mock)
                .build()
                .unwrap(),
        );

        let session = Session::create(30);
        session.login("frodo");

        let app = Router::new()
            .route("/", get(ok_handler))
            .layer(from_fn_with_state(state.clone(), user_disabled));

        let response = app
            .oneshot(request_with_session("/", &session))
            .await
            .unwrap();
        assert_eq!(StatusCode::SEE_OTHER, response.status());
        assert!(session.username().is_none());
        assert_eq!(1, session.take_flash().len());
    }

    #[tokio::test]
    async fn test_active_user_served() {
        let mut identity_mock = MockIdentityProvider::default();
        identity_mock.expect_get_user().returning(|_, u: &'_ str| {
            Ok(Some(UserResponse {
                username: u.into(),
                ..Default::default()
            }))
        });
        let state = state_with(
            Provider::mocked_builder()
                .identity(identity_mock)
                .build()
                .unwrap(),
        );

        let session = Session::create(30);
        session.login("frodo");

        let app = Router::new()
            .route("/", get(ok_handler))
            .layer(from_fn_with_state(state.clone(), user_disabled));

        let response = app
            .oneshot(request_with_session("/", &session))
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(Some("frodo".to_string()), session.username());
    }

    #[tokio::test]
    async fn test_anonymous_passes_through() {
        let state = state_with(Provider::mocked_builder().build().unwrap());
        let session = Session::create(30);

        let app = Router::new()
            .route("/", get(ok_handler))
            .layer(from_fn_with_state(state.clone(), user_disabled));

        let response = app
            .oneshot(request_with_session("/", &session))
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, response.status());
    }
}
