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
use chrono::{TimeDelta, Utc};
use tracing::{error, info};

use crate::activity::{ActivityApi, types::ActivityKind};
use crate::common::referrer_domain;
use crate::gatehouse::ServiceState;
use crate::policy::{force_logout, query_params, session_of};
use crate::registry::RegistryApi;

/// A login only stays valid for the `password_valid` window of the domain
/// the user arrived from. Past it, the user is logged out with a message
/// naming the domain; an interrupted OpenID request is stashed for the
/// next login.
pub async fn password_timeout(
    State(state): State<ServiceState>,
    request: Request,
    next: Next,
) -> Response {
    let session = session_of(&request);
    let domain_name = referrer_domain(request.headers());
    let params = query_params(&request);

    let mut response = next.run(request).await;

    let Some(session) = session else {
        return response;
    };
    let Some(username) = session.username() else {
        return response;
    };

    let stale = match login_is_stale(&state, &username, domain_name.as_deref()).await {
        Ok(stale) => stale,
        Err(err) => {
            error!("Password timeout check failed: {}", err);
            return response;
        }
    };

    if stale {
        let domain_label = domain_name.unwrap_or_else(|| "this site".to_string());
        info!(
            "Password validity time out for {} coming from {}",
            username, domain_label
        );
        session.flash_error(format!(
            "You must log in again to be returned to: {domain_label}"
        ));
        force_logout(&session, &params, &state.config, &mut response);
    }
    response
}

async fn login_is_stale(
    state: &ServiceState,
    username: &str,
    domain_name: Option<&str>,
) -> Result<bool, crate::error::GatehouseError> {
    let defaults = state
        .provider
        .get_registry_provider()
        .domain_defaults(state)
        .await?;
    let domain = match domain_name {
        Some(name) => {
            state
                .provider
                .get_registry_provider()
                .find_domain(state, name)
                .await?
        }
        None => None,
    };
    let pw_valid_minutes = domain
        .map(|d| d.password_valid_minutes(defaults.password_valid))
        .unwrap_or(defaults.password_valid);

    let last = state
        .provider
        .get_activity_provider()
        .last_activity_of_kinds(
            state,
            username,
            &[ActivityKind::Login, ActivityKind::AuthorizeCheckid],
        )
        .await?;

    Ok(match last {
        Some(last) => last.activity_ts + TimeDelta::minutes(pw_valid_minutes as i64) < Utc::now(),
        // No login on record at all: nothing to measure against.
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::{Router, http::StatusCode, middleware::from_fn_with_state, routing::get};
    use tower::ServiceExt;

    use super::*;
    use crate::activity::MockActivityProvider;
    use crate::activity::types::Activity;
    use crate::policy::test_support::{ok_handler, state_with};
    use crate::provider::Provider;
    use crate::registry::MockRegistryProvider;
    use crate::registry::types::Domain;
    use crate::session::Session;

    fn login_activity(minutes_ago: i64) -> Activity {
        Activity {
            id: 1,
            username: "frodo".into(),
            kind: ActivityKind::Login,
            activity_ts: Utc::now() - TimeDelta::minutes(minutes_ago),
            actor_username: None,
            came_from: None,
            came_from_fqdn: None,
            detail: None,
        }
    }

    fn provider_with(minutes_ago: i64, password_valid: i32) -> Provider {
        let mut registry_mock = MockRegistryProvider::default();
        registry_mock.expect_domain_defaults().returning(|_| {
            Ok(crate::registry::types::DomainDefaults {
                password_valid: 43200,
                max_attempts: 10,
            })
        });
        registry_mock.expect_find_domain().returning(move |_, name: &'_ str| {
            Ok(Some(Domain {
                name: name.into(),
                password_valid,
                ..Default::default()
            }))
        });
        let mut activity_mock = MockActivityProvider::default();
        activity_mock
            .expect_last_activity_of_kinds()
            .returning(move |_, _, _| Ok(Some(login_activity(minutes_ago))));
        Provider::mocked_builder()
            .registry(registry_mock)
            .activity(activity_mock)
            .build()
            .unwrap()
    }

    fn request(session: &Session) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri("/profile?openid.mode=checkid_setup&openid.identity=x&openid.return_to=https%3A%2F%2Frp.example.com%2Freturn")
            .header("referer", "https://rp.example.com/login")
            .extension(session.clone())
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_stale_login_forced_out_and_openid_stashed() {
        // Last login 120 minutes ago, the domain allows 60.
        let state = state_with(provider_with(120, 60));
        let session = Session::create(30);
        session.login("frodo");

        let app = Router::new()
            .route("/profile", get(ok_handler))
            .layer(from_fn_with_state(state.clone(), password_timeout));

        let response = app.oneshot(request(&session)).await.unwrap();
        assert_eq!(StatusCode::FOUND, response.status());
        assert!(session.username().is_none());
        assert!(session.has_pending_openid());
        let flash = session.take_flash();
        assert!(flash[0].message.contains("rp.example.com"));
    }

    #[tokio::test]
    async fn test_login_within_window_kept() {
        // Last login 30 minutes ago, the domain allows 60.
        let state = state_with(provider_with(30, 60));
        let session = Session::create(30);
        session.login("frodo");

        let app = Router::new()
            .route("/profile", get(ok_handler))
            .layer(from_fn_with_state(state.clone(), password_timeout));

        let response = app.oneshot(request(&session)).await.unwrap();
        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(Some("frodo".to_string()), session.username());
    }

    #[tokio::test]
    async fn test_zero_window_always_requires_login() {
        let state = state_with(provider_with(0, 0));
        let session = Session::create(30);
        session.login("frodo");

        let app = Router::new()
            .route("/profile", get(ok_handler))
            .layer(from_fn_with_state(state.clone(), password_timeout));

        let response = app.oneshot(request(&session)).await.unwrap();
        assert_eq!(StatusCode::FOUND, response.status());
        assert!(session.username().is_none());
    }
}
