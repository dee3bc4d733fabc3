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

//! # OpenID protocol engine
//!
//! Decodes incoming OpenID 2.0/1.1/1.0 requests, drives the checkid
//! authorization decision, and encodes responses. Undecodable parameter
//! sets yield an empty result rather than an error; non-conforming
//! clients learn nothing about the protocol internals. A checkid request
//! without an authenticated user is stashed in the session (at most one)
//! and answered after login completion by the policy chain.
//!
//! Associations this provider issues to relying parties live in the
//! association store under a `|normal` scope; the private associations
//! backing stateless assertions live under `|dumb` and are used up by the
//! check_authentication that verifies them.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, NaiveDateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::distr::{Alphanumeric, SampleString};
use sha1::Sha1;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use url::Url;
use uuid::Uuid;

pub mod consent;
pub mod error;
#[cfg(test)]
pub mod mock;
pub mod types;
#[cfg(test)]
pub use mock::MockOpenIdProvider;

use crate::activity::{
    ActivityApi,
    types::{ActivityKind, ActivityRecordBuilder},
};
use crate::association::{
    AssociationApi,
    types::{AssocType, Association},
};
use crate::config::Config;
use crate::gatehouse::ServiceState;
use crate::identity::{IdentityApi, types::UserResponse};
use crate::openid::consent::{ConsentDecision, RecordedConsent};
use crate::openid::error::OpenIdProviderError;
use crate::session::Session;

pub use types::{
    CheckIdMode, CheckIdRequest, Message, OPENID2_NS, OpenIdApi, OpenIdRequest, ProcessResult,
    SERVICE_TYPE_URIS, SREG_NS,
};

/// Salt length of generated response nonces.
const NONCE_SALT_LENGTH: usize = 6;
/// Timestamp format of a response nonce, fixed 20 bytes.
const NONCE_TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Clone, Debug)]
pub struct OpenIdProvider {
    config: Config,
    consent: Arc<dyn ConsentDecision>,
}

impl OpenIdProvider {
    pub fn new(config: &Config) -> Result<Self, OpenIdProviderError> {
        Ok(Self {
            config: config.clone(),
            consent: Arc::new(RecordedConsent),
        })
    }

    /// Engine with a different consent decision plugged in.
    pub fn with_consent(
        config: &Config,
        consent: Arc<dyn ConsentDecision>,
    ) -> Result<Self, OpenIdProviderError> {
        Ok(Self {
            config: config.clone(),
            consent,
        })
    }

    fn public_endpoint(&self) -> Url {
        self.config
            .default
            .public_endpoint
            .clone()
            .unwrap_or_else(|| Url::parse("http://localhost:8080").expect("static url"))
    }

    /// The OP endpoint URL carried in assertions.
    pub fn endpoint_url(&self) -> Url {
        let mut url = self.public_endpoint();
        url.set_path("/openid");
        url
    }

    /// Login route a checkid request without a session is redirected to.
    pub fn login_url(&self) -> Url {
        let mut url = self.public_endpoint();
        url.set_path("/auth/login");
        url
    }

    /// Identity URL of a local user.
    pub fn identity_url(&self, username: &str) -> Url {
        let mut url = self.public_endpoint();
        url.set_path(&format!("/user/{username}"));
        url
    }

    /// Scope key the associations live under in the store. Relying-party
    /// established associations are `normal`; the private ones backing
    /// stateless assertions are `dumb`.
    fn signing_scope(&self, dumb: bool) -> String {
        format!(
            "{}|{}",
            self.endpoint_url(),
            if dumb { "dumb" } else { "normal" }
        )
    }

    async fn handle_associate(
        &self,
        state: &ServiceState,
        request: types::AssociateRequest,
    ) -> Result<ProcessResult, OpenIdProviderError> {
        // Only the no-encryption session type is served; the endpoint is
        // expected to be TLS terminated.
        if !(request.session_type.is_empty() || request.session_type == "no-encryption") {
            return Ok(ProcessResult::Body(unsupported_type_response().to_kv()));
        }
        let Ok(assoc_type) = AssocType::try_from(request.assoc_type.as_str()) else {
            return Ok(ProcessResult::Body(unsupported_type_response().to_kv()));
        };

        let association = new_association(
            self.signing_scope(false),
            assoc_type,
            self.config.association.assoc_lifetime,
        );
        state
            .provider
            .get_association_provider()
            .store_association(state, association.clone())
            .await?;

        let mut response = Message::default();
        response.set("ns", OPENID2_NS);
        response.set("assoc_handle", association.handle);
        response.set("assoc_type", assoc_type.as_str());
        response.set("session_type", "no-encryption");
        response.set("expires_in", association.lifetime.to_string());
        response.set("mac_key", BASE64.encode(&association.secret));
        Ok(ProcessResult::Body(response.to_kv()))
    }

    async fn handle_checkid(
        &self,
        state: &ServiceState,
        session: &Session,
        request: CheckIdRequest,
        raw_params: &HashMap<String, String>,
    ) -> Result<ProcessResult, OpenIdProviderError> {
        let user = match session.username() {
            Some(username) => {
                state
                    .provider
                    .get_identity_provider()
                    .get_user(state, &username)
                    .await?
            }
            None => None,
        };

        let Some(user) = user else {
            // Stash the request for the post-login completion pass; only
            // the first pending request is kept.
            if !session.stash_pending_openid(raw_params.clone()) {
                debug!("A pending openid request already exists, not stashing");
            }
            return Ok(ProcessResult::Redirect(self.login_url()));
        };

        if self
            .consent
            .is_authorized(state, &user, &request.trust_root)
            .await?
        {
            let response = self.positive_assertion(state, &user, &request).await?;
            state
                .provider
                .get_activity_provider()
                .record(
                    state,
                    ActivityRecordBuilder::default()
                        .username(user.username.clone())
                        .kind(ActivityKind::AuthorizeCheckid)
                        .came_from(request.trust_root.clone())
                        .build()
                        .map_err(crate::activity::error::ActivityProviderError::from)?,
                )
                .await?;
            return Ok(ProcessResult::Redirect(
                response.to_redirect_url(&request.return_to)?,
            ));
        }

        // Negative assertion.
        let mut response = Message::default();
        if request.ns2 {
            response.set("ns", OPENID2_NS);
        }
        match request.mode {
            CheckIdMode::Immediate => response.set("mode", "setup_needed"),
            CheckIdMode::Setup => response.set("mode", "cancel"),
        }
        Ok(ProcessResult::Redirect(
            response.to_redirect_url(&request.return_to)?,
        ))
    }

    /// Build the signed id_res message, including the simple-registration
    /// attributes of the authenticated user.
    async fn positive_assertion(
        &self,
        state: &ServiceState,
        user: &UserResponse,
        request: &CheckIdRequest,
    ) -> Result<Message, OpenIdProviderError> {
        let identity = if request.identity == types::IDENTIFIER_SELECT {
            self.identity_url(&user.username).to_string()
        } else {
            request.identity.clone()
        };
        let claimed_id = request.claimed_id.clone().unwrap_or_else(|| identity.clone());

        // Prefer the association the relying party established; fall back
        // to a fresh private association for the stateless flow, telling
        // the relying party which of its handles went stale.
        let mut invalidate_handle = None;
        let association = match &request.assoc_handle {
            Some(handle) => {
                let known = state
                    .provider
                    .get_association_provider()
                    .get_association(state, &self.signing_scope(false), Some(handle))
                    .await?;
                if known.is_none() {
                    invalidate_handle = Some(handle.clone());
                }
                known
            }
            None => None,
        };
        let association = match association {
            Some(assoc) => assoc,
            None => {
                let private = new_association(
                    self.signing_scope(true),
                    AssocType::HmacSha256,
                    self.config.association.assoc_lifetime,
                );
                state
                    .provider
                    .get_association_provider()
                    .store_association(state, private.clone())
                    .await?;
                private
            }
        };

        let mut message = Message::default();
        if request.ns2 {
            message.set("ns", OPENID2_NS);
        }
        message.set("mode", "id_res");
        message.set("op_endpoint", self.endpoint_url().to_string());
        message.set("claimed_id", claimed_id);
        message.set("identity", identity);
        message.set("return_to", request.return_to.clone());
        message.set("response_nonce", generate_response_nonce(Utc::now()));
        message.set("assoc_handle", association.handle.clone());
        if let Some(stale) = invalidate_handle {
            message.set("invalidate_handle", stale);
        }

        // Simple registration attributes of the asserted user.
        message.set("ns.sreg", SREG_NS);
        message.set("sreg.fullname", user.fullname());
        message.set("sreg.nickname", user.username.clone());
        message.set("sreg.email", user.email.clone());

        let mut signed: Vec<String> = [
            "op_endpoint",
            "claimed_id",
            "identity",
            "return_to",
            "response_nonce",
            "assoc_handle",
            "sreg.fullname",
            "sreg.nickname",
            "sreg.email",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        signed.push("signed".to_string());
        message.set("signed", signed.join(","));

        let sig = compute_signature(&association, &message, &signed)?;
        message.set("sig", sig);
        Ok(message)
    }

    async fn handle_check_auth(
        &self,
        state: &ServiceState,
        request: types::CheckAuthRequest,
    ) -> Result<ProcessResult, OpenIdProviderError> {
        let dumb_scope = self.signing_scope(true);
        let association = state
            .provider
            .get_association_provider()
            .get_association(state, &dumb_scope, Some(&request.assoc_handle))
            .await?;

        // The signature was computed over the assertion, not over the
        // check_authentication envelope.
        let mut assertion = request.message.clone();
        assertion.set("mode", "id_res");

        let mut is_valid = match &association {
            Some(assoc) => {
                compute_signature(assoc, &assertion, &request.signed)? == request.sig
            }
            None => false,
        };

        // Replay protection: the response nonce is consumed exactly once.
        if is_valid {
            is_valid = match assertion.get("response_nonce").and_then(split_nonce) {
                Some((timestamp, salt)) => {
                    state
                        .provider
                        .get_association_provider()
                        .use_nonce(state, "", timestamp, &salt)
                        .await?
                }
                None => false,
            };
        }

        // A private association backs a single assertion; it is used up.
        if is_valid {
            state
                .provider
                .get_association_provider()
                .remove_association(state, &dumb_scope, &request.assoc_handle)
                .await?;
        }

        let mut response = Message::default();
        response.set("ns", OPENID2_NS);
        response.set("is_valid", if is_valid { "true" } else { "false" });
        if let Some(stale) = &request.invalidate_handle {
            let known = state
                .provider
                .get_association_provider()
                .get_association(state, &self.signing_scope(false), Some(stale))
                .await?;
            if known.is_none() {
                response.set("invalidate_handle", stale.clone());
            }
        }
        Ok(ProcessResult::Body(response.to_kv()))
    }
}

#[async_trait]
impl OpenIdApi for OpenIdProvider {
    /// Process a raw OpenID parameter set against the current session.
    #[tracing::instrument(level = "info", skip(self, state, session, params))]
    async fn process(
        &self,
        state: &ServiceState,
        session: &Session,
        params: &HashMap<String, String>,
    ) -> Result<ProcessResult, OpenIdProviderError> {
        debug!("Processing openid request");
        let Some(request) = OpenIdRequest::decode(params) else {
            // Intentional tolerance of non-conforming clients.
            return Ok(ProcessResult::Empty);
        };

        match request {
            OpenIdRequest::Associate(req) => self.handle_associate(state, req).await,
            OpenIdRequest::CheckId(req) => {
                self.handle_checkid(state, session, req, params).await
            }
            OpenIdRequest::CheckAuthentication(req) => self.handle_check_auth(state, req).await,
        }
    }
}

/// Direct error response for an unsupported association or session type.
fn unsupported_type_response() -> Message {
    let mut response = Message::default();
    response.set("ns", OPENID2_NS);
    response.set("error", "unsupported association or session type");
    response.set("error_code", "unsupported-type");
    response.set("assoc_type", AssocType::HmacSha256.as_str());
    response.set("session_type", "no-encryption");
    response
}

fn new_association(server_url: String, assoc_type: AssocType, lifetime: i64) -> Association {
    let mut secret = vec![0u8; assoc_type.secret_len()];
    rand::rng().fill_bytes(&mut secret);
    Association {
        server_url,
        handle: format!("{{{}}}", Uuid::new_v4().simple()),
        secret,
        issued: Utc::now().timestamp(),
        lifetime,
        assoc_type,
    }
}

/// Base64 HMAC over the key-value serialization of the signed fields.
pub fn compute_signature(
    association: &Association,
    message: &Message,
    signed: &[String],
) -> Result<String, OpenIdProviderError> {
    let kv = message.kv_of(signed);
    let raw = match association.assoc_type {
        AssocType::HmacSha1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(&association.secret)
                .map_err(|_| OpenIdProviderError::Signature)?;
            mac.update(kv.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
        AssocType::HmacSha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(&association.secret)
                .map_err(|_| OpenIdProviderError::Signature)?;
            mac.update(kv.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
    };
    Ok(BASE64.encode(raw))
}

/// Response nonce: fixed-width UTC timestamp followed by random salt.
fn generate_response_nonce(now: DateTime<Utc>) -> String {
    format!(
        "{}{}",
        now.format(NONCE_TS_FORMAT),
        Alphanumeric.sample_string(&mut rand::rng(), NONCE_SALT_LENGTH)
    )
}

/// Split a response nonce into its epoch timestamp and salt.
fn split_nonce(nonce: &str) -> Option<(i64, String)> {
    if nonce.len() < 20 {
        return None;
    }
    let (ts, salt) = nonce.split_at(20);
    let parsed = NaiveDateTime::parse_from_str(ts, NONCE_TS_FORMAT).ok()?;
    Some((parsed.and_utc().timestamp(), salt.to_string()))
}

#[cfg(test)]
mod tests {
    use sea_orm::DatabaseConnection;

    use super::*;
    use crate::activity::MockActivityProvider;
    use crate::activity::types::{Activity, ActivityKind};
    use crate::association::MockAssociationProvider;
    use crate::gatehouse::Service;
    use crate::identity::MockIdentityProvider;
    use crate::provider::Provider;

    fn state_with(provider: Provider) -> ServiceState {
        Arc::new(
            Service::new(
                Config::default(),
                DatabaseConnection::Disconnected,
                provider,
            )
            .unwrap(),
        )
    }

    fn frodo() -> UserResponse {
        UserResponse {
            username: "frodo".into(),
            email: "frodo@shire.example".into(),
            first_name: "Frodo".into(),
            last_name: "Baggins".into(),
            ..Default::default()
        }
    }

    fn checkid_params(mode: &str) -> HashMap<String, String> {
        HashMap::from([
            ("openid.ns".into(), OPENID2_NS.into()),
            ("openid.mode".into(), mode.into()),
            (
                "openid.identity".into(),
                "http://localhost:8080/user/frodo".into(),
            ),
            (
                "openid.return_to".into(),
                "https://rp.example.com/return".into(),
            ),
            ("openid.realm".into(), "https://rp.example.com/".into()),
        ])
    }

    fn query_map(url: &Url) -> HashMap<String, String> {
        url.query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_nonce_roundtrip() {
        let nonce = generate_response_nonce(Utc::now());
        let (ts, salt) = split_nonce(&nonce).unwrap();
        assert_eq!(NONCE_SALT_LENGTH, salt.len());
        assert!((Utc::now().timestamp() - ts).abs() < 5);
        assert!(split_nonce("short").is_none());
    }

    #[test]
    fn test_signature_is_deterministic_and_keyed() {
        let assoc = new_association("scope".into(), AssocType::HmacSha256, 600);
        let mut message = Message::default();
        message.set("mode", "id_res");
        message.set("assoc_handle", assoc.handle.clone());
        let signed = vec!["mode".to_string(), "assoc_handle".to_string()];

        let sig = compute_signature(&assoc, &message, &signed).unwrap();
        assert_eq!(sig, compute_signature(&assoc, &message, &signed).unwrap());

        let other = new_association("scope".into(), AssocType::HmacSha256, 600);
        assert_ne!(sig, compute_signature(&other, &message, &signed).unwrap());
    }

    #[tokio::test]
    async fn test_process_undecodable_is_empty() {
        let engine = OpenIdProvider::new(&Config::default()).unwrap();
        let state = state_with(Provider::mocked_builder().build().unwrap());
        let session = Session::create(30);

        let result = engine
            .process(&state, &session, &HashMap::from([("a".into(), "b".into())]))
            .await
            .unwrap();
        assert_eq!(ProcessResult::Empty, result);
    }

    #[tokio::test]
    async fn test_associate_stores_and_returns_mac_key() {
        let engine = OpenIdProvider::new(&Config::default()).unwrap();
        let mut assoc_mock = MockAssociationProvider::default();
        assoc_mock
            .expect_store_association()
            .withf(|_, a: &Association| {
                a.server_url.ends_with("|normal") && a.secret.len() == 32
            })
            .returning(|_, _| Ok(()));
        let state = state_with(
            Provider::mocked_builder()
                .association(assoc_mock)
                .build()
                .unwrap(),
        );
        let session = Session::create(30);

        let params = HashMap::from([
            ("openid.ns".into(), OPENID2_NS.into()),
            ("openid.mode".into(), "associate".into()),
            ("openid.assoc_type".into(), "HMAC-SHA256".into()),
            ("openid.session_type".into(), "no-encryption".into()),
        ]);
        match engine.process(&state, &session, &params).await.unwrap() {
            ProcessResult::Body(body) => {
                assert!(body.contains("assoc_handle:"));
                assert!(body.contains("assoc_type:HMAC-SHA256"));
                assert!(body.contains("mac_key:"));
                let mac_line = body
                    .lines()
                    .find(|line| line.starts_with("mac_key:"))
                    .unwrap();
                let secret = BASE64.decode(&mac_line["mac_key:".len()..]).unwrap();
                assert_eq!(32, secret.len());
            }
            other => panic!("expected Body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_associate_rejects_dh_session() {
        let engine = OpenIdProvider::new(&Config::default()).unwrap();
        let state = state_with(Provider::mocked_builder().build().unwrap());
        let session = Session::create(30);

        let params = HashMap::from([
            ("openid.mode".into(), "associate".into()),
            ("openid.assoc_type".into(), "HMAC-SHA256".into()),
            ("openid.session_type".into(), "DH-SHA256".into()),
        ]);
        match engine.process(&state, &session, &params).await.unwrap() {
            ProcessResult::Body(body) => {
                assert!(body.contains("error_code:unsupported-type"));
            }
            other => panic!("expected Body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_checkid_unauthenticated_stashes_and_redirects() {
        let engine = OpenIdProvider::new(&Config::default()).unwrap();
        let state = state_with(Provider::mocked_builder().build().unwrap());
        let session = Session::create(30);

        let params = checkid_params("checkid_setup");
        match engine.process(&state, &session, &params).await.unwrap() {
            ProcessResult::Redirect(url) => {
                assert_eq!("/auth/login", url.path());
            }
            other => panic!("expected Redirect, got {other:?}"),
        }
        assert!(session.has_pending_openid());
    }

    #[tokio::test]
    async fn test_checkid_approved_signs_assertion_with_sreg() {
        let engine = OpenIdProvider::new(&Config::default()).unwrap();

        let mut identity_mock = MockIdentityProvider::default();
        identity_mock
            .expect_get_user()
            .withf(|_, u: &'_ str| u == "frodo")
            .returning(|_, _| Ok(Some(frodo())));

        let mut activity_mock = MockActivityProvider::default();
        // Recorded consent for the trust-root domain.
        activity_mock
            .expect_count_for_domain()
            .withf(|_, u: &'_ str, k: &ActivityKind, d: &'_ str| {
                u == "frodo" && *k == ActivityKind::Consent && d == "rp.example.com"
            })
            .returning(|_, _, _, _| Ok(1));
        activity_mock
            .expect_record()
            .withf(|_, r| r.kind == ActivityKind::AuthorizeCheckid)
            .returning(|_, r| {
                Ok(Activity {
                    id: 1,
                    username: r.username,
                    kind: r.kind,
                    activity_ts: Utc::now(),
                    actor_username: None,
                    came_from: r.came_from,
                    came_from_fqdn: r.came_from_fqdn,
                    detail: None,
                })
            });

        let mut assoc_mock = MockAssociationProvider::default();
        // No relying-party handle: a private association is stored.
        assoc_mock
            .expect_store_association()
            .withf(|_, a: &Association| a.server_url.ends_with("|dumb"))
            .returning(|_, _| Ok(()));

        let state = state_with(
            Provider::mocked_builder()
                .identity(identity_mock)
                .activity(activity_mock)
                .association(assoc_mock)
                .build()
                .unwrap(),
        );
        let session = Session::create(30);
        session.login("frodo");

        let params = checkid_params("checkid_setup");
        match engine.process(&state, &session, &params).await.unwrap() {
            ProcessResult::Redirect(url) => {
                let query = query_map(&url);
                assert_eq!("id_res", query["openid.mode"]);
                assert_eq!("Frodo Baggins", query["openid.sreg.fullname"]);
                assert_eq!("frodo", query["openid.sreg.nickname"]);
                assert_eq!("frodo@shire.example", query["openid.sreg.email"]);
                assert!(query.contains_key("openid.sig"));
                assert!(query.contains_key("openid.response_nonce"));
                assert!(query["openid.signed"].contains("sreg.email"));
            }
            other => panic!("expected Redirect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_checkid_without_consent() {
        let engine = OpenIdProvider::new(&Config::default()).unwrap();

        let mut identity_mock = MockIdentityProvider::default();
        identity_mock
            .expect_get_user()
            .returning(|_, _| Ok(Some(frodo())));
        let mut activity_mock = MockActivityProvider::default();
        activity_mock
            .expect_count_for_domain()
            .returning(|_, _, _, _| Ok(0));

        let state = state_with(
            Provider::mocked_builder()
                .identity(identity_mock)
                .activity(activity_mock)
                .build()
                .unwrap(),
        );
        let session = Session::create(30);
        session.login("frodo");

        // Setup mode is cancelled.
        match engine
            .process(&state, &session, &checkid_params("checkid_setup"))
            .await
            .unwrap()
        {
            ProcessResult::Redirect(url) => {
                assert_eq!("cancel", query_map(&url)["openid.mode"]);
            }
            other => panic!("expected Redirect, got {other:?}"),
        }

        // Immediate mode asks for setup.
        match engine
            .process(&state, &session, &checkid_params("checkid_immediate"))
            .await
            .unwrap()
        {
            ProcessResult::Redirect(url) => {
                assert_eq!("setup_needed", query_map(&url)["openid.mode"]);
            }
            other => panic!("expected Redirect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_check_authentication_roundtrip() {
        let config = Config::default();
        let engine = OpenIdProvider::new(&config).unwrap();
        let dumb_scope = engine.signing_scope(true);

        let association = new_association(dumb_scope.clone(), AssocType::HmacSha256, 600);

        // The assertion the relying party received.
        let nonce = generate_response_nonce(Utc::now());
        let mut assertion = Message::default();
        assertion.set("mode", "id_res");
        assertion.set("assoc_handle", association.handle.clone());
        assertion.set("response_nonce", nonce.clone());
        let signed = vec![
            "assoc_handle".to_string(),
            "response_nonce".to_string(),
            "signed".to_string(),
        ];
        assertion.set("signed", signed.join(","));
        let sig = compute_signature(&association, &assertion, &signed).unwrap();

        let mut assoc_mock = MockAssociationProvider::default();
        let assoc_clone = association.clone();
        let handle = association.handle.clone();
        assoc_mock
            .expect_get_association()
            .withf(move |_, scope: &'_ str, h: &Option<&str>| {
                scope.ends_with("|dumb") && *h == Some(handle.as_str())
            })
            .returning(move |_, _, _| Ok(Some(assoc_clone.clone())));
        assoc_mock
            .expect_use_nonce()
            .withf(|_, server_url: &'_ str, _, _| server_url.is_empty())
            .returning(|_, _, _, _| Ok(true));
        let handle = association.handle.clone();
        assoc_mock
            .expect_remove_association()
            .withf(move |_, scope: &'_ str, h: &'_ str| {
                scope.ends_with("|dumb") && h == handle.as_str()
            })
            .returning(|_, _, _| Ok(true));

        let state = state_with(
            Provider::mocked_builder()
                .association(assoc_mock)
                .build()
                .unwrap(),
        );
        let session = Session::create(30);

        let params = HashMap::from([
            ("openid.ns".into(), OPENID2_NS.into()),
            ("openid.mode".into(), "check_authentication".into()),
            ("openid.assoc_handle".into(), association.handle.clone()),
            ("openid.response_nonce".into(), nonce),
            ("openid.signed".into(), "assoc_handle,response_nonce,signed".into()),
            ("openid.sig".into(), sig),
        ]);
        match engine.process(&state, &session, &params).await.unwrap() {
            ProcessResult::Body(body) => assert!(body.contains("is_valid:true")),
            other => panic!("expected Body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_check_authentication_replayed_nonce_rejected() {
        let config = Config::default();
        let engine = OpenIdProvider::new(&config).unwrap();
        let association =
            new_association(engine.signing_scope(true), AssocType::HmacSha256, 600);

        let nonce = generate_response_nonce(Utc::now());
        let mut assertion = Message::default();
        assertion.set("mode", "id_res");
        assertion.set("assoc_handle", association.handle.clone());
        assertion.set("response_nonce", nonce.clone());
        let signed = vec!["assoc_handle".to_string(), "response_nonce".to_string()];
        let sig = compute_signature(&association, &assertion, &signed).unwrap();

        let mut assoc_mock = MockAssociationProvider::default();
        let assoc_clone = association.clone();
        assoc_mock
            .expect_get_association()
            .returning(move |_, _, _| Ok(Some(assoc_clone.clone())));
        // Second presentation within the skew window.
        assoc_mock.expect_use_nonce().returning(|_, _, _, _| Ok(false));

        let state = state_with(
            Provider::mocked_builder()
                .association(assoc_mock)
                .build()
                .unwrap(),
        );
        let session = Session::create(30);

        let params = HashMap::from([
            ("openid.mode".into(), "check_authentication".into()),
            ("openid.assoc_handle".into(), association.handle.clone()),
            ("openid.response_nonce".into(), nonce),
            ("openid.signed".into(), "assoc_handle,response_nonce".into()),
            ("openid.sig".into(), sig),
        ]);
        match engine.process(&state, &session, &params).await.unwrap() {
            ProcessResult::Body(body) => assert!(body.contains("is_valid:false")),
            other => panic!("expected Body, got {other:?}"),
        }
    }
}
