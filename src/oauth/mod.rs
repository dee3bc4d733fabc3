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

//! # OAuth2 provider
//!
//! Issues and validates authorization codes and access tokens for client
//! applications consuming the shared user directory. The client id of a
//! registered application is its domain name; a (user, client) pair holds
//! at most one live grant, moving from the code phase to the token phase
//! on redemption. Codes and tokens are fixed-length random strings from a
//! CSPRNG, and every validator rejects implausible candidates before any
//! store lookup.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use rand::distr::{Alphanumeric, SampleString};
use sha2::{Digest, Sha256};

pub mod backend;
pub mod error;
#[cfg(test)]
pub mod mock;
pub mod types;
#[cfg(test)]
pub use mock::MockOauthProvider;

use crate::config::Config;
use crate::gatehouse::ServiceState;
use crate::identity::IdentityApi;
use crate::oauth::backend::{OauthBackend, sql::SqlBackend};
use crate::oauth::error::OauthProviderError;
use crate::registry::RegistryApi;

pub use types::{OauthApi, UNDEFINED_SECRET};

/// Length of the generated client secrets (codes and tokens follow the
/// configured token length instead).
const CLIENT_SECRET_LENGTH: usize = 32;

/// Hash a client secret for storage and comparison. Digests have a fixed
/// structure, so the comparison shape does not depend on the input.
pub fn hash_secret<S: AsRef<[u8]>>(secret: S) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_ref());
    format!("{:x}", hasher.finalize())
}

#[derive(Clone, Debug)]
pub struct OauthProvider {
    config: Config,
    /// Whether token validation observes expiry. Fixed at construction.
    tokens_expire: bool,
    backend_driver: Box<dyn OauthBackend>,
}

impl OauthProvider {
    pub fn new(config: &Config) -> Result<Self, OauthProviderError> {
        let mut backend_driver = match config.oauth.driver.as_str() {
            "sql" => Box::new(SqlBackend::default()),
            _ => {
                return Err(OauthProviderError::UnsupportedDriver(
                    config.oauth.driver.clone(),
                ));
            }
        };
        backend_driver.set_config(config.clone());
        Ok(Self {
            config: config.clone(),
            tokens_expire: config.oauth.tokens_expire,
            backend_driver,
        })
    }

    fn token_expiration(&self) -> DateTime<Utc> {
        Utc::now() + TimeDelta::days(self.config.oauth.token_expires_days)
    }

    fn auth_code_expiration(&self) -> DateTime<Utc> {
        Utc::now() + TimeDelta::minutes(self.config.oauth.auth_code_expires_minutes)
    }

    /// Expiry cutoff for token validation. With `tokens_expire` disabled
    /// the epoch start keeps every stored grant valid.
    fn expiry_cutoff(&self) -> DateTime<Utc> {
        if self.tokens_expire {
            Utc::now()
        } else {
            DateTime::UNIX_EPOCH
        }
    }

    /// Defense against sentinel-collision forgery: candidates shorter than
    /// a real credential, or equal to the sentinel, never reach the store.
    fn credential_plausible(&self, candidate: &str) -> bool {
        candidate.len() >= self.config.oauth.token_length && candidate != UNDEFINED_SECRET
    }

    fn random_string(len: usize) -> String {
        Alphanumeric.sample_string(&mut rand::rng(), len)
    }
}

#[async_trait]
impl OauthApi for OauthProvider {
    /// Generate a random authorization code.
    fn generate_authorization_code(&self) -> String {
        Self::random_string(self.config.oauth.token_length)
    }

    /// Generate a random access token.
    fn generate_access_token(&self) -> String {
        Self::random_string(self.config.oauth.token_length)
    }

    /// Generate a client secret for the domain and return the plaintext.
    #[tracing::instrument(level = "info", skip(self, state))]
    async fn create_client_secret<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
    ) -> Result<String, OauthProviderError> {
        let domain = state
            .provider
            .get_registry_provider()
            .get_domain(state, client_id)
            .await?
            .ok_or_else(|| OauthProviderError::InvalidClient(client_id.to_string()))?;

        let secret = Self::random_string(CLIENT_SECRET_LENGTH);
        state
            .provider
            .get_registry_provider()
            .set_client_secret(state, &domain.name, &hash_secret(&secret))
            .await?;
        Ok(secret)
    }

    /// Is a domain with this ID registered?
    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn validate_client_id<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
    ) -> Result<bool, OauthProviderError> {
        Ok(state
            .provider
            .get_registry_provider()
            .get_domain(state, client_id)
            .await?
            .is_some())
    }

    /// Is the secret correct for this domain?
    #[tracing::instrument(level = "debug", skip(self, state, client_secret))]
    async fn validate_client_secret<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
        client_secret: &'a str,
    ) -> Result<bool, OauthProviderError> {
        let domain = state
            .provider
            .get_registry_provider()
            .get_domain(state, client_id)
            .await?;
        Ok(domain
            .and_then(|d| d.client_secret_hash)
            .map(|stored| stored == hash_secret(client_secret))
            .unwrap_or(false))
    }

    /// The open-redirect defense.
    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn validate_redirect_uri<'a>(
        &self,
        state: &ServiceState,
        referrer_domain: Option<&'a str>,
        redirect_uri: &'a str,
    ) -> Result<bool, OauthProviderError> {
        let Some(req_domain) = referrer_domain else {
            return Ok(false);
        };
        let Some(rdr_domain) = crate::common::domain_of(redirect_uri) else {
            return Ok(false);
        };
        if req_domain != rdr_domain {
            return Ok(false);
        }
        Ok(state
            .provider
            .get_registry_provider()
            .find_domain(state, req_domain)
            .await?
            .is_some())
    }

    /// Upsert the single grant row for the pair into the code phase.
    #[tracing::instrument(level = "info", skip(self, state, code))]
    async fn persist_authorization_code<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
        username: &'a str,
        code: &'a str,
    ) -> Result<(), OauthProviderError> {
        self.backend_driver
            .upsert_authorization_code(state, client_id, username, code, self.auth_code_expiration())
            .await
    }

    /// Redeem the code for a token. Exactly one concurrent redemption may
    /// succeed; the loser fails closed.
    #[tracing::instrument(level = "info", skip(self, state, auth_code, token))]
    async fn persist_access_token<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
        auth_code: &'a str,
        token: &'a str,
    ) -> Result<(), OauthProviderError> {
        if !self.credential_plausible(auth_code) {
            return Err(OauthProviderError::InvalidGrant);
        }
        let redeemed = self
            .backend_driver
            .redeem_authorization_code(state, client_id, auth_code, token, self.token_expiration())
            .await?;
        if !redeemed {
            return Err(OauthProviderError::InvalidGrant);
        }
        Ok(())
    }

    /// Look for a live authorization based on code and domain.
    #[tracing::instrument(level = "debug", skip(self, state, auth_code))]
    async fn validate_auth_code<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
        auth_code: &'a str,
    ) -> Result<bool, OauthProviderError> {
        if !self.credential_plausible(auth_code) {
            return Ok(false);
        }
        Ok(self
            .backend_driver
            .find_grant_by_auth_code(state, client_id, auth_code, Utc::now())
            .await?
            .is_some())
    }

    /// The username associated with a live token, if any.
    #[tracing::instrument(level = "debug", skip(self, state, token))]
    async fn user_for_access_token<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
        token: &'a str,
    ) -> Result<Option<String>, OauthProviderError> {
        if !self.credential_plausible(token) {
            return Ok(None);
        }
        Ok(self
            .backend_driver
            .find_grant_by_access_token(state, client_id, token, self.expiry_cutoff())
            .await?
            .map(|grant| grant.username))
    }

    /// Look for a live authorization based on token and username.
    #[tracing::instrument(level = "debug", skip(self, state, token))]
    async fn validate_user_with_access_token<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
        token: &'a str,
    ) -> Result<bool, OauthProviderError> {
        if !self.credential_plausible(token) {
            return Ok(false);
        }
        let grant = self
            .backend_driver
            .find_grant_by_user_token(state, username, token, self.expiry_cutoff())
            .await?;
        if grant.is_none() {
            return Ok(false);
        }
        // A token stops working the moment the account does.
        Ok(state
            .provider
            .get_identity_provider()
            .get_user(state, username)
            .await?
            .map(|user| user.is_active())
            .unwrap_or(false))
    }
}
