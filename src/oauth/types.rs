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

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::gatehouse::ServiceState;
use crate::oauth::error::OauthProviderError;

/// Sentinel occupying the inactive slot of a grant. Real codes and tokens
/// are far longer, and every validator rejects the sentinel outright, so a
/// forged lookup for it can never match.
pub const UNDEFINED_SECRET: &str = "TBD";

/// The authorization-code-then-access-token record for one (user, client)
/// pair. Exactly one of `auth_code` / `access_token` is live at any time.
#[derive(Builder, Clone, Debug, Deserialize, PartialEq, Serialize)]
#[builder(setter(into))]
pub struct Grant {
    pub username: String,

    pub client_id: String,

    pub access_token: String,

    pub auth_code: String,

    pub valid_until: DateTime<Utc>,
}

impl Grant {
    /// Whether the grant is still within its validity window at the given
    /// cutoff instant.
    pub fn is_valid_at(&self, cutoff: DateTime<Utc>) -> bool {
        self.valid_until > cutoff
    }
}

#[async_trait]
pub trait OauthApi: Send + Sync + Clone {
    /// Generate a random authorization code.
    fn generate_authorization_code(&self) -> String;

    /// Generate a random access token.
    fn generate_access_token(&self) -> String;

    /// Generate a client secret for the domain, store its hash and return
    /// the plaintext. This is the only time the plaintext exists.
    async fn create_client_secret<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
    ) -> Result<String, OauthProviderError>;

    /// Is a domain with this ID registered?
    async fn validate_client_id<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
    ) -> Result<bool, OauthProviderError>;

    /// Is the secret correct for this domain?
    async fn validate_client_secret<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
        client_secret: &'a str,
    ) -> Result<bool, OauthProviderError>;

    /// The open-redirect defense: the redirect target must resolve to the
    /// same domain as the requesting referrer, and that domain must be
    /// registered (exact or wildcard).
    async fn validate_redirect_uri<'a>(
        &self,
        state: &ServiceState,
        referrer_domain: Option<&'a str>,
        redirect_uri: &'a str,
    ) -> Result<bool, OauthProviderError>;

    /// Upsert the single grant row for the pair into the code phase.
    async fn persist_authorization_code<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
        username: &'a str,
        code: &'a str,
    ) -> Result<(), OauthProviderError>;

    /// Redeem the code: discard it, store the token, reset the timer.
    /// Exactly one concurrent redemption may succeed; the loser fails
    /// closed as an invalid grant.
    async fn persist_access_token<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
        auth_code: &'a str,
        token: &'a str,
    ) -> Result<(), OauthProviderError>;

    /// Look for a live authorization based on code and domain.
    async fn validate_auth_code<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
        auth_code: &'a str,
    ) -> Result<bool, OauthProviderError>;

    /// The username associated with a live token, if any.
    async fn user_for_access_token<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
        token: &'a str,
    ) -> Result<Option<String>, OauthProviderError>;

    /// Look for a live authorization based on token and username; the user
    /// must be neither locked nor disabled.
    async fn validate_user_with_access_token<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
        token: &'a str,
    ) -> Result<bool, OauthProviderError>;
}
