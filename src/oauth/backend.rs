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
use dyn_clone::DynClone;

use crate::config::Config;
use crate::gatehouse::ServiceState;
use crate::oauth::error::OauthProviderError;
use crate::oauth::types::*;

pub mod error;
pub mod sql;

pub use sql::SqlBackend;

/// Backend driver interface for the OAuth2 grant store.
#[async_trait]
pub trait OauthBackend: DynClone + Send + Sync + std::fmt::Debug {
    /// Set config.
    fn set_config(&mut self, config: Config);

    /// Upsert the single grant row for the pair into the code phase.
    async fn upsert_authorization_code<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
        username: &'a str,
        code: &'a str,
        valid_until: DateTime<Utc>,
    ) -> Result<(), OauthProviderError>;

    /// Swap the code for the token. Returns false when no live row matched
    /// (already redeemed concurrently, or never issued).
    async fn redeem_authorization_code<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
        auth_code: &'a str,
        token: &'a str,
        valid_until: DateTime<Utc>,
    ) -> Result<bool, OauthProviderError>;

    /// Live grant carrying the code, observing the expiry cutoff.
    async fn find_grant_by_auth_code<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
        auth_code: &'a str,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<Grant>, OauthProviderError>;

    /// Live grant carrying the token for the client.
    async fn find_grant_by_access_token<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
        token: &'a str,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<Grant>, OauthProviderError>;

    /// Live grant carrying the token for the user.
    async fn find_grant_by_user_token<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
        token: &'a str,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<Grant>, OauthProviderError>;
}

dyn_clone::clone_trait_object!(OauthBackend);
