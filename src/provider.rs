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
//! # Provider manager
//!
//! Provider manager provides access to the individual service providers.
//! This gives an easy interface for passing the overall manager down to
//! the individual providers that might need to call other providers while
//! also allowing an easy injection of mocked providers.
use derive_builder::Builder;
use mockall_double::double;

use crate::activity::ActivityApi;
#[double]
use crate::activity::ActivityProvider;
use crate::association::AssociationApi;
#[double]
use crate::association::AssociationProvider;
use crate::config::Config;
use crate::error::GatehouseError;
use crate::identity::IdentityApi;
#[double]
use crate::identity::IdentityProvider;
use crate::oauth::OauthApi;
#[double]
use crate::oauth::OauthProvider;
use crate::openid::OpenIdApi;
#[double]
use crate::openid::OpenIdProvider;
use crate::registry::RegistryApi;
#[double]
use crate::registry::RegistryProvider;
use crate::session::SessionApi;
#[double]
use crate::session::SessionProvider;

/// Global provider manager.
#[derive(Builder, Clone)]
// It is necessary to use the owned pattern since otherwise builder invokes clone which immediately
// confuses mockall used in tests
#[builder(pattern = "owned")]
pub struct Provider {
    /// Configuration.
    pub config: Config,
    /// Activity log provider.
    activity: ActivityProvider,
    /// Association/nonce store provider.
    association: AssociationProvider,
    /// Identity (credential store) provider.
    identity: IdentityProvider,
    /// OAuth2 provider.
    oauth: OauthProvider,
    /// OpenID protocol engine.
    openid: OpenIdProvider,
    /// Domain registry provider.
    registry: RegistryProvider,
    /// Session store provider.
    session: SessionProvider,
}

impl Provider {
    pub fn new(cfg: Config) -> Result<Self, GatehouseError> {
        let activity_provider = ActivityProvider::new(&cfg)?;
        let association_provider = AssociationProvider::new(&cfg)?;
        let identity_provider = IdentityProvider::new(&cfg)?;
        let oauth_provider = OauthProvider::new(&cfg)?;
        let openid_provider = OpenIdProvider::new(&cfg)?;
        let registry_provider = RegistryProvider::new(&cfg)?;
        let session_provider = SessionProvider::new(&cfg)?;

        Ok(Self {
            config: cfg,
            activity: activity_provider,
            association: association_provider,
            identity: identity_provider,
            oauth: oauth_provider,
            openid: openid_provider,
            registry: registry_provider,
            session: session_provider,
        })
    }

    /// Get the activity log provider.
    pub fn get_activity_provider(&self) -> &impl ActivityApi {
        &self.activity
    }

    /// Get the association/nonce store provider.
    pub fn get_association_provider(&self) -> &impl AssociationApi {
        &self.association
    }

    /// Get the identity provider.
    pub fn get_identity_provider(&self) -> &impl IdentityApi {
        &self.identity
    }

    /// Get the OAuth2 provider.
    pub fn get_oauth_provider(&self) -> &impl OauthApi {
        &self.oauth
    }

    /// Get the OpenID protocol engine.
    pub fn get_openid_provider(&self) -> &impl OpenIdApi {
        &self.openid
    }

    /// Get the domain registry provider.
    pub fn get_registry_provider(&self) -> &impl RegistryApi {
        &self.registry
    }

    /// Get the session store provider.
    pub fn get_session_provider(&self) -> &impl SessionApi {
        &self.session
    }
}

#[cfg(test)]
impl Provider {
    pub fn mocked_builder() -> ProviderBuilder {
        let config = Config::default();
        let activity_mock = crate::activity::MockActivityProvider::default();
        let association_mock = crate::association::MockAssociationProvider::default();
        let identity_mock = crate::identity::MockIdentityProvider::default();
        let oauth_mock = crate::oauth::MockOauthProvider::default();
        let openid_mock = crate::openid::MockOpenIdProvider::default();
        let registry_mock = crate::registry::MockRegistryProvider::default();
        let session_mock = crate::session::MockSessionProvider::default();

        ProviderBuilder::default()
            .config(config)
            .activity(activity_mock)
            .association(association_mock)
            .identity(identity_mock)
            .oauth(oauth_mock)
            .openid(openid_mock)
            .registry(registry_mock)
            .session(session_mock)
    }
}
