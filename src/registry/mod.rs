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

//! # Domain registry provider
//!
//! A domain is a relying-party website consuming this provider's identity
//! assertions, and doubles as the OAuth2 client record (the client id IS
//! the domain name). A profile name resolves via exact match first, then
//! the longest-suffix wildcard match (`*.example.com`).

use async_trait::async_trait;
use validator::Validate;

pub mod backend;
pub mod error;
#[cfg(test)]
pub mod mock;
pub mod types;
#[cfg(test)]
pub use mock::MockRegistryProvider;

use crate::config::Config;
use crate::gatehouse::ServiceState;
use crate::registry::backend::{RegistryBackend, sql::SqlBackend};
use crate::registry::error::RegistryProviderError;
use crate::registry::types::{Domain, DomainCreate, DomainDefaults};

pub use types::RegistryApi;

#[derive(Clone, Debug)]
pub struct RegistryProvider {
    backend_driver: Box<dyn RegistryBackend>,
}

impl RegistryProvider {
    pub fn new(config: &Config) -> Result<Self, RegistryProviderError> {
        let mut backend_driver = match config.registry.driver.as_str() {
            "sql" => Box::new(SqlBackend::default()),
            _ => {
                return Err(RegistryProviderError::UnsupportedDriver(
                    config.registry.driver.clone(),
                ));
            }
        };
        backend_driver.set_config(config.clone());
        Ok(Self { backend_driver })
    }
}

#[async_trait]
impl RegistryApi for RegistryProvider {
    /// Get the domain profile by its exact name.
    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_domain<'a>(
        &self,
        state: &ServiceState,
        name: &'a str,
    ) -> Result<Option<Domain>, RegistryProviderError> {
        self.backend_driver.get_domain(state, name).await
    }

    /// Resolve the domain profile for a request host.
    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn find_domain<'a>(
        &self,
        state: &ServiceState,
        name: &'a str,
    ) -> Result<Option<Domain>, RegistryProviderError> {
        self.backend_driver.find_domain(state, name).await
    }

    /// Register a new relying party.
    #[tracing::instrument(level = "info", skip(self, state))]
    async fn create_domain(
        &self,
        state: &ServiceState,
        domain: DomainCreate,
    ) -> Result<Domain, RegistryProviderError> {
        domain.validate()?;
        self.backend_driver.create_domain(state, domain).await
    }

    /// Store the hash of a freshly generated client secret.
    #[tracing::instrument(level = "info", skip(self, state, secret_hash))]
    async fn set_client_secret<'a>(
        &self,
        state: &ServiceState,
        name: &'a str,
        secret_hash: &'a str,
    ) -> Result<(), RegistryProviderError> {
        self.backend_driver
            .set_client_secret(state, name, secret_hash)
            .await
    }

    /// Effective system defaults for domains without explicit settings.
    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn domain_defaults(
        &self,
        state: &ServiceState,
    ) -> Result<DomainDefaults, RegistryProviderError> {
        self.backend_driver.domain_defaults(state).await
    }
}
