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

//! # Association/nonce store provider
//!
//! Persists the OpenID shared-secret associations and the replay-protection
//! nonces. An association is dead the moment `issued + lifetime` passes;
//! of several live associations for one relying party the most recently
//! issued wins. Nonce consumption is race-safe: of two concurrent requests
//! presenting the same value at most one is accepted.

use async_trait::async_trait;

pub mod backend;
pub mod error;
#[cfg(test)]
pub mod mock;
pub mod types;
#[cfg(test)]
pub use mock::MockAssociationProvider;

use crate::association::backend::{AssociationBackend, sql::SqlBackend};
use crate::association::error::AssociationProviderError;
use crate::association::types::Association;
use crate::config::Config;
use crate::gatehouse::ServiceState;

pub use types::AssociationApi;

#[derive(Clone, Debug)]
pub struct AssociationProvider {
    backend_driver: Box<dyn AssociationBackend>,
}

impl AssociationProvider {
    pub fn new(config: &Config) -> Result<Self, AssociationProviderError> {
        let mut backend_driver = match config.association.driver.as_str() {
            "sql" => Box::new(SqlBackend::default()),
            _ => {
                return Err(AssociationProviderError::UnsupportedDriver(
                    config.association.driver.clone(),
                ));
            }
        };
        backend_driver.set_config(config.clone());
        Ok(Self { backend_driver })
    }
}

#[async_trait]
impl AssociationApi for AssociationProvider {
    /// Persist a new association.
    #[tracing::instrument(level = "debug", skip(self, state, association))]
    async fn store_association(
        &self,
        state: &ServiceState,
        association: Association,
    ) -> Result<(), AssociationProviderError> {
        self.backend_driver
            .store_association(state, association)
            .await
    }

    /// Fetch the live association for the relying party.
    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_association<'a>(
        &self,
        state: &ServiceState,
        server_url: &'a str,
        handle: Option<&'a str>,
    ) -> Result<Option<Association>, AssociationProviderError> {
        self.backend_driver
            .get_association(state, server_url, handle)
            .await
    }

    /// Drop the association.
    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn remove_association<'a>(
        &self,
        state: &ServiceState,
        server_url: &'a str,
        handle: &'a str,
    ) -> Result<bool, AssociationProviderError> {
        self.backend_driver
            .remove_association(state, server_url, handle)
            .await
    }

    /// Consume a response nonce.
    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn use_nonce<'a>(
        &self,
        state: &ServiceState,
        server_url: &'a str,
        timestamp: i64,
        salt: &'a str,
    ) -> Result<bool, AssociationProviderError> {
        self.backend_driver
            .use_nonce(state, server_url, timestamp, salt)
            .await
    }

    /// Hard-delete expired associations.
    #[tracing::instrument(level = "info", skip(self, state))]
    async fn cleanup_associations(
        &self,
        state: &ServiceState,
    ) -> Result<u64, AssociationProviderError> {
        self.backend_driver.cleanup_associations(state).await
    }
}
