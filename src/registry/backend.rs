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
use dyn_clone::DynClone;

use crate::config::Config;
use crate::gatehouse::ServiceState;
use crate::registry::error::RegistryProviderError;
use crate::registry::types::*;

pub mod error;
pub mod sql;

pub use sql::SqlBackend;

/// Backend driver interface for the domain registry.
#[async_trait]
pub trait RegistryBackend: DynClone + Send + Sync + std::fmt::Debug {
    /// Set config.
    fn set_config(&mut self, config: Config);

    /// Get the domain by its exact name.
    async fn get_domain<'a>(
        &self,
        state: &ServiceState,
        name: &'a str,
    ) -> Result<Option<Domain>, RegistryProviderError>;

    /// Resolve a host name: exact match, then longest-suffix wildcard.
    async fn find_domain<'a>(
        &self,
        state: &ServiceState,
        name: &'a str,
    ) -> Result<Option<Domain>, RegistryProviderError>;

    /// Register a new domain.
    async fn create_domain(
        &self,
        state: &ServiceState,
        domain: DomainCreate,
    ) -> Result<Domain, RegistryProviderError>;

    /// Store the hash of the client secret.
    async fn set_client_secret<'a>(
        &self,
        state: &ServiceState,
        name: &'a str,
        secret_hash: &'a str,
    ) -> Result<(), RegistryProviderError>;

    /// Effective system defaults for domains without explicit settings.
    async fn domain_defaults(
        &self,
        state: &ServiceState,
    ) -> Result<DomainDefaults, RegistryProviderError>;
}

dyn_clone::clone_trait_object!(RegistryBackend);
