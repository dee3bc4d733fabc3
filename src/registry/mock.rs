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
//! Internal mock structures for the [RegistryProvider].

use async_trait::async_trait;
use mockall::mock;

use crate::config::Config;
use crate::gatehouse::ServiceState;
use crate::registry::error::RegistryProviderError;
use crate::registry::types::*;

mock! {
    pub RegistryProvider {
        pub fn new(cfg: &Config) -> Result<Self, RegistryProviderError>;
    }

    #[async_trait]
    impl RegistryApi for RegistryProvider {
        async fn get_domain<'a>(
            &self,
            state: &ServiceState,
            name: &'a str,
        ) -> Result<Option<Domain>, RegistryProviderError>;

        async fn find_domain<'a>(
            &self,
            state: &ServiceState,
            name: &'a str,
        ) -> Result<Option<Domain>, RegistryProviderError>;

        async fn create_domain(
            &self,
            state: &ServiceState,
            domain: DomainCreate,
        ) -> Result<Domain, RegistryProviderError>;

        async fn set_client_secret<'a>(
            &self,
            state: &ServiceState,
            name: &'a str,
            secret_hash: &'a str,
        ) -> Result<(), RegistryProviderError>;

        async fn domain_defaults(
            &self,
            state: &ServiceState,
        ) -> Result<DomainDefaults, RegistryProviderError>;
    }

    impl Clone for RegistryProvider {
        fn clone(&self) -> Self;
    }
}
