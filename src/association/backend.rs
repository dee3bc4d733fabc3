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

use crate::association::error::AssociationProviderError;
use crate::association::types::*;
use crate::config::Config;
use crate::gatehouse::ServiceState;

pub mod error;
pub mod sql;

pub use sql::SqlBackend;

/// Backend driver interface for the association/nonce store.
#[async_trait]
pub trait AssociationBackend: DynClone + Send + Sync + std::fmt::Debug {
    /// Set config.
    fn set_config(&mut self, config: Config);

    /// Persist a new association.
    async fn store_association(
        &self,
        state: &ServiceState,
        association: Association,
    ) -> Result<(), AssociationProviderError>;

    /// Fetch the live association.
    async fn get_association<'a>(
        &self,
        state: &ServiceState,
        server_url: &'a str,
        handle: Option<&'a str>,
    ) -> Result<Option<Association>, AssociationProviderError>;

    /// Drop the association.
    async fn remove_association<'a>(
        &self,
        state: &ServiceState,
        server_url: &'a str,
        handle: &'a str,
    ) -> Result<bool, AssociationProviderError>;

    /// Consume a response nonce.
    async fn use_nonce<'a>(
        &self,
        state: &ServiceState,
        server_url: &'a str,
        timestamp: i64,
        salt: &'a str,
    ) -> Result<bool, AssociationProviderError>;

    /// Hard-delete expired associations.
    async fn cleanup_associations(
        &self,
        state: &ServiceState,
    ) -> Result<u64, AssociationProviderError>;
}

dyn_clone::clone_trait_object!(AssociationBackend);
