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
//! Internal mock structures for the [AssociationProvider].

use async_trait::async_trait;
use mockall::mock;

use crate::association::error::AssociationProviderError;
use crate::association::types::*;
use crate::config::Config;
use crate::gatehouse::ServiceState;

mock! {
    pub AssociationProvider {
        pub fn new(cfg: &Config) -> Result<Self, AssociationProviderError>;
    }

    #[async_trait]
    impl AssociationApi for AssociationProvider {
        async fn store_association(
            &self,
            state: &ServiceState,
            association: Association,
        ) -> Result<(), AssociationProviderError>;

        async fn get_association<'a>(
            &self,
            state: &ServiceState,
            server_url: &'a str,
            handle: Option<&'a str>,
        ) -> Result<Option<Association>, AssociationProviderError>;

        async fn remove_association<'a>(
            &self,
            state: &ServiceState,
            server_url: &'a str,
            handle: &'a str,
        ) -> Result<bool, AssociationProviderError>;

        async fn use_nonce<'a>(
            &self,
            state: &ServiceState,
            server_url: &'a str,
            timestamp: i64,
            salt: &'a str,
        ) -> Result<bool, AssociationProviderError>;

        async fn cleanup_associations(
            &self,
            state: &ServiceState,
        ) -> Result<u64, AssociationProviderError>;
    }

    impl Clone for AssociationProvider {
        fn clone(&self) -> Self;
    }
}
