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
//! Internal mock structures for the [OpenIdProvider].

use async_trait::async_trait;
use mockall::mock;
use std::collections::HashMap;

use crate::config::Config;
use crate::gatehouse::ServiceState;
use crate::openid::error::OpenIdProviderError;
use crate::openid::types::{OpenIdApi, ProcessResult};
use crate::session::Session;

mock! {
    pub OpenIdProvider {
        pub fn new(cfg: &Config) -> Result<Self, OpenIdProviderError>;
    }

    #[async_trait]
    impl OpenIdApi for OpenIdProvider {
        async fn process(
            &self,
            state: &ServiceState,
            session: &Session,
            params: &HashMap<String, String>,
        ) -> Result<ProcessResult, OpenIdProviderError>;
    }

    impl Clone for OpenIdProvider {
        fn clone(&self) -> Self;
    }
}
