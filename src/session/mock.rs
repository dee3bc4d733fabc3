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
//! Internal mock structures for the [SessionProvider].

use async_trait::async_trait;
use mockall::mock;

use crate::config::Config;
use crate::gatehouse::ServiceState;
use crate::session::error::SessionProviderError;
use crate::session::types::*;

mock! {
    pub SessionProvider {
        pub fn new(cfg: &Config) -> Result<Self, SessionProviderError>;
    }

    #[async_trait]
    impl SessionApi for SessionProvider {
        async fn load<'a>(
            &self,
            state: &ServiceState,
            id: &'a str,
        ) -> Result<Option<SessionData>, SessionProviderError>;

        async fn save(
            &self,
            state: &ServiceState,
            data: SessionData,
        ) -> Result<(), SessionProviderError>;

        async fn delete<'a>(
            &self,
            state: &ServiceState,
            id: &'a str,
        ) -> Result<(), SessionProviderError>;
    }

    impl Clone for SessionProvider {
        fn clone(&self) -> Self;
    }
}
