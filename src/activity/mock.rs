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
//! Internal mock structures for the [ActivityProvider].

use async_trait::async_trait;
use mockall::mock;

use crate::activity::error::ActivityProviderError;
use crate::activity::types::*;
use crate::config::Config;
use crate::gatehouse::ServiceState;

mock! {
    pub ActivityProvider {
        pub fn new(cfg: &Config) -> Result<Self, ActivityProviderError>;
    }

    #[async_trait]
    impl ActivityApi for ActivityProvider {
        async fn record(
            &self,
            state: &ServiceState,
            record: ActivityRecord,
        ) -> Result<Activity, ActivityProviderError>;

        async fn last_activity_of_kinds<'a>(
            &self,
            state: &ServiceState,
            username: &'a str,
            kinds: &'a [ActivityKind],
        ) -> Result<Option<Activity>, ActivityProviderError>;

        async fn count_for_domain<'a>(
            &self,
            state: &ServiceState,
            username: &'a str,
            kind: ActivityKind,
            domain: &'a str,
        ) -> Result<u64, ActivityProviderError>;
    }

    impl Clone for ActivityProvider {
        fn clone(&self) -> Self;
    }
}
