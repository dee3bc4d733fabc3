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

use crate::activity::error::ActivityProviderError;
use crate::activity::types::*;
use crate::config::Config;
use crate::gatehouse::ServiceState;

pub mod error;
pub mod sql;

pub use sql::SqlBackend;

/// Backend driver interface for the activity log.
#[async_trait]
pub trait ActivityBackend: DynClone + Send + Sync + std::fmt::Debug {
    /// Set config.
    fn set_config(&mut self, config: Config);

    /// Append an audit record.
    async fn record(
        &self,
        state: &ServiceState,
        record: ActivityRecord,
    ) -> Result<Activity, ActivityProviderError>;

    /// Most recent activity of any of the given kinds for the user.
    async fn last_activity_of_kinds<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
        kinds: &'a [ActivityKind],
    ) -> Result<Option<Activity>, ActivityProviderError>;

    /// How many records of the kind the user has from the given domain.
    async fn count_for_domain<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
        kind: ActivityKind,
        domain: &'a str,
    ) -> Result<u64, ActivityProviderError>;
}

dyn_clone::clone_trait_object!(ActivityBackend);
