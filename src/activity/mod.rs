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

//! # Activity log provider
//!
//! Append-only audit trail of user-facing events. The policy chain derives
//! its "first login from this domain" and "last login or checkid" facts
//! from these records, so recording must happen in the same transaction as
//! the action it describes.

use async_trait::async_trait;

pub mod backend;
pub mod error;
#[cfg(test)]
pub mod mock;
pub mod types;
#[cfg(test)]
pub use mock::MockActivityProvider;

use crate::activity::backend::{ActivityBackend, sql::SqlBackend};
use crate::activity::error::ActivityProviderError;
use crate::activity::types::{Activity, ActivityKind, ActivityRecord};
use crate::common::domain_of;
use crate::config::Config;
use crate::gatehouse::ServiceState;

pub use types::ActivityApi;

#[derive(Clone, Debug)]
pub struct ActivityProvider {
    backend_driver: Box<dyn ActivityBackend>,
}

impl ActivityProvider {
    pub fn new(config: &Config) -> Result<Self, ActivityProviderError> {
        let mut backend_driver = match config.activity.driver.as_str() {
            "sql" => Box::new(SqlBackend::default()),
            _ => {
                return Err(ActivityProviderError::UnsupportedDriver(
                    config.activity.driver.clone(),
                ));
            }
        };
        backend_driver.set_config(config.clone());
        Ok(Self { backend_driver })
    }
}

#[async_trait]
impl ActivityApi for ActivityProvider {
    /// Append an audit record.
    #[tracing::instrument(level = "info", skip(self, state))]
    async fn record(
        &self,
        state: &ServiceState,
        record: ActivityRecord,
    ) -> Result<Activity, ActivityProviderError> {
        let mut record = record;
        if record.came_from_fqdn.is_none() {
            record.came_from_fqdn = record.came_from.as_deref().and_then(domain_of);
        }
        self.backend_driver.record(state, record).await
    }

    /// Most recent activity of any of the given kinds for the user.
    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn last_activity_of_kinds<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
        kinds: &'a [ActivityKind],
    ) -> Result<Option<Activity>, ActivityProviderError> {
        self.backend_driver
            .last_activity_of_kinds(state, username, kinds)
            .await
    }

    /// How many records of the kind the user has from the given domain.
    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn count_for_domain<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
        kind: ActivityKind,
        domain: &'a str,
    ) -> Result<u64, ActivityProviderError> {
        self.backend_driver
            .count_for_domain(state, username, kind, domain)
            .await
    }
}
