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
use crate::session::error::SessionProviderError;
use crate::session::types::SessionData;

pub mod error;
pub mod sql;

pub use sql::SqlBackend;

/// Backend driver interface for the session store.
#[async_trait]
pub trait SessionBackend: DynClone + Send + Sync + std::fmt::Debug {
    /// Set config.
    fn set_config(&mut self, config: Config);

    /// Load a live session by its cookie id.
    async fn load<'a>(
        &self,
        state: &ServiceState,
        id: &'a str,
    ) -> Result<Option<SessionData>, SessionProviderError>;

    /// Persist the session state.
    async fn save(
        &self,
        state: &ServiceState,
        data: SessionData,
    ) -> Result<(), SessionProviderError>;

    /// Drop the session row.
    async fn delete<'a>(
        &self,
        state: &ServiceState,
        id: &'a str,
    ) -> Result<(), SessionProviderError>;
}

dyn_clone::clone_trait_object!(SessionBackend);
