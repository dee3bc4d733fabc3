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
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::gatehouse::ServiceState;
use crate::registry::error::RegistryProviderError;

/// Relying party / OAuth2 client profile.
#[derive(Builder, Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[builder(setter(into))]
pub struct Domain {
    /// FQDN, possibly with a leading `*.` wildcard label.
    pub name: String,

    #[builder(default)]
    pub display_name: String,

    /// Minutes a login from this domain stays valid. 0 means a password is
    /// always required; negative defers to the system default.
    #[builder(default = "-1")]
    pub password_valid: i32,

    /// Failed logins before lockout; negative defers to the system default.
    #[builder(default = "-1")]
    pub max_attempts: i32,

    /// Salted hash of the OAuth2 client secret. Plaintext is never stored.
    #[builder(default)]
    #[serde(skip_serializing)]
    pub client_secret_hash: Option<String>,
}

impl Domain {
    /// Effective login validity window in minutes, falling back to the
    /// system default when the profile carries no setting.
    pub fn password_valid_minutes(&self, default: i32) -> i32 {
        if self.password_valid < 0 {
            default
        } else {
            self.password_valid
        }
    }

    /// Effective lockout threshold.
    pub fn max_attempts(&self, default: i32) -> i32 {
        if self.max_attempts < 0 {
            default
        } else {
            self.max_attempts
        }
    }
}

/// System-wide domain defaults. Seeded from the configuration file and
/// overridable at runtime through the control-panel rows the admin UI
/// owns; the core only reads them.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct DomainDefaults {
    /// Minutes a password-backed login stays valid.
    pub password_valid: i32,

    /// Failed login attempts before an account is locked.
    pub max_attempts: i32,
}

#[derive(Builder, Clone, Debug, Default, Deserialize, Serialize, Validate)]
#[builder(setter(into))]
pub struct DomainCreate {
    #[validate(length(min = 1, max = 128))]
    pub name: String,

    #[builder(default)]
    pub display_name: String,

    #[builder(default = "-1")]
    pub password_valid: i32,

    #[builder(default = "-1")]
    pub max_attempts: i32,
}

#[async_trait]
pub trait RegistryApi: Send + Sync + Clone {
    /// Get the domain profile by its exact name.
    async fn get_domain<'a>(
        &self,
        state: &ServiceState,
        name: &'a str,
    ) -> Result<Option<Domain>, RegistryProviderError>;

    /// Resolve the domain profile for a request host: exact match first,
    /// then the longest-suffix wildcard match.
    async fn find_domain<'a>(
        &self,
        state: &ServiceState,
        name: &'a str,
    ) -> Result<Option<Domain>, RegistryProviderError>;

    /// Register a new relying party.
    async fn create_domain(
        &self,
        state: &ServiceState,
        domain: DomainCreate,
    ) -> Result<Domain, RegistryProviderError>;

    /// Store the hash of a freshly generated client secret.
    async fn set_client_secret<'a>(
        &self,
        state: &ServiceState,
        name: &'a str,
        secret_hash: &'a str,
    ) -> Result<(), RegistryProviderError>;

    /// Effective system defaults for domains without explicit settings:
    /// the control-panel override when present, the configuration file
    /// otherwise.
    async fn domain_defaults(
        &self,
        state: &ServiceState,
    ) -> Result<DomainDefaults, RegistryProviderError>;
}
