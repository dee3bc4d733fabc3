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
use crate::identity::error::IdentityProviderError;

/// User account data exposed to the rest of the service. Password material
/// never leaves the backend.
#[derive(Builder, Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[builder(setter(into))]
pub struct UserResponse {
    pub username: String,

    pub email: String,

    #[builder(default)]
    pub first_name: String,

    #[builder(default)]
    pub last_name: String,

    #[builder(default)]
    pub locked: bool,

    #[builder(default)]
    pub admin_disabled: bool,

    #[builder(default)]
    pub is_superuser: bool,
}

impl UserResponse {
    /// Display name used by the simple-registration extension.
    pub fn fullname(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Whether the account may be served at all.
    pub fn is_active(&self) -> bool {
        !self.locked && !self.admin_disabled
    }
}

#[derive(Builder, Clone, Debug, Default, Deserialize, Serialize, Validate)]
#[builder(setter(into))]
pub struct UserCreate {
    #[validate(length(min = 1, max = 64))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    #[builder(default)]
    pub first_name: String,

    #[builder(default)]
    pub last_name: String,

    pub password: String,

    #[builder(default)]
    pub is_superuser: bool,
}

/// Password authentication request. `max_attempts` carries the effective
/// lockout threshold of the originating domain; when absent the system
/// default applies.
#[derive(Builder, Clone, Deserialize, Serialize)]
#[builder(setter(strip_option, into))]
pub struct UserPasswordAuthRequest {
    pub username: String,

    pub password: String,

    #[builder(default)]
    pub max_attempts: Option<i32>,
}

// Manual Debug to keep the password out of the logs.
impl std::fmt::Debug for UserPasswordAuthRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPasswordAuthRequest")
            .field("username", &self.username)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait IdentityApi: Send + Sync + Clone {
    /// Authenticate the user with a password, counting failed attempts and
    /// locking the account once the threshold is reached.
    async fn authenticate_by_password(
        &self,
        state: &ServiceState,
        auth: &UserPasswordAuthRequest,
    ) -> Result<UserResponse, IdentityProviderError>;

    /// Get a single user.
    async fn get_user<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
    ) -> Result<Option<UserResponse>, IdentityProviderError>;

    /// Create a user account.
    async fn create_user(
        &self,
        state: &ServiceState,
        user: UserCreate,
    ) -> Result<UserResponse, IdentityProviderError>;

    /// Replace the password, clearing any legacy salt.
    async fn set_password<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
        password: &'a str,
    ) -> Result<(), IdentityProviderError>;

    /// Administrative soft-disable. Accounts are never deleted.
    async fn disable_user<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
    ) -> Result<(), IdentityProviderError>;

    /// Lift an administrative disable.
    async fn enable_user<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
    ) -> Result<(), IdentityProviderError>;

    /// Reset the failed-attempt counter and unlock the account.
    async fn unlock_user<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
    ) -> Result<(), IdentityProviderError>;
}
