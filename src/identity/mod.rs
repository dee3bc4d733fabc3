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

//! # Identity provider
//!
//! The credential store: user accounts, password verification, and account
//! state. Failed logins are counted against the lockout threshold of the
//! originating domain; accounts are only ever soft-disabled, never
//! deleted. Accounts imported from the legacy hashing scheme carry a salt
//! column and are upgraded to bcrypt on their first successful login.

use async_trait::async_trait;
use validator::Validate;

pub mod backend;
pub mod error;
#[cfg(test)]
pub mod mock;
pub mod password_hashing;
pub mod types;
#[cfg(test)]
pub use mock::MockIdentityProvider;

use crate::config::Config;
use crate::gatehouse::ServiceState;
use crate::identity::backend::{IdentityBackend, sql::SqlBackend};
use crate::identity::error::IdentityProviderError;
use crate::identity::types::{UserCreate, UserPasswordAuthRequest, UserResponse};

pub use types::IdentityApi;

#[derive(Clone, Debug)]
pub struct IdentityProvider {
    backend_driver: Box<dyn IdentityBackend>,
}

impl IdentityProvider {
    pub fn new(config: &Config) -> Result<Self, IdentityProviderError> {
        let mut backend_driver = match config.identity.driver.as_str() {
            "sql" => Box::new(SqlBackend::default()),
            _ => {
                return Err(IdentityProviderError::UnsupportedDriver(
                    config.identity.driver.clone(),
                ));
            }
        };
        backend_driver.set_config(config.clone());
        Ok(Self { backend_driver })
    }
}

#[async_trait]
impl IdentityApi for IdentityProvider {
    /// Authenticate user with the password auth method.
    #[tracing::instrument(level = "info", skip(self, state, auth))]
    async fn authenticate_by_password(
        &self,
        state: &ServiceState,
        auth: &UserPasswordAuthRequest,
    ) -> Result<UserResponse, IdentityProviderError> {
        self.backend_driver
            .authenticate_by_password(state, auth.clone())
            .await
    }

    /// Get single user.
    #[tracing::instrument(level = "info", skip(self, state))]
    async fn get_user<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
    ) -> Result<Option<UserResponse>, IdentityProviderError> {
        self.backend_driver.get_user(state, username).await
    }

    /// Create user.
    #[tracing::instrument(level = "info", skip(self, state, user))]
    async fn create_user(
        &self,
        state: &ServiceState,
        user: UserCreate,
    ) -> Result<UserResponse, IdentityProviderError> {
        user.validate()?;
        self.backend_driver.create_user(state, user).await
    }

    /// Replace the password, clearing any legacy salt.
    #[tracing::instrument(level = "info", skip(self, state, password))]
    async fn set_password<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
        password: &'a str,
    ) -> Result<(), IdentityProviderError> {
        self.backend_driver
            .set_password(state, username, password)
            .await
    }

    /// Administrative soft-disable.
    #[tracing::instrument(level = "info", skip(self, state))]
    async fn disable_user<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
    ) -> Result<(), IdentityProviderError> {
        self.backend_driver.set_disabled(state, username, true).await
    }

    /// Lift an administrative disable.
    #[tracing::instrument(level = "info", skip(self, state))]
    async fn enable_user<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
    ) -> Result<(), IdentityProviderError> {
        self.backend_driver
            .set_disabled(state, username, false)
            .await
    }

    /// Reset the failed-attempt counter and unlock the account.
    #[tracing::instrument(level = "info", skip(self, state))]
    async fn unlock_user<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
    ) -> Result<(), IdentityProviderError> {
        self.backend_driver.unlock(state, username).await
    }
}
