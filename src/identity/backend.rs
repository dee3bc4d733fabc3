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
use crate::identity::error::IdentityProviderError;
use crate::identity::types::*;

pub mod error;
pub mod sql;

pub use sql::SqlBackend;

/// Backend driver interface for the credential store.
#[async_trait]
pub trait IdentityBackend: DynClone + Send + Sync + std::fmt::Debug {
    /// Set config.
    fn set_config(&mut self, config: Config);

    /// Authenticate a user by a password.
    async fn authenticate_by_password(
        &self,
        state: &ServiceState,
        auth: UserPasswordAuthRequest,
    ) -> Result<UserResponse, IdentityProviderError>;

    /// Get single user by name.
    async fn get_user<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
    ) -> Result<Option<UserResponse>, IdentityProviderError>;

    /// Create user.
    async fn create_user(
        &self,
        state: &ServiceState,
        user: UserCreate,
    ) -> Result<UserResponse, IdentityProviderError>;

    /// Replace the password.
    async fn set_password<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
        password: &'a str,
    ) -> Result<(), IdentityProviderError>;

    /// Set the administrative disable flag.
    async fn set_disabled<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
        disabled: bool,
    ) -> Result<(), IdentityProviderError>;

    /// Reset the failed-attempt counter and unlock the account.
    async fn unlock<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
    ) -> Result<(), IdentityProviderError>;
}

dyn_clone::clone_trait_object!(IdentityBackend);
