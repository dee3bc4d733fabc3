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
//! Internal mock structures for the [IdentityProvider].

use async_trait::async_trait;
use mockall::mock;

use crate::config::Config;
use crate::gatehouse::ServiceState;
use crate::identity::error::IdentityProviderError;
use crate::identity::types::*;

mock! {
    pub IdentityProvider {
        pub fn new(cfg: &Config) -> Result<Self, IdentityProviderError>;
    }

    #[async_trait]
    impl IdentityApi for IdentityProvider {
        async fn authenticate_by_password(
            &self,
            state: &ServiceState,
            auth: &UserPasswordAuthRequest,
        ) -> Result<UserResponse, IdentityProviderError>;

        async fn get_user<'a>(
            &self,
            state: &ServiceState,
            username: &'a str,
        ) -> Result<Option<UserResponse>, IdentityProviderError>;

        async fn create_user(
            &self,
            state: &ServiceState,
            user: UserCreate,
        ) -> Result<UserResponse, IdentityProviderError>;

        async fn set_password<'a>(
            &self,
            state: &ServiceState,
            username: &'a str,
            password: &'a str,
        ) -> Result<(), IdentityProviderError>;

        async fn disable_user<'a>(
            &self,
            state: &ServiceState,
            username: &'a str,
        ) -> Result<(), IdentityProviderError>;

        async fn enable_user<'a>(
            &self,
            state: &ServiceState,
            username: &'a str,
        ) -> Result<(), IdentityProviderError>;

        async fn unlock_user<'a>(
            &self,
            state: &ServiceState,
            username: &'a str,
        ) -> Result<(), IdentityProviderError>;
    }

    impl Clone for IdentityProvider {
        fn clone(&self) -> Self;
    }
}
