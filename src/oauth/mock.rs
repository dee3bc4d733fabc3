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
//! Internal mock structures for the [OauthProvider].

use async_trait::async_trait;
use mockall::mock;

use crate::config::Config;
use crate::gatehouse::ServiceState;
use crate::oauth::error::OauthProviderError;
use crate::oauth::types::*;

mock! {
    pub OauthProvider {
        pub fn new(cfg: &Config) -> Result<Self, OauthProviderError>;
    }

    #[async_trait]
    impl OauthApi for OauthProvider {
        fn generate_authorization_code(&self) -> String;

        fn generate_access_token(&self) -> String;

        async fn create_client_secret<'a>(
            &self,
            state: &ServiceState,
            client_id: &'a str,
        ) -> Result<String, OauthProviderError>;

        async fn validate_client_id<'a>(
            &self,
            state: &ServiceState,
            client_id: &'a str,
        ) -> Result<bool, OauthProviderError>;

        async fn validate_client_secret<'a>(
            &self,
            state: &ServiceState,
            client_id: &'a str,
            client_secret: &'a str,
        ) -> Result<bool, OauthProviderError>;

        async fn validate_redirect_uri<'a>(
            &self,
            state: &ServiceState,
            referrer_domain: Option<&'a str>,
            redirect_uri: &'a str,
        ) -> Result<bool, OauthProviderError>;

        async fn persist_authorization_code<'a>(
            &self,
            state: &ServiceState,
            client_id: &'a str,
            username: &'a str,
            code: &'a str,
        ) -> Result<(), OauthProviderError>;

        async fn persist_access_token<'a>(
            &self,
            state: &ServiceState,
            client_id: &'a str,
            auth_code: &'a str,
            token: &'a str,
        ) -> Result<(), OauthProviderError>;

        async fn validate_auth_code<'a>(
            &self,
            state: &ServiceState,
            client_id: &'a str,
            auth_code: &'a str,
        ) -> Result<bool, OauthProviderError>;

        async fn user_for_access_token<'a>(
            &self,
            state: &ServiceState,
            client_id: &'a str,
            token: &'a str,
        ) -> Result<Option<String>, OauthProviderError>;

        async fn validate_user_with_access_token<'a>(
            &self,
            state: &ServiceState,
            username: &'a str,
            token: &'a str,
        ) -> Result<bool, OauthProviderError>;
    }

    impl Clone for OauthProvider {
        fn clone(&self) -> Self;
    }
}
