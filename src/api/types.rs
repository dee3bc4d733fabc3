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

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Service document served on the home route.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ServiceInfo {
    pub name: String,
    pub openid_endpoint: String,
    pub yadis_endpoint: String,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct CreateSecretRequest {
    /// Client id: the registered domain name.
    pub domain: String,
}

/// The only response ever carrying the plaintext secret.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ClientSecretResponse {
    pub domain: String,
    pub display_name: String,
    pub plain_secret: String,
}

#[derive(Clone, Debug, Deserialize, IntoParams)]
pub struct AuthorizeClientQuery {
    /// Client id: the registered domain name.
    pub domain: String,
    pub redirect_uri: String,
    /// Either `code` or `token`.
    pub response_type: Option<String>,
}

/// Context of a pending authorization decision, rendered by the excluded
/// form layer.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct AuthorizationContext {
    pub domain: String,
    pub display_name: String,
    pub csrf_token: String,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct ProcessAuthorizationForm {
    /// Present when the user allowed the access.
    pub submit: Option<String>,
    pub csrf_token: Option<String>,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct AccessTokenForm {
    /// Client id: the registered domain name.
    pub domain: String,
    /// The plaintext client secret.
    pub secret: String,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct UserDetailsForm {
    /// Client id: the registered domain name.
    pub domain: String,
    pub token: String,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct UserDetailsResponse {
    pub username: String,
    pub email: String,
    pub given_name: String,
    pub surname: String,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct ValidateTokenForm {
    pub user: String,
    pub token: String,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct TokenValidity {
    pub valid: bool,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub username: String,
}
