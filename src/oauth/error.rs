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

use thiserror::Error;

use crate::identity::error::IdentityProviderError;
use crate::oauth::backend::error::OauthDatabaseError;
use crate::oauth::types::GrantBuilderError;
use crate::registry::error::RegistryProviderError;

#[derive(Error, Debug)]
pub enum OauthProviderError {
    /// Unsupported driver.
    #[error("unsupported driver {0}")]
    UnsupportedDriver(String),

    #[error("unknown client {0}")]
    InvalidClient(String),

    #[error("redirect target not valid for the referring domain")]
    InvalidRedirectUri,

    #[error("invalid or expired grant")]
    InvalidGrant,

    #[error(transparent)]
    OauthDatabase { source: OauthDatabaseError },

    #[error(transparent)]
    GrantBuilder {
        #[from]
        source: GrantBuilderError,
    },

    #[error(transparent)]
    RegistryProvider {
        #[from]
        source: RegistryProviderError,
    },

    #[error(transparent)]
    IdentityProvider {
        #[from]
        source: IdentityProviderError,
    },
}

impl From<OauthDatabaseError> for OauthProviderError {
    fn from(source: OauthDatabaseError) -> Self {
        Self::OauthDatabase { source }
    }
}
