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
//! # Error
//!
//! Diverse errors that can occur during the Gatehouse processing (not the
//! API).
use thiserror::Error;

use crate::activity::error::ActivityProviderError;
use crate::association::error::AssociationProviderError;
use crate::identity::error::IdentityProviderError;
use crate::oauth::error::OauthProviderError;
use crate::openid::error::OpenIdProviderError;
use crate::registry::error::RegistryProviderError;
use crate::session::error::SessionProviderError;

/// Gatehouse error.
#[derive(Debug, Error)]
pub enum GatehouseError {
    #[error(transparent)]
    ActivityError {
        #[from]
        source: ActivityProviderError,
    },

    #[error(transparent)]
    AssociationError {
        #[from]
        source: AssociationProviderError,
    },

    #[error(transparent)]
    IdentityError {
        #[from]
        source: IdentityProviderError,
    },

    #[error(transparent)]
    IO {
        #[from]
        source: std::io::Error,
    },

    #[error(transparent)]
    OauthError {
        #[from]
        source: OauthProviderError,
    },

    #[error(transparent)]
    OpenIdError {
        #[from]
        source: OpenIdProviderError,
    },

    #[error(transparent)]
    RegistryError {
        #[from]
        source: RegistryProviderError,
    },

    #[error(transparent)]
    SessionError {
        #[from]
        source: SessionProviderError,
    },

    /// Json serialization error.
    #[error("json serde error: {}", source)]
    JsonError {
        /// The source of the error.
        #[from]
        source: serde_json::Error,
    },

    /// Url parsing error.
    #[error(transparent)]
    UrlParse {
        #[from]
        source: url::ParseError,
    },
}
