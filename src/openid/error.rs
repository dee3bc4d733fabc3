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

use crate::activity::error::ActivityProviderError;
use crate::association::error::AssociationProviderError;
use crate::identity::error::IdentityProviderError;
use crate::registry::error::RegistryProviderError;

#[derive(Error, Debug)]
pub enum OpenIdProviderError {
    #[error("return_to is not a valid absolute url: {0}")]
    InvalidReturnTo(String),

    #[error("signature algorithm rejected the key")]
    Signature,

    #[error(transparent)]
    AssociationProvider {
        #[from]
        source: AssociationProviderError,
    },

    #[error(transparent)]
    ActivityProvider {
        #[from]
        source: ActivityProviderError,
    },

    #[error(transparent)]
    IdentityProvider {
        #[from]
        source: IdentityProviderError,
    },

    #[error(transparent)]
    RegistryProvider {
        #[from]
        source: RegistryProviderError,
    },

    #[error(transparent)]
    UrlParse {
        #[from]
        source: url::ParseError,
    },
}
