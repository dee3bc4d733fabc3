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

use crate::association::error::AssociationProviderError;
use crate::gatehouse::ServiceState;

/// Signature algorithm of an association, per the OpenID 2.0 wire names.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum AssocType {
    HmacSha1,
    #[default]
    HmacSha256,
}

impl AssocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HmacSha1 => "HMAC-SHA1",
            Self::HmacSha256 => "HMAC-SHA256",
        }
    }

    /// MAC key length in bytes.
    pub fn secret_len(&self) -> usize {
        match self {
            Self::HmacSha1 => 20,
            Self::HmacSha256 => 32,
        }
    }
}

impl TryFrom<&str> for AssocType {
    type Error = AssociationProviderError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "HMAC-SHA1" => Ok(Self::HmacSha1),
            "HMAC-SHA256" => Ok(Self::HmacSha256),
            other => Err(AssociationProviderError::UnsupportedAssocType(
                other.to_string(),
            )),
        }
    }
}

impl std::fmt::Display for AssocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A shared secret between this provider and a relying party, used to sign
/// OpenID messages. `issued` is epoch seconds.
#[derive(Builder, Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[builder(setter(into))]
pub struct Association {
    pub server_url: String,

    pub handle: String,

    pub secret: Vec<u8>,

    pub issued: i64,

    pub lifetime: i64,

    #[builder(default)]
    pub assoc_type: AssocType,
}

impl Association {
    pub fn expires(&self) -> i64 {
        self.issued + self.lifetime
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires()
    }
}

#[async_trait]
pub trait AssociationApi: Send + Sync + Clone {
    /// Persist a new association.
    async fn store_association(
        &self,
        state: &ServiceState,
        association: Association,
    ) -> Result<(), AssociationProviderError>;

    /// Fetch the live association for the server URL: never an expired one,
    /// the most recently issued when several are live, optionally filtered
    /// by handle.
    async fn get_association<'a>(
        &self,
        state: &ServiceState,
        server_url: &'a str,
        handle: Option<&'a str>,
    ) -> Result<Option<Association>, AssociationProviderError>;

    /// Drop the association. Returns whether one existed.
    async fn remove_association<'a>(
        &self,
        state: &ServiceState,
        server_url: &'a str,
        handle: &'a str,
    ) -> Result<bool, AssociationProviderError>;

    /// Consume a response nonce. Returns false when the value was already
    /// used with a timestamp within the skew window, or lost the race to a
    /// concurrent request.
    async fn use_nonce<'a>(
        &self,
        state: &ServiceState,
        server_url: &'a str,
        timestamp: i64,
        salt: &'a str,
    ) -> Result<bool, AssociationProviderError>;

    /// Hard-delete expired associations. Explicitly invoked maintenance,
    /// never scheduled by the core itself.
    async fn cleanup_associations(
        &self,
        state: &ServiceState,
    ) -> Result<u64, AssociationProviderError>;
}
