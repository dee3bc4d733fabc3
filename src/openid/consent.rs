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
//! # Consent decision hook
//!
//! Whether an authenticated user authorizes an assertion towards a trust
//! root is a pluggable decision. The default requires an explicit consent
//! record for the pair; handing out assertions unconditionally is reserved
//! for test rigs.

use async_trait::async_trait;

use crate::activity::{ActivityApi, types::ActivityKind};
use crate::common::domain_of;
use crate::gatehouse::ServiceState;
use crate::identity::types::UserResponse;
use crate::openid::error::OpenIdProviderError;

#[async_trait]
pub trait ConsentDecision: Send + Sync + std::fmt::Debug {
    /// Does the user authorize asserting their identity to the trust root?
    async fn is_authorized(
        &self,
        state: &ServiceState,
        user: &UserResponse,
        trust_root: &str,
    ) -> Result<bool, OpenIdProviderError>;
}

/// Domain a trust root resolves to: the host of the realm URL, or the raw
/// value when it is already a bare domain.
pub fn trust_root_domain(trust_root: &str) -> String {
    domain_of(trust_root).unwrap_or_else(|| trust_root.trim_matches('/').to_lowercase())
}

/// Default decision: the user must have a recorded consent activity for
/// the trust-root domain.
#[derive(Clone, Debug, Default)]
pub struct RecordedConsent;

#[async_trait]
impl ConsentDecision for RecordedConsent {
    async fn is_authorized(
        &self,
        state: &ServiceState,
        user: &UserResponse,
        trust_root: &str,
    ) -> Result<bool, OpenIdProviderError> {
        let domain = trust_root_domain(trust_root);
        let consents = state
            .provider
            .get_activity_provider()
            .count_for_domain(state, &user.username, ActivityKind::Consent, &domain)
            .await?;
        Ok(consents > 0)
    }
}

/// Grant unconditionally whenever a user is present. Not the default.
#[derive(Clone, Debug, Default)]
pub struct AlwaysApprove;

#[async_trait]
impl ConsentDecision for AlwaysApprove {
    async fn is_authorized(
        &self,
        _state: &ServiceState,
        _user: &UserResponse,
        _trust_root: &str,
    ) -> Result<bool, OpenIdProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_root_domain() {
        assert_eq!(
            "rp.example.com",
            trust_root_domain("https://rp.example.com/app/")
        );
        assert_eq!("rp.example.com", trust_root_domain("rp.example.com"));
        assert_eq!("rp.example.com", trust_root_domain("RP.example.com/"));
    }
}
