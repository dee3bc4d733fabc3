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
use chrono::{DateTime, Utc};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::activity::error::ActivityProviderError;
use crate::gatehouse::ServiceState;

/// What happened. Every kind carries the user it happened to; the optional
/// fields are validated at construction through the builder.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Login,
    Logout,
    AuthorizeCheckid,
    Consent,
    CreateSecret,
    DisableUser,
    EnableUser,
    ChangePassword,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Logout => "logout",
            Self::AuthorizeCheckid => "authorize_checkid",
            Self::Consent => "consent",
            Self::CreateSecret => "create_secret",
            Self::DisableUser => "disable_user",
            Self::EnableUser => "enable_user",
            Self::ChangePassword => "change_password",
        }
    }
}

impl TryFrom<&str> for ActivityKind {
    type Error = ActivityProviderError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "login" => Ok(Self::Login),
            "logout" => Ok(Self::Logout),
            "authorize_checkid" => Ok(Self::AuthorizeCheckid),
            "consent" => Ok(Self::Consent),
            "create_secret" => Ok(Self::CreateSecret),
            "disable_user" => Ok(Self::DisableUser),
            "enable_user" => Ok(Self::EnableUser),
            "change_password" => Ok(Self::ChangePassword),
            other => Err(ActivityProviderError::UnknownKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A new audit record to append.
#[derive(Builder, Clone, Debug, Deserialize, PartialEq, Serialize)]
#[builder(setter(strip_option, into))]
pub struct ActivityRecord {
    pub username: String,

    pub kind: ActivityKind,

    /// Administrator acting on behalf of the user, when different.
    #[builder(default)]
    pub actor_username: Option<String>,

    /// Full URL the request arrived from.
    #[builder(default)]
    pub came_from: Option<String>,

    /// Domain derived from `came_from` unless set explicitly.
    #[builder(default)]
    pub came_from_fqdn: Option<String>,

    #[builder(default)]
    pub detail: Option<serde_json::Value>,
}

/// A stored audit record. Never mutated after insert.
#[derive(Builder, Clone, Debug, Deserialize, PartialEq, Serialize)]
#[builder(setter(strip_option, into))]
pub struct Activity {
    pub id: i64,

    pub username: String,

    pub kind: ActivityKind,

    pub activity_ts: DateTime<Utc>,

    #[builder(default)]
    pub actor_username: Option<String>,

    #[builder(default)]
    pub came_from: Option<String>,

    #[builder(default)]
    pub came_from_fqdn: Option<String>,

    #[builder(default)]
    pub detail: Option<serde_json::Value>,
}

#[async_trait]
pub trait ActivityApi: Send + Sync + Clone {
    /// Append an audit record.
    async fn record(
        &self,
        state: &ServiceState,
        record: ActivityRecord,
    ) -> Result<Activity, ActivityProviderError>;

    /// Most recent activity of any of the given kinds for the user.
    async fn last_activity_of_kinds<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
        kinds: &'a [ActivityKind],
    ) -> Result<Option<Activity>, ActivityProviderError>;

    /// How many records of the kind the user has from the given domain.
    async fn count_for_domain<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
        kind: ActivityKind,
        domain: &'a str,
    ) -> Result<u64, ActivityProviderError>;
}
