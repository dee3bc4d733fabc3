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
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::gatehouse::ServiceState;
use crate::session::error::SessionProviderError;

/// Flash-message queues, mirroring the two the UI renders.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashQueue {
    Error,
    Info,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FlashMessage {
    pub queue: FlashQueue,
    pub message: String,
}

/// The persisted state of one session. The cookie only ever carries the
/// random id; everything else lives server side.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SessionData {
    pub id: String,

    pub username: Option<String>,

    /// Raw parameter set of a checkid request awaiting login. Stashed at
    /// most once; consumed exactly once.
    pub pending_openid: Option<HashMap<String, String>>,

    /// User id recorded by login completion for the pending checkid
    /// request.
    pub openid_user: Option<String>,

    pub oauth_client_id: Option<String>,

    pub oauth_redirect_uri: Option<String>,

    pub oauth_response_type: Option<String>,

    pub csrf_token: Option<String>,

    pub flash: Vec<FlashMessage>,

    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait SessionApi: Send + Sync + Clone {
    /// Load a live session by its cookie id.
    async fn load<'a>(
        &self,
        state: &ServiceState,
        id: &'a str,
    ) -> Result<Option<SessionData>, SessionProviderError>;

    /// Persist the session state, inserting or updating the row.
    async fn save(
        &self,
        state: &ServiceState,
        data: SessionData,
    ) -> Result<(), SessionProviderError>;

    /// Drop the session row.
    async fn delete<'a>(
        &self,
        state: &ServiceState,
        id: &'a str,
    ) -> Result<(), SessionProviderError>;
}
