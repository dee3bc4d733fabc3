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

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Server-side session row keyed by the random cookie identifier.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "session")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Authenticated username, when logged in.
    pub username: Option<String>,

    /// Raw parameter set of a checkid request awaiting login, stashed as
    /// JSON. Consumed exactly once.
    pub pending_openid: Option<Json>,

    /// User id set by login completion for the pending checkid request.
    pub openid_user: Option<String>,

    pub oauth_client_id: Option<String>,

    pub oauth_redirect_uri: Option<String>,

    pub oauth_response_type: Option<String>,

    pub csrf_token: Option<String>,

    /// Flash-message queue, drained on read.
    pub flash: Option<Json>,

    pub expires_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
