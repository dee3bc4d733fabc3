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

/// OpenID shared-secret association. `issued` and `lifetime` are epoch
/// seconds; the row is dead once `issued + lifetime` has passed.
#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "association")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub server_url: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub handle: String,

    #[sea_orm(column_type = "VarBinary(StringLen::N(128))")]
    pub secret: Vec<u8>,

    pub issued: i64,

    pub lifetime: i64,

    pub assoc_type: String,
}

impl Model {
    /// Epoch second past which the association must never be returned.
    pub fn expires(&self) -> i64 {
        self.issued + self.lifetime
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
