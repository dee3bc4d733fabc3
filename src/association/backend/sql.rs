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
use chrono::Utc;
use sea_orm::DatabaseConnection;
use sea_orm::entity::*;
use sea_orm::prelude::Expr;
use sea_orm::query::*;
use sea_orm::sea_query::ExprTrait as _;

use crate::association::backend::AssociationBackend;
use crate::association::backend::error::{AssociationDatabaseError, db_err};
use crate::association::error::AssociationProviderError;
use crate::association::types::*;
use crate::config::Config;
use crate::db::entity::{
    association as db_assoc, nonce as db_nonce,
    prelude::{Association as DbAssociation, Nonce as DbNonce},
};
use crate::gatehouse::ServiceState;

#[derive(Clone, Debug, Default)]
pub struct SqlBackend {
    pub config: Config,
}

#[async_trait]
impl AssociationBackend for SqlBackend {
    /// Set config.
    fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    #[tracing::instrument(level = "debug", skip(self, state, association))]
    async fn store_association(
        &self,
        state: &ServiceState,
        association: Association,
    ) -> Result<(), AssociationProviderError> {
        Ok(create(&state.db, association).await?)
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_association<'a>(
        &self,
        state: &ServiceState,
        server_url: &'a str,
        handle: Option<&'a str>,
    ) -> Result<Option<Association>, AssociationProviderError> {
        Ok(get(&state.db, server_url, handle, Utc::now().timestamp()).await?)
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn remove_association<'a>(
        &self,
        state: &ServiceState,
        server_url: &'a str,
        handle: &'a str,
    ) -> Result<bool, AssociationProviderError> {
        Ok(remove(&state.db, server_url, handle).await?)
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn use_nonce<'a>(
        &self,
        state: &ServiceState,
        server_url: &'a str,
        timestamp: i64,
        salt: &'a str,
    ) -> Result<bool, AssociationProviderError> {
        Ok(use_nonce(
            &state.db,
            server_url,
            timestamp,
            salt,
            self.config.association.nonce_skew,
        )
        .await?)
    }

    #[tracing::instrument(level = "info", skip(self, state))]
    async fn cleanup_associations(
        &self,
        state: &ServiceState,
    ) -> Result<u64, AssociationProviderError> {
        Ok(cleanup(&state.db, Utc::now().timestamp()).await?)
    }
}

impl TryFrom<db_assoc::Model> for Association {
    type Error = AssociationDatabaseError;

    fn try_from(value: db_assoc::Model) -> Result<Self, Self::Error> {
        let assoc_type = AssocType::try_from(value.assoc_type.as_str())
            .map_err(|_| AssociationDatabaseError::UnsupportedAssocType(value.assoc_type.clone()))?;
        Ok(Self {
            server_url: value.server_url,
            handle: value.handle,
            secret: value.secret,
            issued: value.issued,
            lifetime: value.lifetime,
            assoc_type,
        })
    }
}

pub async fn create(
    db: &DatabaseConnection,
    assoc: Association,
) -> Result<(), AssociationDatabaseError> {
    let entry = db_assoc::ActiveModel {
        server_url: Set(assoc.server_url.clone()),
        handle: Set(assoc.handle.clone()),
        secret: Set(assoc.secret.clone()),
        issued: Set(assoc.issued),
        lifetime: Set(assoc.lifetime),
        assoc_type: Set(assoc.assoc_type.as_str().to_string()),
    };

    entry
        .insert(db)
        .await
        .map_err(|err| db_err(err, "persisting the association"))?;

    Ok(())
}

pub async fn get(
    db: &DatabaseConnection,
    server_url: &str,
    handle: Option<&str>,
    now: i64,
) -> Result<Option<Association>, AssociationDatabaseError> {
    let mut select = DbAssociation::find()
        .filter(db_assoc::Column::ServerUrl.eq(server_url))
        // Never return an association past `issued + lifetime`.
        .filter(
            Expr::col(db_assoc::Column::Issued)
                .add(Expr::col(db_assoc::Column::Lifetime))
                .gte(now),
        )
        .order_by_desc(db_assoc::Column::Issued);
    if let Some(handle) = handle {
        select = select.filter(db_assoc::Column::Handle.eq(handle));
    }

    select
        .one(db)
        .await
        .map_err(|err| db_err(err, "fetching the association"))?
        .map(TryInto::try_into)
        .transpose()
}

pub async fn remove(
    db: &DatabaseConnection,
    server_url: &str,
    handle: &str,
) -> Result<bool, AssociationDatabaseError> {
    let res = DbAssociation::delete_many()
        .filter(db_assoc::Column::ServerUrl.eq(server_url))
        .filter(db_assoc::Column::Handle.eq(handle))
        .exec(db)
        .await
        .map_err(|err| db_err(err, "removing the association"))?;
    Ok(res.rows_affected > 0)
}

/// Replay protection. A nonce is accepted only when no row with the same
/// `(server_url, salt)` carries a timestamp within the skew window; the
/// insert on the composite primary key makes the race between two
/// concurrent presentations lose for exactly one of them.
pub async fn use_nonce(
    db: &DatabaseConnection,
    server_url: &str,
    timestamp: i64,
    salt: &str,
    skew: i64,
) -> Result<bool, AssociationDatabaseError> {
    let replayed = DbNonce::find()
        .filter(db_nonce::Column::ServerUrl.eq(server_url))
        .filter(db_nonce::Column::Salt.eq(salt))
        .filter(db_nonce::Column::Timestamp.gt(timestamp - skew))
        .filter(db_nonce::Column::Timestamp.lt(timestamp + skew))
        .one(db)
        .await
        .map_err(|err| db_err(err, "checking the nonce for replay"))?;
    if replayed.is_some() {
        return Ok(false);
    }

    let entry = db_nonce::ActiveModel {
        server_url: Set(server_url.to_string()),
        timestamp: Set(timestamp),
        salt: Set(salt.to_string()),
    };
    match entry.insert(db).await {
        Ok(_) => Ok(true),
        Err(err) => match db_err(err, "recording the nonce") {
            // Lost the race against a concurrent presentation.
            AssociationDatabaseError::Conflict { .. } => Ok(false),
            other => Err(other),
        },
    }
}

pub async fn cleanup(db: &DatabaseConnection, now: i64) -> Result<u64, AssociationDatabaseError> {
    let res = DbAssociation::delete_many()
        .filter(
            Expr::col(db_assoc::Column::Issued)
                .add(Expr::col(db_assoc::Column::Lifetime))
                .lt(now),
        )
        .exec(db)
        .await
        .map_err(|err| db_err(err, "deleting expired associations"))?;
    Ok(res.rows_affected)
}
