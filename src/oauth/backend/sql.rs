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
use sea_orm::DatabaseConnection;
use sea_orm::entity::*;
use sea_orm::prelude::Expr;
use sea_orm::query::*;

use crate::config::Config;
use crate::db::entity::{oauth_grant as db_grant, prelude::OauthGrant};
use crate::gatehouse::ServiceState;
use crate::oauth::backend::OauthBackend;
use crate::oauth::backend::error::{OauthDatabaseError, db_err};
use crate::oauth::error::OauthProviderError;
use crate::oauth::types::*;

#[derive(Clone, Debug, Default)]
pub struct SqlBackend {
    pub config: Config,
}

#[async_trait]
impl OauthBackend for SqlBackend {
    /// Set config.
    fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    #[tracing::instrument(level = "debug", skip(self, state, code))]
    async fn upsert_authorization_code<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
        username: &'a str,
        code: &'a str,
        valid_until: DateTime<Utc>,
    ) -> Result<(), OauthProviderError> {
        Ok(upsert_code(&state.db, client_id, username, code, valid_until).await?)
    }

    #[tracing::instrument(level = "debug", skip(self, state, auth_code, token))]
    async fn redeem_authorization_code<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
        auth_code: &'a str,
        token: &'a str,
        valid_until: DateTime<Utc>,
    ) -> Result<bool, OauthProviderError> {
        Ok(redeem_code(&state.db, client_id, auth_code, token, valid_until).await?)
    }

    #[tracing::instrument(level = "debug", skip(self, state, auth_code))]
    async fn find_grant_by_auth_code<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
        auth_code: &'a str,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<Grant>, OauthProviderError> {
        Ok(find_one(
            &state.db,
            db_grant::Column::ClientId.eq(client_id),
            db_grant::Column::AuthCode.eq(auth_code),
            cutoff,
        )
        .await?)
    }

    #[tracing::instrument(level = "debug", skip(self, state, token))]
    async fn find_grant_by_access_token<'a>(
        &self,
        state: &ServiceState,
        client_id: &'a str,
        token: &'a str,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<Grant>, OauthProviderError> {
        Ok(find_one(
            &state.db,
            db_grant::Column::ClientId.eq(client_id),
            db_grant::Column::AccessToken.eq(token),
            cutoff,
        )
        .await?)
    }

    #[tracing::instrument(level = "debug", skip(self, state, token))]
    async fn find_grant_by_user_token<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
        token: &'a str,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<Grant>, OauthProviderError> {
        Ok(find_one(
            &state.db,
            db_grant::Column::Username.eq(username),
            db_grant::Column::AccessToken.eq(token),
            cutoff,
        )
        .await?)
    }
}

impl From<db_grant::Model> for Grant {
    fn from(value: db_grant::Model) -> Self {
        Self {
            username: value.username,
            client_id: value.client_id,
            access_token: value.access_token,
            auth_code: value.auth_code,
            valid_until: value.valid_until,
        }
    }
}

/// One live grant per (user, client) pair: update the existing row back
/// into the code phase, or create it.
pub async fn upsert_code(
    db: &DatabaseConnection,
    client_id: &str,
    username: &str,
    code: &str,
    valid_until: DateTime<Utc>,
) -> Result<(), OauthDatabaseError> {
    let existing = OauthGrant::find_by_id((username.to_string(), client_id.to_string()))
        .one(db)
        .await
        .map_err(|err| db_err(err, "fetching the grant for the pair"))?;

    if existing.is_some() {
        OauthGrant::update_many()
            .col_expr(
                db_grant::Column::AccessToken,
                Expr::value(UNDEFINED_SECRET),
            )
            .col_expr(db_grant::Column::AuthCode, Expr::value(code))
            .col_expr(db_grant::Column::ValidUntil, Expr::value(valid_until))
            .filter(db_grant::Column::Username.eq(username))
            .filter(db_grant::Column::ClientId.eq(client_id))
            .exec(db)
            .await
            .map_err(|err| db_err(err, "renewing the grant into the code phase"))?;
    } else {
        let entry = db_grant::ActiveModel {
            username: Set(username.to_string()),
            client_id: Set(client_id.to_string()),
            access_token: Set(UNDEFINED_SECRET.to_string()),
            auth_code: Set(code.to_string()),
            valid_until: Set(valid_until),
        };
        entry
            .insert(db)
            .await
            .map_err(|err| db_err(err, "persisting the authorization code"))?;
    }
    Ok(())
}

/// Swap the code for the token. The filter on the code value makes the
/// first committer win: a concurrent redemption finds no matching row and
/// reports false.
pub async fn redeem_code(
    db: &DatabaseConnection,
    client_id: &str,
    auth_code: &str,
    token: &str,
    valid_until: DateTime<Utc>,
) -> Result<bool, OauthDatabaseError> {
    let res = OauthGrant::update_many()
        .col_expr(db_grant::Column::AuthCode, Expr::value(UNDEFINED_SECRET))
        .col_expr(db_grant::Column::AccessToken, Expr::value(token))
        .col_expr(db_grant::Column::ValidUntil, Expr::value(valid_until))
        .filter(db_grant::Column::ClientId.eq(client_id))
        .filter(db_grant::Column::AuthCode.eq(auth_code))
        .exec(db)
        .await
        .map_err(|err| db_err(err, "redeeming the authorization code"))?;
    Ok(res.rows_affected > 0)
}

async fn find_one(
    db: &DatabaseConnection,
    scope: sea_orm::sea_query::SimpleExpr,
    credential: sea_orm::sea_query::SimpleExpr,
    cutoff: DateTime<Utc>,
) -> Result<Option<Grant>, OauthDatabaseError> {
    Ok(OauthGrant::find()
        .filter(scope)
        .filter(credential)
        .filter(db_grant::Column::ValidUntil.gt(cutoff))
        .one(db)
        .await
        .map_err(|err| db_err(err, "fetching the grant"))?
        .map(Into::into))
}
