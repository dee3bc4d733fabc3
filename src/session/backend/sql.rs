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
use sea_orm::query::*;
use std::collections::HashMap;

use crate::config::Config;
use crate::db::entity::{prelude::Session as DbSession, session as db_session};
use crate::gatehouse::ServiceState;
use crate::session::backend::SessionBackend;
use crate::session::backend::error::{SessionDatabaseError, db_err};
use crate::session::error::SessionProviderError;
use crate::session::types::{FlashMessage, SessionData};

#[derive(Clone, Debug, Default)]
pub struct SqlBackend {
    pub config: Config,
}

#[async_trait]
impl SessionBackend for SqlBackend {
    /// Set config.
    fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn load<'a>(
        &self,
        state: &ServiceState,
        id: &'a str,
    ) -> Result<Option<SessionData>, SessionProviderError> {
        Ok(load(&state.db, id).await?)
    }

    #[tracing::instrument(level = "debug", skip(self, state, data))]
    async fn save(
        &self,
        state: &ServiceState,
        data: SessionData,
    ) -> Result<(), SessionProviderError> {
        Ok(save(&state.db, data).await?)
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn delete<'a>(
        &self,
        state: &ServiceState,
        id: &'a str,
    ) -> Result<(), SessionProviderError> {
        Ok(delete(&state.db, id).await?)
    }
}

impl TryFrom<db_session::Model> for SessionData {
    type Error = SessionDatabaseError;

    fn try_from(value: db_session::Model) -> Result<Self, Self::Error> {
        let pending_openid: Option<HashMap<String, String>> = value
            .pending_openid
            .map(serde_json::from_value)
            .transpose()?;
        let flash: Vec<FlashMessage> = value
            .flash
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            id: value.id,
            username: value.username,
            pending_openid,
            openid_user: value.openid_user,
            oauth_client_id: value.oauth_client_id,
            oauth_redirect_uri: value.oauth_redirect_uri,
            oauth_response_type: value.oauth_response_type,
            csrf_token: value.csrf_token,
            flash,
            expires_at: value.expires_at,
        })
    }
}

pub async fn load(
    db: &DatabaseConnection,
    id: &str,
) -> Result<Option<SessionData>, SessionDatabaseError> {
    DbSession::find_by_id(id)
        .filter(db_session::Column::ExpiresAt.gt(Utc::now()))
        .one(db)
        .await
        .map_err(|err| db_err(err, "loading the session"))?
        .map(TryInto::try_into)
        .transpose()
}

pub async fn save(db: &DatabaseConnection, data: SessionData) -> Result<(), SessionDatabaseError> {
    let pending = data
        .pending_openid
        .as_ref()
        .map(serde_json::to_value)
        .transpose()?;
    let flash = if data.flash.is_empty() {
        None
    } else {
        Some(serde_json::to_value(&data.flash)?)
    };

    let existing = DbSession::find_by_id(&data.id)
        .one(db)
        .await
        .map_err(|err| db_err(err, "fetching the session for save"))?;

    let entry = db_session::ActiveModel {
        id: Set(data.id.clone()),
        username: Set(data.username.clone()),
        pending_openid: Set(pending),
        openid_user: Set(data.openid_user.clone()),
        oauth_client_id: Set(data.oauth_client_id.clone()),
        oauth_redirect_uri: Set(data.oauth_redirect_uri.clone()),
        oauth_response_type: Set(data.oauth_response_type.clone()),
        csrf_token: Set(data.csrf_token.clone()),
        flash: Set(flash),
        expires_at: Set(data.expires_at),
    };

    if existing.is_some() {
        entry
            .update(db)
            .await
            .map_err(|err| db_err(err, "updating the session"))?;
    } else {
        entry
            .insert(db)
            .await
            .map_err(|err| db_err(err, "inserting the session"))?;
    }
    Ok(())
}

pub async fn delete(db: &DatabaseConnection, id: &str) -> Result<(), SessionDatabaseError> {
    DbSession::delete_by_id(id)
        .exec(db)
        .await
        .map_err(|err| db_err(err, "deleting the session"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta};
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::*;

    fn get_session_mock(id: &str) -> db_session::Model {
        db_session::Model {
            id: id.into(),
            username: Some("frodo".into()),
            pending_openid: Some(serde_json::json!({"openid.mode": "checkid_setup"})),
            openid_user: None,
            oauth_client_id: None,
            oauth_redirect_uri: None,
            oauth_response_type: None,
            csrf_token: Some("csrf".into()),
            flash: Some(serde_json::json!([
                {"queue": "error", "message": "You must log in again"}
            ])),
            expires_at: DateTime::default(),
        }
    }

    #[tokio::test]
    async fn test_load_roundtrip() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![get_session_mock("sid")]])
            .into_connection();

        let data = load(&db, "sid").await.unwrap().unwrap();
        assert_eq!("sid", data.id);
        assert_eq!(Some("frodo".to_string()), data.username);
        assert_eq!(
            Some("checkid_setup".to_string()),
            data.pending_openid
                .unwrap()
                .get("openid.mode")
                .cloned()
        );
        assert_eq!(1, data.flash.len());
        assert_eq!(crate::session::types::FlashQueue::Error, data.flash[0].queue);
    }

    #[tokio::test]
    async fn test_load_expired_filtered_by_query() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<db_session::Model>::new()])
            .into_connection();

        assert!(load(&db, "sid").await.unwrap().is_none());
        let log = db.into_transaction_log();
        let sql = format!("{:?}", log[0]);
        assert!(sql.contains(r#""session"."expires_at" > "#), "{sql}");
    }

    #[tokio::test]
    async fn test_save_inserts_fresh_session() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // No existing row.
            .append_query_results([Vec::<db_session::Model>::new()])
            // Insert returning.
            .append_query_results([vec![get_session_mock("sid")]])
            .into_connection();

        let data = SessionData {
            id: "sid".into(),
            username: Some("frodo".into()),
            pending_openid: None,
            openid_user: None,
            oauth_client_id: None,
            oauth_redirect_uri: None,
            oauth_response_type: None,
            csrf_token: None,
            flash: Vec::new(),
            expires_at: Utc::now() + TimeDelta::minutes(30),
        };
        save(&db, data).await.unwrap();
    }
}
