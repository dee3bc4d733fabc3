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

use crate::activity::backend::ActivityBackend;
use crate::activity::backend::error::{ActivityDatabaseError, db_err};
use crate::activity::error::ActivityProviderError;
use crate::activity::types::*;
use crate::config::Config;
use crate::db::entity::{prelude::UserActivity, user_activity as db_activity};
use crate::gatehouse::ServiceState;

#[derive(Clone, Debug, Default)]
pub struct SqlBackend {
    pub config: Config,
}

#[async_trait]
impl ActivityBackend for SqlBackend {
    /// Set config.
    fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn record(
        &self,
        state: &ServiceState,
        record: ActivityRecord,
    ) -> Result<Activity, ActivityProviderError> {
        Ok(create(&state.db, record).await?)
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn last_activity_of_kinds<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
        kinds: &'a [ActivityKind],
    ) -> Result<Option<Activity>, ActivityProviderError> {
        Ok(last_of_kinds(&state.db, username, kinds).await?)
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn count_for_domain<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
        kind: ActivityKind,
        domain: &'a str,
    ) -> Result<u64, ActivityProviderError> {
        Ok(count_for_domain(&state.db, username, kind, domain).await?)
    }
}

impl TryFrom<db_activity::Model> for Activity {
    type Error = ActivityDatabaseError;

    fn try_from(value: db_activity::Model) -> Result<Self, Self::Error> {
        let kind = ActivityKind::try_from(value.activity.as_str())
            .map_err(|_| ActivityDatabaseError::UnknownKind(value.activity.clone()))?;
        let mut builder = ActivityBuilder::default();
        builder.id(value.id);
        builder.username(value.username);
        builder.kind(kind);
        builder.activity_ts(value.activity_ts);
        if let Some(actor) = value.actor_username {
            builder.actor_username(actor);
        }
        if let Some(came_from) = value.came_from {
            builder.came_from(came_from);
        }
        if let Some(fqdn) = value.came_from_fqdn {
            builder.came_from_fqdn(fqdn);
        }
        if let Some(detail) = value.detail {
            builder.detail(detail);
        }
        Ok(builder.build()?)
    }
}

pub async fn create(
    db: &DatabaseConnection,
    rec: ActivityRecord,
) -> Result<Activity, ActivityDatabaseError> {
    let entry = db_activity::ActiveModel {
        id: NotSet,
        username: Set(rec.username.clone()),
        activity: Set(rec.kind.as_str().to_string()),
        activity_ts: Set(Utc::now()),
        actor_username: Set(rec.actor_username.clone()),
        came_from: Set(rec.came_from.clone()),
        came_from_fqdn: Set(rec.came_from_fqdn.clone()),
        detail: Set(rec.detail.clone()),
    };

    let db_entry: db_activity::Model = entry
        .insert(db)
        .await
        .map_err(|err| db_err(err, "appending the activity record"))?;

    db_entry.try_into()
}

pub async fn last_of_kinds(
    db: &DatabaseConnection,
    username: &str,
    kinds: &[ActivityKind],
) -> Result<Option<Activity>, ActivityDatabaseError> {
    let entry = UserActivity::find()
        .filter(db_activity::Column::Username.eq(username))
        .filter(db_activity::Column::Activity.is_in(kinds.iter().map(ActivityKind::as_str)))
        .order_by_desc(db_activity::Column::ActivityTs)
        .one(db)
        .await
        .map_err(|err| db_err(err, "fetching the last user activity"))?;

    entry.map(TryInto::try_into).transpose()
}

pub async fn count_for_domain(
    db: &DatabaseConnection,
    username: &str,
    kind: ActivityKind,
    domain: &str,
) -> Result<u64, ActivityDatabaseError> {
    UserActivity::find()
        .filter(db_activity::Column::Username.eq(username))
        .filter(db_activity::Column::Activity.eq(kind.as_str()))
        .filter(db_activity::Column::CameFromFqdn.eq(domain))
        .count(db)
        .await
        .map_err(|err| db_err(err, "counting user activity for the domain"))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase, Transaction};

    use super::*;

    fn get_activity_mock(id: i64, kind: &str) -> db_activity::Model {
        db_activity::Model {
            id,
            username: "frodo".into(),
            activity: kind.into(),
            activity_ts: DateTime::<Utc>::default(),
            actor_username: None,
            came_from: Some("https://rp.example.com/return".into()),
            came_from_fqdn: Some("rp.example.com".into()),
            detail: None,
        }
    }

    #[tokio::test]
    async fn test_create() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![get_activity_mock(1, "login")]])
            .into_connection();

        let rec = ActivityRecordBuilder::default()
            .username("frodo")
            .kind(ActivityKind::Login)
            .came_from("https://rp.example.com/return")
            .came_from_fqdn("rp.example.com")
            .build()
            .unwrap();

        let created = create(&db, rec).await.unwrap();
        assert_eq!(1, created.id);
        assert_eq!(ActivityKind::Login, created.kind);
        assert_eq!(Some("rp.example.com".into()), created.came_from_fqdn);
    }

    #[tokio::test]
    async fn test_last_of_kinds() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![get_activity_mock(5, "authorize_checkid")]])
            .into_connection();

        let found = last_of_kinds(
            &db,
            "frodo",
            &[ActivityKind::AuthorizeCheckid, ActivityKind::Login],
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(ActivityKind::AuthorizeCheckid, found.kind);

        assert_eq!(
            db.into_transaction_log(),
            [Transaction::from_sql_and_values(
                DatabaseBackend::Postgres,
                r#"SELECT "user_activity"."id", "user_activity"."username", "user_activity"."activity", "user_activity"."activity_ts", "user_activity"."actor_username", "user_activity"."came_from", "user_activity"."came_from_fqdn", "user_activity"."detail" FROM "user_activity" WHERE "user_activity"."username" = $1 AND "user_activity"."activity" IN ($2, $3) ORDER BY "user_activity"."activity_ts" DESC LIMIT $4"#,
                [
                    "frodo".into(),
                    "authorize_checkid".into(),
                    "login".into(),
                    1u64.into()
                ]
            ),]
        );
    }

    #[tokio::test]
    async fn test_unknown_kind_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![get_activity_mock(7, "teleport")]])
            .into_connection();

        match last_of_kinds(&db, "frodo", &[ActivityKind::Login]).await {
            Err(ActivityDatabaseError::UnknownKind(kind)) => assert_eq!("teleport", kind),
            other => panic!("expected UnknownKind, got {other:?}"),
        }
    }
}
