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
use sea_orm::DatabaseConnection;
use sea_orm::entity::*;
use sea_orm::prelude::Expr;
use sea_orm::query::*;

use crate::config::Config;
use crate::db::entity::{
    domain_profile as db_domain,
    prelude::{ControlPanel, DomainProfile},
};
use crate::gatehouse::ServiceState;
use crate::registry::backend::RegistryBackend;
use crate::registry::backend::error::{RegistryDatabaseError, db_err};
use crate::registry::error::RegistryProviderError;
use crate::registry::types::*;

#[derive(Clone, Debug, Default)]
pub struct SqlBackend {
    pub config: Config,
}

#[async_trait]
impl RegistryBackend for SqlBackend {
    /// Set config.
    fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_domain<'a>(
        &self,
        state: &ServiceState,
        name: &'a str,
    ) -> Result<Option<Domain>, RegistryProviderError> {
        Ok(get(&state.db, name).await?)
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn find_domain<'a>(
        &self,
        state: &ServiceState,
        name: &'a str,
    ) -> Result<Option<Domain>, RegistryProviderError> {
        Ok(find_with_wildcard(&state.db, name).await?)
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn create_domain(
        &self,
        state: &ServiceState,
        domain: DomainCreate,
    ) -> Result<Domain, RegistryProviderError> {
        Ok(create(&state.db, domain).await?)
    }

    #[tracing::instrument(level = "debug", skip(self, state, secret_hash))]
    async fn set_client_secret<'a>(
        &self,
        state: &ServiceState,
        name: &'a str,
        secret_hash: &'a str,
    ) -> Result<(), RegistryProviderError> {
        Ok(set_client_secret(&state.db, name, secret_hash).await?)
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn domain_defaults(
        &self,
        state: &ServiceState,
    ) -> Result<DomainDefaults, RegistryProviderError> {
        let fallback = DomainDefaults {
            password_valid: self.config.defaults.password_valid,
            max_attempts: self.config.defaults.max_attempts,
        };
        Ok(domain_defaults(&state.db, fallback).await?)
    }
}

impl From<db_domain::Model> for Domain {
    fn from(value: db_domain::Model) -> Self {
        Self {
            name: value.name,
            display_name: value.display_name,
            password_valid: value.password_valid,
            max_attempts: value.max_attempts,
            client_secret_hash: value.client_secret_hash,
        }
    }
}

pub async fn get(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<Domain>, RegistryDatabaseError> {
    Ok(DomainProfile::find_by_id(name)
        .one(db)
        .await
        .map_err(|err| db_err(err, "fetching the domain profile"))?
        .map(Into::into))
}

/// Wildcard candidates for a host: `a.b.example.com` may be covered by
/// `*.b.example.com`, `*.example.com` or `*.com`.
fn wildcard_candidates(name: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    let mut rest = name;
    while let Some((_, suffix)) = rest.split_once('.') {
        candidates.push(format!("*.{suffix}"));
        rest = suffix;
    }
    candidates
}

pub async fn find_with_wildcard(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<Domain>, RegistryDatabaseError> {
    if let Some(exact) = get(db, name).await? {
        return Ok(Some(exact));
    }

    let candidates = wildcard_candidates(name);
    if candidates.is_empty() {
        return Ok(None);
    }

    let matches: Vec<db_domain::Model> = DomainProfile::find()
        .filter(db_domain::Column::Name.is_in(candidates))
        .all(db)
        .await
        .map_err(|err| db_err(err, "resolving the wildcard domain profile"))?;

    // Longest suffix wins.
    Ok(matches
        .into_iter()
        .max_by_key(|m| m.name.len())
        .map(Into::into))
}

pub async fn create(
    db: &DatabaseConnection,
    domain: DomainCreate,
) -> Result<Domain, RegistryDatabaseError> {
    let entry = db_domain::ActiveModel {
        name: Set(domain.name.clone()),
        display_name: Set(domain.display_name.clone()),
        password_valid: Set(domain.password_valid),
        max_attempts: Set(domain.max_attempts),
        client_secret_hash: NotSet,
    };

    let db_entry: db_domain::Model = entry
        .insert(db)
        .await
        .map_err(|err| db_err(err, "persisting the domain profile"))?;

    Ok(db_entry.into())
}

/// Control-panel section holding the domain defaults the admin UI edits.
const DOMAIN_DEFAULTS_SECTION: &str = "domain_defaults";

/// Runtime domain defaults: the control-panel row wins over the
/// configuration file; fields it does not carry keep their fallback.
pub async fn domain_defaults(
    db: &DatabaseConnection,
    fallback: DomainDefaults,
) -> Result<DomainDefaults, RegistryDatabaseError> {
    let row = ControlPanel::find_by_id(DOMAIN_DEFAULTS_SECTION)
        .one(db)
        .await
        .map_err(|err| db_err(err, "fetching the control panel defaults"))?;

    Ok(match row {
        Some(row) => DomainDefaults {
            password_valid: row
                .value
                .get("password_valid")
                .and_then(serde_json::Value::as_i64)
                .map(|value| value as i32)
                .unwrap_or(fallback.password_valid),
            max_attempts: row
                .value
                .get("max_attempts")
                .and_then(serde_json::Value::as_i64)
                .map(|value| value as i32)
                .unwrap_or(fallback.max_attempts),
        },
        None => fallback,
    })
}

pub async fn set_client_secret(
    db: &DatabaseConnection,
    name: &str,
    secret_hash: &str,
) -> Result<(), RegistryDatabaseError> {
    let res = DomainProfile::update_many()
        .col_expr(
            db_domain::Column::ClientSecretHash,
            Expr::value(Some(secret_hash.to_string())),
        )
        .filter(db_domain::Column::Name.eq(name))
        .exec(db)
        .await
        .map_err(|err| db_err(err, "storing the client secret hash"))?;
    if res.rows_affected == 0 {
        return Err(RegistryDatabaseError::DomainNotFound(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Transaction};

    use super::*;

    fn get_domain_mock(name: &str) -> db_domain::Model {
        db_domain::Model {
            name: name.into(),
            display_name: "Relying Party".into(),
            password_valid: -1,
            max_attempts: -1,
            client_secret_hash: None,
        }
    }

    #[test]
    fn test_wildcard_candidates() {
        assert_eq!(
            vec![
                "*.b.example.com".to_string(),
                "*.example.com".to_string(),
                "*.com".to_string()
            ],
            wildcard_candidates("a.b.example.com")
        );
        assert!(wildcard_candidates("localhost").is_empty());
    }

    #[tokio::test]
    async fn test_get() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![get_domain_mock("rp.example.com")]])
            .into_connection();

        assert_eq!(
            get(&db, "rp.example.com").await.unwrap().unwrap(),
            get_domain_mock("rp.example.com").into()
        );
        assert_eq!(
            db.into_transaction_log(),
            [Transaction::from_sql_and_values(
                DatabaseBackend::Postgres,
                r#"SELECT "domain_profile"."name", "domain_profile"."display_name", "domain_profile"."password_valid", "domain_profile"."max_attempts", "domain_profile"."client_secret_hash" FROM "domain_profile" WHERE "domain_profile"."name" = $1 LIMIT $2"#,
                ["rp.example.com".into(), 1u64.into()]
            ),]
        );
    }

    #[tokio::test]
    async fn test_find_prefers_exact_match() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![get_domain_mock("rp.example.com")]])
            .into_connection();

        let found = find_with_wildcard(&db, "rp.example.com").await.unwrap();
        assert_eq!("rp.example.com", found.unwrap().name);
    }

    #[tokio::test]
    async fn test_find_longest_wildcard_wins() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // No exact match.
            .append_query_results([Vec::<db_domain::Model>::new()])
            .append_query_results([vec![
                get_domain_mock("*.com"),
                get_domain_mock("*.b.example.com"),
                get_domain_mock("*.example.com"),
            ]])
            .into_connection();

        let found = find_with_wildcard(&db, "a.b.example.com").await.unwrap();
        assert_eq!("*.b.example.com", found.unwrap().name);
    }

    #[tokio::test]
    async fn test_find_no_match() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<db_domain::Model>::new()])
            .append_query_results([Vec::<db_domain::Model>::new()])
            .into_connection();

        assert!(
            find_with_wildcard(&db, "other.example.org")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_domain_defaults_override_and_fallback() {
        use crate::db::entity::control_panel as db_control_panel;

        let fallback = DomainDefaults {
            password_valid: 43200,
            max_attempts: 10,
        };

        // Control-panel row overrides only what it carries.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![db_control_panel::Model {
                section: "domain_defaults".into(),
                value: serde_json::json!({"max_attempts": 5}),
            }]])
            .into_connection();
        let effective = domain_defaults(&db, fallback).await.unwrap();
        assert_eq!(43200, effective.password_valid);
        assert_eq!(5, effective.max_attempts);

        // No row at all: the configuration file stands.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<db_control_panel::Model>::new()])
            .into_connection();
        assert_eq!(fallback, domain_defaults(&db, fallback).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_client_secret_missing_domain() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        match set_client_secret(&db, "ghost.example.com", "hash").await {
            Err(RegistryDatabaseError::DomainNotFound(name)) => {
                assert_eq!("ghost.example.com", name);
            }
            other => panic!("expected DomainNotFound, got {other:?}"),
        }
    }
}
