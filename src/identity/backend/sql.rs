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

use crate::config::Config;
use crate::db::entity::{prelude::UserProfile, user_profile as db_user};
use crate::gatehouse::ServiceState;
use crate::identity::backend::IdentityBackend;
use crate::identity::backend::error::{IdentityDatabaseError, db_err};
use crate::identity::error::IdentityProviderError;
use crate::identity::password_hashing;
use crate::identity::types::*;

#[derive(Clone, Debug, Default)]
pub struct SqlBackend {
    pub config: Config,
}

#[async_trait]
impl IdentityBackend for SqlBackend {
    /// Set config.
    fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// Authenticate a user by a password.
    async fn authenticate_by_password(
        &self,
        state: &ServiceState,
        auth: UserPasswordAuthRequest,
    ) -> Result<UserResponse, IdentityProviderError> {
        Ok(authenticate(&self.config, &state.db, auth).await?)
    }

    /// Get single user by name.
    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_user<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
    ) -> Result<Option<UserResponse>, IdentityProviderError> {
        Ok(get(&state.db, username).await?.map(Into::into))
    }

    /// Create user.
    #[tracing::instrument(level = "debug", skip(self, state, user))]
    async fn create_user(
        &self,
        state: &ServiceState,
        user: UserCreate,
    ) -> Result<UserResponse, IdentityProviderError> {
        Ok(create(&self.config, &state.db, user).await?)
    }

    /// Replace the password.
    #[tracing::instrument(level = "debug", skip(self, state, password))]
    async fn set_password<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
        password: &'a str,
    ) -> Result<(), IdentityProviderError> {
        Ok(set_password(&self.config, &state.db, username, password).await?)
    }

    /// Set the administrative disable flag.
    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn set_disabled<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
        disabled: bool,
    ) -> Result<(), IdentityProviderError> {
        Ok(set_disabled(&state.db, username, disabled).await?)
    }

    /// Reset the failed-attempt counter and unlock the account.
    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn unlock<'a>(
        &self,
        state: &ServiceState,
        username: &'a str,
    ) -> Result<(), IdentityProviderError> {
        Ok(unlock(&state.db, username).await?)
    }
}

impl From<db_user::Model> for UserResponse {
    fn from(value: db_user::Model) -> Self {
        Self {
            username: value.username,
            email: value.email,
            first_name: value.first_name,
            last_name: value.last_name,
            locked: value.locked,
            admin_disabled: value.admin_disabled,
            is_superuser: value.is_superuser,
        }
    }
}

pub async fn get(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<db_user::Model>, IdentityDatabaseError> {
    UserProfile::find_by_id(username)
        .one(db)
        .await
        .map_err(|err| db_err(err, "fetching the user profile"))
}

pub async fn authenticate(
    config: &Config,
    db: &DatabaseConnection,
    auth: UserPasswordAuthRequest,
) -> Result<UserResponse, IdentityDatabaseError> {
    let Some(user) = get(db, &auth.username).await? else {
        return Err(IdentityDatabaseError::WrongUsernamePassword);
    };
    if user.admin_disabled {
        return Err(IdentityDatabaseError::UserDisabled(user.username));
    }
    if user.locked {
        return Err(IdentityDatabaseError::UserLocked(user.username));
    }

    let legacy = !password_hashing::is_bcrypt_hash(&user.password_hash);
    let verified = if legacy {
        user.password_salt
            .as_deref()
            .map(|salt| password_hashing::legacy_hash(salt, &auth.password) == user.password_hash)
            .unwrap_or(false)
    } else {
        password_hashing::verify_password(config, &auth.password, &user.password_hash).await?
    };

    if verified {
        if legacy {
            // Transparent upgrade of imported accounts to the current
            // hashing scheme.
            let new_hash = password_hashing::hash_password(config, &auth.password).await?;
            UserProfile::update_many()
                .col_expr(db_user::Column::PasswordHash, Expr::value(new_hash))
                .col_expr(
                    db_user::Column::PasswordSalt,
                    Expr::value(None::<String>),
                )
                .col_expr(db_user::Column::LoginAttempts, Expr::value(0))
                .filter(db_user::Column::Username.eq(&user.username))
                .exec(db)
                .await
                .map_err(|err| db_err(err, "upgrading the legacy password hash"))?;
        } else if user.login_attempts != 0 {
            UserProfile::update_many()
                .col_expr(db_user::Column::LoginAttempts, Expr::value(0))
                .filter(db_user::Column::Username.eq(&user.username))
                .exec(db)
                .await
                .map_err(|err| db_err(err, "resetting the failed login counter"))?;
        }
        return Ok(user.into());
    }

    let attempts = user.login_attempts + 1;
    let threshold = auth.max_attempts.unwrap_or(config.defaults.max_attempts);
    let lock = threshold > 0 && attempts >= threshold;
    UserProfile::update_many()
        .col_expr(db_user::Column::LoginAttempts, Expr::value(attempts))
        .col_expr(db_user::Column::Locked, Expr::value(lock))
        .filter(db_user::Column::Username.eq(&user.username))
        .exec(db)
        .await
        .map_err(|err| db_err(err, "recording the failed login attempt"))?;

    Err(IdentityDatabaseError::WrongUsernamePassword)
}

pub async fn create(
    config: &Config,
    db: &DatabaseConnection,
    user: UserCreate,
) -> Result<UserResponse, IdentityDatabaseError> {
    let hash = password_hashing::hash_password(config, &user.password).await?;
    let entry = db_user::ActiveModel {
        username: Set(user.username.clone()),
        email: Set(user.email.clone()),
        first_name: Set(user.first_name.clone()),
        last_name: Set(user.last_name.clone()),
        password_hash: Set(hash),
        password_salt: NotSet,
        login_attempts: Set(0),
        locked: Set(false),
        admin_disabled: Set(false),
        is_superuser: Set(user.is_superuser),
        created_at: Set(Some(Utc::now())),
    };

    let db_entry: db_user::Model = entry
        .insert(db)
        .await
        .map_err(|err| db_err(err, "persisting the user profile"))?;

    Ok(db_entry.into())
}

pub async fn set_password(
    config: &Config,
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<(), IdentityDatabaseError> {
    let hash = password_hashing::hash_password(config, password).await?;
    let res = UserProfile::update_many()
        .col_expr(db_user::Column::PasswordHash, Expr::value(hash))
        .col_expr(db_user::Column::PasswordSalt, Expr::value(None::<String>))
        .filter(db_user::Column::Username.eq(username))
        .exec(db)
        .await
        .map_err(|err| db_err(err, "replacing the password hash"))?;
    if res.rows_affected == 0 {
        return Err(IdentityDatabaseError::UserNotFound(username.to_string()));
    }
    Ok(())
}

pub async fn set_disabled(
    db: &DatabaseConnection,
    username: &str,
    disabled: bool,
) -> Result<(), IdentityDatabaseError> {
    let res = UserProfile::update_many()
        .col_expr(db_user::Column::AdminDisabled, Expr::value(disabled))
        .filter(db_user::Column::Username.eq(username))
        .exec(db)
        .await
        .map_err(|err| db_err(err, "setting the disabled flag"))?;
    if res.rows_affected == 0 {
        return Err(IdentityDatabaseError::UserNotFound(username.to_string()));
    }
    Ok(())
}

pub async fn unlock(db: &DatabaseConnection, username: &str) -> Result<(), IdentityDatabaseError> {
    let res = UserProfile::update_many()
        .col_expr(db_user::Column::Locked, Expr::value(false))
        .col_expr(db_user::Column::LoginAttempts, Expr::value(0))
        .filter(db_user::Column::Username.eq(username))
        .exec(db)
        .await
        .map_err(|err| db_err(err, "unlocking the account"))?;
    if res.rows_affected == 0 {
        return Err(IdentityDatabaseError::UserNotFound(username.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Transaction};

    use super::*;

    fn test_config() -> Config {
        let mut conf = Config::default();
        conf.identity.password_hash_rounds = Some(4);
        conf
    }

    fn get_user_mock(username: &str, hash: &str) -> db_user::Model {
        db_user::Model {
            username: username.into(),
            email: "frodo@shire.example".into(),
            first_name: "Frodo".into(),
            last_name: "Baggins".into(),
            password_hash: hash.into(),
            password_salt: None,
            login_attempts: 0,
            locked: false,
            admin_disabled: false,
            is_superuser: false,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_get() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![get_user_mock("frodo", "$2b$dummy")]])
            .into_connection();

        assert_eq!(
            "frodo",
            get(&db, "frodo").await.unwrap().unwrap().username
        );
        assert_eq!(
            db.into_transaction_log(),
            [Transaction::from_sql_and_values(
                DatabaseBackend::Postgres,
                r#"SELECT "user_profile"."username", "user_profile"."email", "user_profile"."first_name", "user_profile"."last_name", "user_profile"."password_hash", "user_profile"."password_salt", "user_profile"."login_attempts", "user_profile"."locked", "user_profile"."admin_disabled", "user_profile"."is_superuser", "user_profile"."created_at" FROM "user_profile" WHERE "user_profile"."username" = $1 LIMIT $2"#,
                ["frodo".into(), 1u64.into()]
            ),]
        );
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let hash = bcrypt::hash("mellon", 4).unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![get_user_mock("frodo", &hash)]])
            .into_connection();

        let auth = UserPasswordAuthRequestBuilder::default()
            .username("frodo")
            .password("mellon")
            .build()
            .unwrap();
        let user = authenticate(&test_config(), &db, auth).await.unwrap();
        assert_eq!("frodo", user.username);
        assert!(user.is_active());
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password_counts_and_locks() {
        let hash = bcrypt::hash("mellon", 4).unwrap();
        let mut user = get_user_mock("frodo", &hash);
        user.login_attempts = 9;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let auth = UserPasswordAuthRequestBuilder::default()
            .username("frodo")
            .password("wrong")
            .build()
            .unwrap();
        match authenticate(&test_config(), &db, auth).await {
            Err(IdentityDatabaseError::WrongUsernamePassword) => {}
            other => panic!("expected WrongUsernamePassword, got {other:?}"),
        }

        // The tenth failure with the default threshold locks the account.
        let log = db.into_transaction_log();
        assert_eq!(
            log[1],
            Transaction::from_sql_and_values(
                DatabaseBackend::Postgres,
                r#"UPDATE "user_profile" SET "login_attempts" = $1, "locked" = $2 WHERE "user_profile"."username" = $3"#,
                [10i32.into(), true.into(), "frodo".into()]
            )
        );
    }

    #[tokio::test]
    async fn test_authenticate_locked_rejected() {
        let mut user = get_user_mock("frodo", "$2b$dummy");
        user.locked = true;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user]])
            .into_connection();

        let auth = UserPasswordAuthRequestBuilder::default()
            .username("frodo")
            .password("mellon")
            .build()
            .unwrap();
        match authenticate(&test_config(), &db, auth).await {
            Err(IdentityDatabaseError::UserLocked(u)) => assert_eq!("frodo", u),
            other => panic!("expected UserLocked, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_authenticate_disabled_rejected() {
        let mut user = get_user_mock("frodo", "$2b$dummy");
        user.admin_disabled = true;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user]])
            .into_connection();

        let auth = UserPasswordAuthRequestBuilder::default()
            .username("frodo")
            .password("mellon")
            .build()
            .unwrap();
        match authenticate(&test_config(), &db, auth).await {
            Err(IdentityDatabaseError::UserDisabled(u)) => assert_eq!("frodo", u),
            other => panic!("expected UserDisabled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_authenticate_legacy_hash_upgraded() {
        let mut user = get_user_mock("frodo", &password_hashing::legacy_hash("salt", "mellon"));
        user.password_salt = Some("salt".into());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let auth = UserPasswordAuthRequestBuilder::default()
            .username("frodo")
            .password("mellon")
            .build()
            .unwrap();
        let authenticated = authenticate(&test_config(), &db, auth).await.unwrap();
        assert_eq!("frodo", authenticated.username);

        // One select plus the hash upgrade update.
        assert_eq!(2, db.into_transaction_log().len());
    }

    #[tokio::test]
    async fn test_unknown_user_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<db_user::Model>::new()])
            .into_connection();

        let auth = UserPasswordAuthRequestBuilder::default()
            .username("nazgul")
            .password("mellon")
            .build()
            .unwrap();
        match authenticate(&test_config(), &db, auth).await {
            Err(IdentityDatabaseError::WrongUsernamePassword) => {}
            other => panic!("expected WrongUsernamePassword, got {other:?}"),
        }
    }
}
