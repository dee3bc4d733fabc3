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

use config::{File, FileFormat};
use eyre::{Report, WrapErr};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

/// Configuration of the whole service. Constructed once and passed
/// explicitly into every provider constructor; there is no global settings
/// registry.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    /// Global configuration options.
    #[serde(rename = "DEFAULT", default)]
    pub default: DefaultSection,

    /// Association/nonce store configuration.
    #[serde(default)]
    pub association: AssociationSection,

    /// Database configuration.
    pub database: DatabaseSection,

    /// System-wide domain defaults, applied when a domain profile carries
    /// no explicit setting.
    #[serde(default)]
    pub defaults: DefaultsSection,

    /// Credential store configuration.
    #[serde(default)]
    pub identity: IdentitySection,

    /// OAuth2 provider configuration.
    #[serde(default)]
    pub oauth: OauthSection,

    /// Activity log configuration.
    #[serde(default)]
    pub activity: ActivitySection,

    /// Domain registry configuration.
    #[serde(default)]
    pub registry: RegistrySection,

    /// Session store configuration.
    #[serde(default)]
    pub session: SessionSection,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct DefaultSection {
    /// Debug logging.
    pub debug: Option<bool>,
    /// Public endpoint of this provider, used in XRDS documents and
    /// OpenID `op_endpoint` fields.
    pub public_endpoint: Option<Url>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct DatabaseSection {
    /// Database URL.
    pub connection: SecretString,
}

impl DatabaseSection {
    pub fn get_connection(&self) -> SecretString {
        let val = self.connection.expose_secret();
        if val.contains("+") {
            return Regex::new(r"(?<type>\w+)\+(\w+)://")
                .map(|re| SecretString::from(re.replace(val, "${type}://").to_string()))
                .unwrap_or(self.connection.clone());
        }
        self.connection.clone()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdentitySection {
    #[serde(default = "default_sql_driver")]
    pub driver: String,

    #[serde(default)]
    pub password_hashing_algorithm: PasswordHashingAlgo,
    pub max_password_length: usize,
    pub password_hash_rounds: Option<usize>,
}

impl Default for IdentitySection {
    fn default() -> Self {
        Self {
            driver: default_sql_driver(),
            password_hashing_algorithm: PasswordHashingAlgo::Bcrypt,
            max_password_length: 4096,
            password_hash_rounds: None,
        }
    }
}

#[derive(Debug, Default, Deserialize, Clone)]
pub enum PasswordHashingAlgo {
    #[default]
    Bcrypt,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistrySection {
    #[serde(default = "default_sql_driver")]
    pub driver: String,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            driver: default_sql_driver(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ActivitySection {
    #[serde(default = "default_sql_driver")]
    pub driver: String,
}

impl Default for ActivitySection {
    fn default() -> Self {
        Self {
            driver: default_sql_driver(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssociationSection {
    #[serde(default = "default_sql_driver")]
    pub driver: String,

    /// Allowed clock drift (seconds) when comparing nonce timestamps.
    pub nonce_skew: i64,

    /// Lifetime (seconds) of newly established associations.
    pub assoc_lifetime: i64,
}

impl Default for AssociationSection {
    fn default() -> Self {
        Self {
            driver: default_sql_driver(),
            nonce_skew: 18000,
            assoc_lifetime: 1209600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OauthSection {
    #[serde(default = "default_sql_driver")]
    pub driver: String,

    /// Length of generated authorization codes and access tokens.
    /// Validators reject any candidate shorter than this outright.
    pub token_length: usize,

    /// Access token lifetime in days.
    pub token_expires_days: i64,

    /// Authorization code lifetime in minutes.
    pub auth_code_expires_minutes: i64,

    /// When false, token expiry checks compare against the epoch start
    /// instead of now. Used by long-lived service-to-service validation;
    /// a constructor-time option, never per-call.
    pub tokens_expire: bool,
}

impl Default for OauthSection {
    fn default() -> Self {
        Self {
            driver: default_sql_driver(),
            token_length: 64,
            token_expires_days: 10,
            auth_code_expires_minutes: 3,
            tokens_expire: true,
        }
    }
}

/// System defaults applied when a `DomainProfile` setting is unset or
/// negative. The control-panel rows may override these at runtime.
#[derive(Debug, Deserialize, Clone)]
pub struct DefaultsSection {
    /// Minutes a password-backed login stays valid.
    pub password_valid: i32,

    /// Failed login attempts before an account is locked.
    pub max_attempts: i32,
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            password_valid: 43200,
            max_attempts: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSection {
    /// Name of the session cookie.
    pub cookie_name: String,

    /// Session lifetime in minutes.
    pub ttl_minutes: i64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            cookie_name: "gatehouse_session".into(),
            ttl_minutes: 1440,
        }
    }
}

fn default_sql_driver() -> String {
    "sql".into()
}

impl Config {
    pub fn new(path: PathBuf) -> Result<Self, Report> {
        let mut builder = config::Config::builder();

        if std::path::Path::new(&path).is_file() {
            builder = builder.add_source(File::from(path).format(FileFormat::Ini));
        }

        builder.try_into()
    }
}

impl TryFrom<config::ConfigBuilder<config::builder::DefaultState>> for Config {
    type Error = Report;
    fn try_from(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, Self::Error> {
        let mut builder = builder;
        builder = builder
            .set_default("identity.max_password_length", "4096")?
            .set_default("association.nonce_skew", "18000")?
            .set_default("association.assoc_lifetime", "1209600")?
            .set_default("oauth.token_length", "64")?
            .set_default("oauth.token_expires_days", "10")?
            .set_default("oauth.auth_code_expires_minutes", "3")?
            .set_default("oauth.tokens_expire", "true")?
            .set_default("defaults.password_valid", "43200")?
            .set_default("defaults.max_attempts", "10")?
            .set_default("session.cookie_name", "gatehouse_session")?
            .set_default("session.ttl_minutes", "1440")?;

        builder
            .build()
            .wrap_err("Failed to read configuration file")?
            .try_deserialize()
            .wrap_err("Failed to parse configuration file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_db_connection() {
        let sot = DatabaseSection {
            connection: "postgresql://u:p@h".into(),
        };
        assert_eq!("postgresql://u:p@h", sot.get_connection().expose_secret());
        let sot = DatabaseSection {
            connection: "postgresql+psycopg2://u:p@h".into(),
        };
        assert_eq!("postgresql://u:p@h", sot.get_connection().expose_secret());
    }

    #[test]
    fn test_defaults() {
        let builder = config::Config::builder()
            .set_override("database.connection", "dummy")
            .unwrap();
        let conf: Config = Config::try_from(builder).expect("can build a valid config");
        assert_eq!(64, conf.oauth.token_length);
        assert_eq!(3, conf.oauth.auth_code_expires_minutes);
        assert_eq!(10, conf.oauth.token_expires_days);
        assert!(conf.oauth.tokens_expire);
        assert_eq!(43200, conf.defaults.password_valid);
        assert_eq!(10, conf.defaults.max_attempts);
    }
}
