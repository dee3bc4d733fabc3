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

use sha2::{Digest, Sha256};
use std::cmp::max;
use tokio::task;
use tracing::warn;

use crate::config::{Config, PasswordHashingAlgo};
use crate::identity::error::IdentityProviderPasswordHashError;

fn verify_length_and_trunc_password(password: &[u8], max_length: usize) -> &[u8] {
    if password.len() > max_length {
        warn!("Truncating password to the specified value");
        return &password[..max_length];
    }
    password
}

/// Calculate password hash with the configuration defaults.
pub async fn hash_password<S: AsRef<[u8]>>(
    conf: &Config,
    password: S,
) -> Result<String, IdentityProviderPasswordHashError> {
    match conf.identity.password_hashing_algorithm {
        PasswordHashingAlgo::Bcrypt => {
            let password_bytes = verify_length_and_trunc_password(
                password.as_ref(),
                max(conf.identity.max_password_length, 72),
            )
            .to_owned();
            let rounds = conf.identity.password_hash_rounds.unwrap_or(12);
            let hash =
                task::spawn_blocking(move || bcrypt::hash(password_bytes, rounds as u32)).await??;
            Ok(hash)
        }
    }
}

/// Verify the password matches the hashed value.
pub async fn verify_password<P: AsRef<[u8]>, H: AsRef<str>>(
    conf: &Config,
    password: P,
    hash: H,
) -> Result<bool, IdentityProviderPasswordHashError> {
    match conf.identity.password_hashing_algorithm {
        PasswordHashingAlgo::Bcrypt => {
            let password_bytes = verify_length_and_trunc_password(
                password.as_ref(),
                max(conf.identity.max_password_length, 72),
            )
            .to_owned();
            let password_hash = hash.as_ref().to_string();
            // Do not block the main thread with a definitely long running call.
            let verify =
                task::spawn_blocking(move || bcrypt::verify(password_bytes, &password_hash))
                    .await??;
            Ok(verify)
        }
    }
}

/// Whether the stored hash was produced by bcrypt at all. Accounts imported
/// from the legacy scheme carry a bare digest instead.
pub fn is_bcrypt_hash(hash: &str) -> bool {
    hash.starts_with("$2")
}

/// Digest of the legacy scheme: hex encoded sha256 over salt and password
/// concatenated.
pub fn legacy_hash(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        let mut conf = Config::default();
        // Keep the hashing cheap in tests.
        conf.identity.password_hash_rounds = Some(4);
        conf
    }

    #[test]
    fn test_verify_length_and_trunc_password() {
        assert_eq!(
            b"abcdefg",
            verify_length_and_trunc_password("abcdefg".as_bytes(), 70)
        );
        assert_eq!(
            b"abcd",
            verify_length_and_trunc_password("abcdefg".as_bytes(), 4)
        );
    }

    #[tokio::test]
    async fn test_roundtrip_bcrypt() {
        let conf = test_config();
        let hashed = hash_password(&conf, "abcdefg").await.unwrap();
        assert!(is_bcrypt_hash(&hashed));
        assert!(verify_password(&conf, "abcdefg", &hashed).await.unwrap());
        assert!(!verify_password(&conf, "wrong", &hashed).await.unwrap());
    }

    #[test]
    fn test_legacy_hash() {
        let digest = legacy_hash("pepper", "mellon");
        assert_eq!(64, digest.len());
        assert!(!is_bcrypt_hash(&digest));
        assert_eq!(digest, legacy_hash("pepper", "mellon"));
        assert_ne!(digest, legacy_hash("other", "mellon"));
    }
}
