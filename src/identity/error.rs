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

use thiserror::Error;

use crate::identity::backend::error::IdentityDatabaseError;
use crate::identity::types::UserResponseBuilderError;

#[derive(Error, Debug)]
pub enum IdentityProviderError {
    /// Unsupported driver.
    #[error("unsupported driver {0}")]
    UnsupportedDriver(String),

    #[error("invalid username or password")]
    WrongUsernamePassword,

    #[error("the account is locked for the user: {0}")]
    UserLocked(String),

    #[error("the account is disabled for the user: {0}")]
    UserDisabled(String),

    #[error("user {0} not found")]
    UserNotFound(String),

    /// Conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    IdentityDatabase { source: IdentityDatabaseError },

    #[error(transparent)]
    UserBuilder {
        #[from]
        source: UserResponseBuilderError,
    },

    #[error("password hashing error")]
    PasswordHash {
        #[from]
        source: IdentityProviderPasswordHashError,
    },

    /// Request validation error.
    #[error("request validation failed: {source}")]
    Validator {
        #[from]
        source: validator::ValidationErrors,
    },
}

impl From<IdentityDatabaseError> for IdentityProviderError {
    fn from(source: IdentityDatabaseError) -> Self {
        match source {
            IdentityDatabaseError::Conflict { message, .. } => Self::Conflict(message),
            IdentityDatabaseError::UserNotFound(x) => Self::UserNotFound(x),
            IdentityDatabaseError::UserLocked(x) => Self::UserLocked(x),
            IdentityDatabaseError::UserDisabled(x) => Self::UserDisabled(x),
            IdentityDatabaseError::WrongUsernamePassword => Self::WrongUsernamePassword,
            IdentityDatabaseError::PasswordHash { source } => Self::PasswordHash { source },
            IdentityDatabaseError::UserBuilder { source } => Self::UserBuilder { source },
            _ => Self::IdentityDatabase { source },
        }
    }
}

/// Password hashing related errors.
#[derive(Error, Debug)]
pub enum IdentityProviderPasswordHashError {
    /// Bcrypt error.
    #[error(transparent)]
    BCrypt {
        #[from]
        source: bcrypt::BcryptError,
    },

    /// Async task join error.
    #[error(transparent)]
    Join {
        #[from]
        source: tokio::task::JoinError,
    },
}
