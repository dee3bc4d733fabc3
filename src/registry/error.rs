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

use crate::registry::backend::error::RegistryDatabaseError;
use crate::registry::types::DomainBuilderError;

#[derive(Error, Debug)]
pub enum RegistryProviderError {
    /// Unsupported driver.
    #[error("unsupported driver {0}")]
    UnsupportedDriver(String),

    #[error("domain {0} not found")]
    DomainNotFound(String),

    /// Conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    RegistryDatabase { source: RegistryDatabaseError },

    #[error(transparent)]
    DomainBuilder {
        #[from]
        source: DomainBuilderError,
    },

    /// Request validation error.
    #[error("request validation failed: {source}")]
    Validator {
        #[from]
        source: validator::ValidationErrors,
    },
}

impl From<RegistryDatabaseError> for RegistryProviderError {
    fn from(source: RegistryDatabaseError) -> Self {
        match source {
            RegistryDatabaseError::Conflict { message, .. } => Self::Conflict(message),
            RegistryDatabaseError::DomainNotFound(x) => Self::DomainNotFound(x),
            _ => Self::RegistryDatabase { source },
        }
    }
}
