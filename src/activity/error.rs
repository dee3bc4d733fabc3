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

use crate::activity::backend::error::ActivityDatabaseError;
use crate::activity::types::{ActivityBuilderError, ActivityRecordBuilderError};

#[derive(Error, Debug)]
pub enum ActivityProviderError {
    /// Unsupported driver.
    #[error("unsupported driver {0}")]
    UnsupportedDriver(String),

    #[error("unknown activity kind {0}")]
    UnknownKind(String),

    #[error(transparent)]
    ActivityDatabase { source: ActivityDatabaseError },

    #[error(transparent)]
    ActivityBuilder {
        #[from]
        source: ActivityBuilderError,
    },

    #[error(transparent)]
    ActivityRecordBuilder {
        #[from]
        source: ActivityRecordBuilderError,
    },

    #[error("data serialization error")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
}

impl From<ActivityDatabaseError> for ActivityProviderError {
    fn from(source: ActivityDatabaseError) -> Self {
        match source {
            ActivityDatabaseError::UnknownKind(x) => Self::UnknownKind(x),
            _ => Self::ActivityDatabase { source },
        }
    }
}
