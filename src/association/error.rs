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

use crate::association::backend::error::AssociationDatabaseError;
use crate::association::types::AssociationBuilderError;

#[derive(Error, Debug)]
pub enum AssociationProviderError {
    /// Unsupported driver.
    #[error("unsupported driver {0}")]
    UnsupportedDriver(String),

    #[error("unsupported association type {0}")]
    UnsupportedAssocType(String),

    #[error(transparent)]
    AssociationDatabase { source: AssociationDatabaseError },

    #[error(transparent)]
    AssociationBuilder {
        #[from]
        source: AssociationBuilderError,
    },
}

impl From<AssociationDatabaseError> for AssociationProviderError {
    fn from(source: AssociationDatabaseError) -> Self {
        match source {
            AssociationDatabaseError::UnsupportedAssocType(x) => Self::UnsupportedAssocType(x),
            _ => Self::AssociationDatabase { source },
        }
    }
}
