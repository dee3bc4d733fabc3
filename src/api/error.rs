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
//! # Gatehouse API error.
use axum::{
    Json,
    extract::rejection::{FormRejection, JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::activity::error::ActivityProviderError;
use crate::association::error::AssociationProviderError;
use crate::identity::error::IdentityProviderError;
use crate::oauth::error::OauthProviderError;
use crate::openid::error::OpenIdProviderError;
use crate::registry::error::RegistryProviderError;
use crate::session::error::SessionProviderError;

/// Gatehouse API operation errors.
#[derive(Debug, Error)]
pub enum GatehouseApiError {
    #[error("could not find {resource}: {identifier}")]
    NotFound {
        resource: String,
        identifier: String,
    },

    #[error("{0}.")]
    BadRequest(String),

    #[error("{}", .0.clone().unwrap_or("The request you have made requires authentication.".to_string()))]
    Unauthorized(Option<String>),

    #[error("{0}")]
    Forbidden(String),

    #[error("internal server error: {0}")]
    InternalError(String),

    #[error(transparent)]
    ActivityError {
        #[from]
        source: ActivityProviderError,
    },

    #[error(transparent)]
    AssociationError {
        #[from]
        source: AssociationProviderError,
    },

    #[error(transparent)]
    IdentityError { source: IdentityProviderError },

    #[error(transparent)]
    OauthError { source: OauthProviderError },

    #[error(transparent)]
    OpenIdError {
        #[from]
        source: OpenIdProviderError,
    },

    #[error(transparent)]
    RegistryError { source: RegistryProviderError },

    #[error(transparent)]
    SessionError {
        #[from]
        source: SessionProviderError,
    },

    #[error(transparent)]
    Serde {
        #[from]
        source: serde_json::Error,
    },

    #[error(transparent)]
    FormExtractorRejection(#[from] FormRejection),

    #[error(transparent)]
    JsonExtractorRejection(#[from] JsonRejection),

    /// Request validation error.
    #[error("request validation failed: {source}")]
    Validator {
        /// The source of the error.
        #[from]
        source: validator::ValidationErrors,
    },
}

impl IntoResponse for GatehouseApiError {
    fn into_response(self) -> Response {
        error!("Error happened during request processing: {:#?}", self);

        let status_code = match &self {
            GatehouseApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatehouseApiError::BadRequest(..) => StatusCode::BAD_REQUEST,
            GatehouseApiError::Unauthorized(..) => StatusCode::UNAUTHORIZED,
            GatehouseApiError::Forbidden(..) => StatusCode::FORBIDDEN,
            GatehouseApiError::OauthError { source } => match source {
                OauthProviderError::InvalidClient(..) => StatusCode::NOT_FOUND,
                OauthProviderError::InvalidRedirectUri | OauthProviderError::InvalidGrant => {
                    StatusCode::FORBIDDEN
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            GatehouseApiError::InternalError(_)
            | GatehouseApiError::ActivityError { .. }
            | GatehouseApiError::AssociationError { .. }
            | GatehouseApiError::IdentityError { .. }
            | GatehouseApiError::OpenIdError { .. }
            | GatehouseApiError::RegistryError { .. }
            | GatehouseApiError::SessionError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };

        // Persistence failures surface as a generic failure; internal
        // detail stays in the log.
        let message = if status_code == StatusCode::INTERNAL_SERVER_ERROR {
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (
            status_code,
            Json(json!({"error": {"code": status_code.as_u16(), "message": message}})),
        )
            .into_response()
    }
}

impl From<IdentityProviderError> for GatehouseApiError {
    fn from(value: IdentityProviderError) -> Self {
        match value {
            IdentityProviderError::WrongUsernamePassword => {
                Self::Unauthorized(Some("Invalid username or password".to_string()))
            }
            IdentityProviderError::UserLocked(user) => Self::Unauthorized(Some(format!(
                "The account is locked for the user: {user}"
            ))),
            IdentityProviderError::UserDisabled(user) => Self::Unauthorized(Some(format!(
                "The account is disabled for the user: {user}"
            ))),
            IdentityProviderError::UserNotFound(user) => Self::NotFound {
                resource: "user".into(),
                identifier: user,
            },
            _ => Self::IdentityError { source: value },
        }
    }
}

impl From<OauthProviderError> for GatehouseApiError {
    fn from(value: OauthProviderError) -> Self {
        match value {
            OauthProviderError::InvalidClient(client) => Self::NotFound {
                resource: "domain".into(),
                identifier: client,
            },
            _ => Self::OauthError { source: value },
        }
    }
}

impl From<RegistryProviderError> for GatehouseApiError {
    fn from(value: RegistryProviderError) -> Self {
        match value {
            RegistryProviderError::DomainNotFound(name) => Self::NotFound {
                resource: "domain".into(),
                identifier: name,
            },
            _ => Self::RegistryError { source: value },
        }
    }
}
