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
use std::collections::{BTreeMap, HashMap};
use url::Url;

use crate::gatehouse::ServiceState;
use crate::openid::error::OpenIdProviderError;
use crate::session::Session;

/// OpenID 2.0 namespace value.
pub const OPENID2_NS: &str = "http://specs.openid.net/auth/2.0";
/// Identifier-select value for identity/claimed_id.
pub const IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";
/// Simple registration extension namespace.
pub const SREG_NS: &str = "http://openid.net/extensions/sreg/1.1";

/// Service type URIs advertised in XRDS documents, in order of preference.
pub const SERVICE_TYPE_URIS: &[&str] = &[
    "http://specs.openid.net/auth/2.0/signon",
    "http://openid.net/signon/1.1",
    "http://openid.net/signon/1.0",
    SREG_NS,
];

/// An OpenID protocol message: the `openid.`-prefixed subset of a request
/// or response parameter set, with the prefix stripped. Field order is
/// kept stable for signing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Message {
    fields: BTreeMap<String, String>,
}

impl Message {
    /// Extract the OpenID fields from raw request parameters. Returns
    /// `None` when the set carries no `openid.mode` at all, the marker of
    /// a non-protocol request.
    pub fn from_params(params: &HashMap<String, String>) -> Option<Self> {
        let fields: BTreeMap<String, String> = params
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix("openid.")
                    .map(|stripped| (stripped.to_string(), value.clone()))
            })
            .collect();
        if !fields.contains_key("mode") {
            return None;
        }
        Some(Self { fields })
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn set<K: Into<String>, V: Into<String>>(&mut self, field: K, value: V) {
        self.fields.insert(field.into(), value.into());
    }

    /// Whether the message speaks OpenID 2.0 (as opposed to 1.x compat).
    pub fn is_openid2(&self) -> bool {
        self.get("ns") == Some(OPENID2_NS)
    }

    /// Key-value form body of a direct response, per the OpenID 2.0 key
    /// value encoding.
    pub fn to_kv(&self) -> String {
        let mut out = String::new();
        for (field, value) in &self.fields {
            out.push_str(field);
            out.push(':');
            out.push_str(value);
            out.push('\n');
        }
        out
    }

    /// Key-value serialization of the listed fields, the exact byte string
    /// signatures are computed over.
    pub fn kv_of(&self, signed: &[String]) -> String {
        let mut out = String::new();
        for field in signed {
            out.push_str(field);
            out.push(':');
            out.push_str(self.get(field).unwrap_or_default());
            out.push('\n');
        }
        out
    }

    /// Append the message to the return URL as `openid.`-prefixed query
    /// parameters, for the indirect (redirect) encoding.
    pub fn to_redirect_url(&self, return_to: &str) -> Result<Url, OpenIdProviderError> {
        let mut url = Url::parse(return_to)
            .map_err(|_| OpenIdProviderError::InvalidReturnTo(return_to.to_string()))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (field, value) in &self.fields {
                pairs.append_pair(&format!("openid.{field}"), value);
            }
        }
        Ok(url)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &String)> {
        self.fields.iter()
    }
}

/// checkid flavor: immediate responses may not interact with the user.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CheckIdMode {
    Immediate,
    Setup,
}

/// A checkid request asking this provider to confirm a user's identity to
/// a relying party.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckIdRequest {
    pub mode: CheckIdMode,
    pub identity: String,
    pub claimed_id: Option<String>,
    pub return_to: String,
    /// The realm the assertion is scoped to (`openid.realm`, or
    /// `openid.trust_root` in 1.x compat).
    pub trust_root: String,
    pub assoc_handle: Option<String>,
    /// Whether the request spoke OpenID 2.0; 1.x responses omit the ns
    /// field.
    pub ns2: bool,
}

/// An association establishment request.
#[derive(Clone, Debug, PartialEq)]
pub struct AssociateRequest {
    pub assoc_type: String,
    pub session_type: String,
}

/// A check_authentication request verifying a stateless assertion.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckAuthRequest {
    pub message: Message,
    pub assoc_handle: String,
    pub sig: String,
    pub signed: Vec<String>,
    pub invalidate_handle: Option<String>,
}

/// The decoded protocol request.
#[derive(Clone, Debug, PartialEq)]
pub enum OpenIdRequest {
    Associate(AssociateRequest),
    CheckId(CheckIdRequest),
    CheckAuthentication(CheckAuthRequest),
}

impl OpenIdRequest {
    /// Best-effort decoding: a parameter set that is not a recognizable
    /// OpenID message yields `None`, never an error, so non-conforming
    /// clients get an empty response instead of a fault.
    pub fn decode(params: &HashMap<String, String>) -> Option<Self> {
        let message = Message::from_params(params)?;
        match message.get("mode")? {
            "associate" => Some(Self::Associate(AssociateRequest {
                assoc_type: message.get("assoc_type").unwrap_or("HMAC-SHA1").to_string(),
                session_type: message.get("session_type").unwrap_or("").to_string(),
            })),
            mode @ ("checkid_immediate" | "checkid_setup") => {
                let identity = message.get("identity")?.to_string();
                let return_to = message.get("return_to")?.to_string();
                let trust_root = message
                    .get("realm")
                    .or_else(|| message.get("trust_root"))
                    .unwrap_or(&return_to)
                    .to_string();
                Some(Self::CheckId(CheckIdRequest {
                    mode: if mode == "checkid_immediate" {
                        CheckIdMode::Immediate
                    } else {
                        CheckIdMode::Setup
                    },
                    identity,
                    claimed_id: message.get("claimed_id").map(Into::into),
                    return_to,
                    trust_root,
                    assoc_handle: message.get("assoc_handle").map(Into::into),
                    ns2: message.is_openid2(),
                }))
            }
            "check_authentication" => {
                let assoc_handle = message.get("assoc_handle")?.to_string();
                let sig = message.get("sig")?.to_string();
                let signed: Vec<String> = message
                    .get("signed")?
                    .split(',')
                    .map(Into::into)
                    .collect();
                Some(Self::CheckAuthentication(CheckAuthRequest {
                    invalidate_handle: message.get("invalidate_handle").map(Into::into),
                    message,
                    assoc_handle,
                    sig,
                    signed,
                }))
            }
            _ => None,
        }
    }
}

/// Outcome of processing a protocol request, mirroring the three encodings
/// a response can take on the wire.
#[derive(Clone, Debug, PartialEq)]
pub enum ProcessResult {
    /// Indirect response: redirect the user agent.
    Redirect(Url),
    /// Direct response body in key-value form.
    Body(String),
    /// Undecodable request; intentionally empty.
    Empty,
}

#[async_trait]
pub trait OpenIdApi: Send + Sync {
    /// Process a raw OpenID parameter set against the current session.
    async fn process(
        &self,
        state: &ServiceState,
        session: &Session,
        params: &HashMap<String, String>,
    ) -> Result<ProcessResult, OpenIdProviderError>;
}
