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

//! # Gatehouse
//!
//! Gatehouse is an identity provider acting as the trust broker between
//! end users and the websites consuming their identity: it authenticates
//! users against a shared directory, issues OpenID 2.0 assertions to
//! relying parties, and brokers OAuth2 authorization codes and access
//! tokens for registered client applications.
//!
//! The service is built from three tightly coupled parts sharing one
//! user/session/domain data model:
//!
//! - The OpenID protocol engine, covering association and nonce
//!   lifecycle, the checkid authorization flow with session-stashed
//!   pending requests, and response signing with the simple-registration
//!   attribute extension.
//!
//! - The OAuth2 provider, a small authorization-code/access-token state
//!   machine: one live grant per (user, client) pair, strict
//!   redirect-URI validation against the domain registry, and
//!   fail-closed code redemption under concurrency.
//!
//! - The request pipeline policies wrapping every authenticated request:
//!   disabled-account enforcement, per-domain password timeout,
//!   first-login-per-domain gating, pending-OpenID completion, and
//!   redirect-target validation.
//!
//! Every durable fact lives behind a provider (identity, registry,
//! association, oauth, activity, session) with a SQL backend over one
//! transactional relational store; the providers are the only components
//! touching it.

pub mod activity;
pub mod api;
pub mod association;
pub mod common;
pub mod config;
pub mod db;
pub mod error;
pub mod gatehouse;
pub mod identity;
pub mod oauth;
pub mod openid;
pub mod policy;
pub mod provider;
pub mod registry;
pub mod session;
