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

pub use super::association::Entity as Association;
pub use super::control_panel::Entity as ControlPanel;
pub use super::domain_profile::Entity as DomainProfile;
pub use super::nonce::Entity as Nonce;
pub use super::oauth_grant::Entity as OauthGrant;
pub use super::session::Entity as Session;
pub use super::user_activity::Entity as UserActivity;
pub use super::user_profile::Entity as UserProfile;
