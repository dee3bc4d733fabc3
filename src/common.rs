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
//! # Common helpers
//!
//! Domain extraction shared by the OAuth2 provider (redirect-URI
//! validation) and the policy chain (referrer checks). Every redirect
//! safety decision in the service funnels through [`domain_of`].

use axum::http::{HeaderMap, header};
use url::Url;

/// Extract the lowercased host of an absolute URL. Returns `None` for
/// relative references and URLs without a host.
pub fn domain_of<S: AsRef<str>>(url: S) -> Option<String> {
    Url::parse(url.as_ref())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

/// Domain of the `Referer` header, when present and parseable.
pub fn referrer_domain(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(domain_of)
}

/// Host of the request itself, without the port.
pub fn request_host(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|h| {
            h.rsplit_once(':')
                .map(|(host, port)| {
                    if port.chars().all(|c| c.is_ascii_digit()) {
                        host
                    } else {
                        h
                    }
                })
                .unwrap_or(h)
                .to_lowercase()
        })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("https://foo.example.com/callback", Some("foo.example.com"))]
    #[case("https://Foo.Example.COM:8443/cb?x=1", Some("foo.example.com"))]
    #[case("http://localhost/", Some("localhost"))]
    #[case("/relative/path", None)]
    #[case("not a url", None)]
    #[case("mailto:user@example.com", None)]
    fn test_domain_of(#[case] url: &str, #[case] expected: Option<&str>) {
        assert_eq!(expected.map(String::from), domain_of(url));
    }

    #[test]
    fn test_referrer_domain() {
        let mut headers = HeaderMap::new();
        assert_eq!(None, referrer_domain(&headers));
        headers.insert(header::REFERER, "https://rp.example.com/login".parse().unwrap());
        assert_eq!(Some("rp.example.com".into()), referrer_domain(&headers));
    }

    #[rstest]
    #[case("id.example.com", Some("id.example.com"))]
    #[case("id.example.com:8080", Some("id.example.com"))]
    #[case("ID.Example.Com", Some("id.example.com"))]
    fn test_request_host(#[case] host: &str, #[case] expected: Option<&str>) {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, host.parse().unwrap());
        assert_eq!(expected.map(String::from), request_host(&headers));
    }
}
