//! Azure Storage Shared Key authorization
//!
//! Signs requests with HMAC-SHA256 over the canonical string described by the
//! storage REST API (verb, standard headers, `x-ms-*` headers, canonical
//! resource).

use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, Request, Url};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Standard headers in string-to-sign order (Content-Length handled apart)
const SIGNED_HEADERS: [&str; 11] = [
    "content-encoding",
    "content-language",
    "content-length",
    "content-md5",
    "content-type",
    "date",
    "if-modified-since",
    "if-match",
    "if-none-match",
    "if-unmodified-since",
    "range",
];

/// Parsed storage account connection string
///
/// `DefaultEndpointsProtocol=https;AccountName=...;AccountKey=...;EndpointSuffix=core.windows.net`
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub protocol: String,
    pub account_name: String,
    pub account_key: String,
    pub endpoint_suffix: String,
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("protocol", &self.protocol)
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .field("endpoint_suffix", &self.endpoint_suffix)
            .finish()
    }
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut pairs = BTreeMap::new();
        for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            // Account keys are base64 and may end in '='
            let (key, value) = part.split_once('=').ok_or_else(|| {
                Error::InvalidInput(format!("malformed connection string segment: {}", part))
            })?;
            pairs.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        let take = |key: &str| -> Result<String> {
            pairs
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| Error::InvalidInput(format!("connection string lacks {}", key)))
        };

        Ok(Self {
            account_name: take("accountname")?,
            account_key: take("accountkey")?,
            protocol: pairs
                .get("defaultendpointsprotocol")
                .cloned()
                .unwrap_or_else(|| "https".to_string()),
            endpoint_suffix: pairs
                .get("endpointsuffix")
                .cloned()
                .unwrap_or_else(|| "core.windows.net".to_string()),
        })
    }
}

/// Account name plus decoded account key
#[derive(Clone)]
pub struct SharedKeyCredential {
    account: String,
    key: Vec<u8>,
}

impl fmt::Debug for SharedKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeyCredential")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl SharedKeyCredential {
    pub fn new(account: &str, base64_key: &str) -> Result<Self> {
        let key = STANDARD
            .decode(base64_key.trim())
            .map_err(|e| Error::Config(format!("storage account key is not base64: {}", e)))?;
        Ok(Self {
            account: account.to_string(),
            key,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Build the canonical string for a request
    pub fn string_to_sign(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        content_length: u64,
    ) -> String {
        let mut out = String::new();
        out.push_str(method.as_str());
        out.push('\n');

        for name in SIGNED_HEADERS {
            if name == "content-length" {
                // Zero length is signed as an empty value
                if content_length > 0 {
                    out.push_str(&content_length.to_string());
                }
            } else if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
                out.push_str(value);
            }
            out.push('\n');
        }

        let mut ms_headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in headers {
            let lower = name.as_str().to_ascii_lowercase();
            if lower.starts_with("x-ms-") {
                if let Ok(v) = value.to_str() {
                    ms_headers.insert(lower, v.trim().to_string());
                }
            }
        }
        for (name, value) in &ms_headers {
            out.push_str(name);
            out.push(':');
            out.push_str(value);
            out.push('\n');
        }

        out.push_str(&self.canonical_resource(url));
        out
    }

    fn canonical_resource(&self, url: &Url) -> String {
        let mut resource = format!("/{}{}", self.account, url.path());

        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in url.query_pairs() {
            params
                .entry(name.to_ascii_lowercase())
                .or_default()
                .push(value.into_owned());
        }
        for (name, mut values) in params {
            values.sort();
            resource.push('\n');
            resource.push_str(&name);
            resource.push(':');
            resource.push_str(&values.join(","));
        }
        resource
    }

    /// Base64 HMAC-SHA256 of `string_to_sign` under the account key
    pub fn sign(&self, string_to_sign: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| Error::Config(format!("invalid storage account key: {}", e)))?;
        mac.update(string_to_sign.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Add the `Authorization: SharedKey` header to a built request
    ///
    /// `x-ms-date` and `x-ms-version` must already be set.
    pub fn authorize(&self, request: &mut Request) -> Result<()> {
        let content_length = request
            .body()
            .and_then(|b| b.as_bytes())
            .map(|b| b.len() as u64)
            .unwrap_or(0);
        let string_to_sign =
            self.string_to_sign(request.method(), request.url(), request.headers(), content_length);
        let signature = self.sign(&string_to_sign)?;

        let value = HeaderValue::from_str(&format!("SharedKey {}:{}", self.account, signature))
            .map_err(|e| Error::InvalidInput(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "c2VjcmV0LWtleQ==";
    const DATE: &str = "Mon, 01 Jan 2024 00:00:00 GMT";

    fn credential() -> SharedKeyCredential {
        SharedKeyCredential::new("spetlacct", KEY).unwrap()
    }

    #[test]
    fn test_parse_connection_string() {
        let parsed = ConnectionString::parse(
            "DefaultEndpointsProtocol=https;AccountName=spetlacct;AccountKey=c2VjcmV0LWtleQ==;EndpointSuffix=core.windows.net",
        )
        .unwrap();

        assert_eq!(parsed.account_name, "spetlacct");
        assert_eq!(parsed.account_key, KEY);
        assert_eq!(parsed.protocol, "https");
        assert_eq!(parsed.endpoint_suffix, "core.windows.net");
    }

    #[test]
    fn test_parse_connection_string_defaults() {
        let parsed = ConnectionString::parse("AccountName=a;AccountKey=b;").unwrap();
        assert_eq!(parsed.protocol, "https");
        assert_eq!(parsed.endpoint_suffix, "core.windows.net");
    }

    #[test]
    fn test_parse_connection_string_requires_key() {
        let err = ConnectionString::parse("AccountName=a").unwrap_err();
        assert!(err.to_string().contains("accountkey"));
    }

    #[test]
    fn test_debug_hides_key() {
        let parsed = ConnectionString::parse("AccountName=a;AccountKey=topsecret").unwrap();
        assert!(!format!("{:?}", parsed).contains("topsecret"));
    }

    #[test]
    fn test_rejects_non_base64_key() {
        assert!(SharedKeyCredential::new("a", "not base64!!").is_err());
    }

    #[test]
    fn test_list_request_signature() {
        let request = reqwest::Client::new()
            .get("https://spetlacct.dfs.core.windows.net/spotify?resource=filesystem&recursive=true&directory=raw_data%2Fto_processed")
            .header("x-ms-date", DATE)
            .header("x-ms-version", "2021-08-06")
            .build()
            .unwrap();
        let cred = credential();

        let string_to_sign =
            cred.string_to_sign(request.method(), request.url(), request.headers(), 0);
        assert_eq!(
            string_to_sign,
            "GET\n\n\n\n\n\n\n\n\n\n\n\nx-ms-date:Mon, 01 Jan 2024 00:00:00 GMT\nx-ms-version:2021-08-06\n/spetlacct/spotify\ndirectory:raw_data/to_processed\nrecursive:true\nresource:filesystem"
        );
        assert_eq!(
            cred.sign(&string_to_sign).unwrap(),
            "eK+dlB8cXYWcdBWfHvmmei00G0eVgN6LZE1VyHwzZp4="
        );
    }

    #[test]
    fn test_authorize_signs_body_length() {
        let mut request = reqwest::Client::new()
            .patch("https://spetlacct.dfs.core.windows.net/spotify/raw_data/to_processed/spotify_data_2024-01-01_00:00:00.json?action=append&position=0")
            .header("x-ms-date", DATE)
            .header("x-ms-version", "2021-08-06")
            .body("hello")
            .build()
            .unwrap();

        credential().authorize(&mut request).unwrap();

        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "SharedKey spetlacct:uU/cnAr+kCYgh93E01+OSjZIKK4Mer7lLSv5xIpjfzU="
        );
    }
}
