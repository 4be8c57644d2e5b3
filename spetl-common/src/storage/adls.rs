//! Azure Data Lake Storage Gen2 backend
//!
//! Talks to the DFS REST endpoint (`https://<account>.dfs.<suffix>`) with
//! Shared Key authorization. The container is the DFS "filesystem".

use super::shared_key::{ConnectionString, SharedKeyCredential};
use super::{ObjectEntry, ObjectStore};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const API_VERSION: &str = "2021-08-06";
const CONTINUATION_HEADER: &str = "x-ms-continuation";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

#[derive(Debug, Deserialize)]
struct PathList {
    #[serde(default)]
    paths: Vec<PathItem>,
}

/// Entry of a DFS list response; flags and sizes arrive as strings or scalars
#[derive(Debug, Deserialize)]
struct PathItem {
    name: String,
    #[serde(rename = "isDirectory", default)]
    is_directory: Option<serde_json::Value>,
    #[serde(rename = "contentLength", default)]
    content_length: Option<serde_json::Value>,
}

impl PathItem {
    fn into_entry(self) -> ObjectEntry {
        let is_directory = match &self.is_directory {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        };
        let content_length = match &self.content_length {
            Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(0),
            Some(serde_json::Value::String(s)) => s.parse().unwrap_or(0),
            _ => 0,
        };
        ObjectEntry {
            name: self.name,
            is_directory,
            content_length,
        }
    }
}

/// Data lake filesystem client
#[derive(Debug, Clone)]
pub struct AdlsStore {
    http_client: reqwest::Client,
    credential: SharedKeyCredential,
    endpoint: Url,
    filesystem: String,
}

impl AdlsStore {
    /// Client authenticated with the account name and key
    pub fn new(account_name: &str, account_key: &str, filesystem: &str) -> Result<Self> {
        let endpoint = format!("https://{}.dfs.{}", account_name, DEFAULT_ENDPOINT_SUFFIX);
        let credential = SharedKeyCredential::new(account_name, account_key)?;
        Self::with_endpoint(&endpoint, credential, filesystem)
    }

    /// Client built from a storage connection string
    pub fn from_connection_string(raw: &str, filesystem: &str) -> Result<Self> {
        let parsed = ConnectionString::parse(raw)?;
        let endpoint = format!(
            "{}://{}.dfs.{}",
            parsed.protocol, parsed.account_name, parsed.endpoint_suffix
        );
        let credential = SharedKeyCredential::new(&parsed.account_name, &parsed.account_key)?;
        Self::with_endpoint(&endpoint, credential, filesystem)
    }

    /// Client for an explicit DFS endpoint
    pub fn with_endpoint(
        endpoint: &str,
        credential: SharedKeyCredential,
        filesystem: &str,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("invalid storage endpoint {}: {}", endpoint, e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(Error::Config(format!("storage endpoint cannot be a base: {}", endpoint)));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http_client,
            credential,
            endpoint,
            filesystem: filesystem.to_string(),
        })
    }

    /// URL of an object (or of the filesystem itself when `path` is empty)
    fn url_for(&self, path: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Config("storage endpoint cannot be a base".to_string()))?;
            segments.pop_if_empty();
            segments.push(&self.filesystem);
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
        }
        Ok(url)
    }

    /// Stamp, sign and send a request, mapping failure statuses to errors
    async fn send(&self, builder: RequestBuilder, path: &str) -> Result<Response> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let mut request = builder
            .header("x-ms-date", date)
            .header("x-ms-version", API_VERSION)
            .build()?;
        self.credential.authorize(&mut request)?;

        debug!(method = %request.method(), url = %request.url(), "Storage request");

        let response = self.http_client.execute(request).await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(path.to_string()));
        }

        let message = response.text().await.unwrap_or_default();
        Err(Error::Storage {
            status: status.as_u16(),
            path: path.to_string(),
            message,
        })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http_client.request(method, url)
    }
}

fn continuation_of(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTINUATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl ObjectStore for AdlsStore {
    async fn list(&self, directory: &str, recursive: bool) -> Result<Vec<ObjectEntry>> {
        let directory = directory.trim_matches('/');
        let mut entries = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut url = self.url_for("")?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("resource", "filesystem")
                    .append_pair("recursive", if recursive { "true" } else { "false" });
                if !directory.is_empty() {
                    query.append_pair("directory", directory);
                }
                if let Some(token) = &continuation {
                    query.append_pair("continuation", token);
                }
            }

            let response = match self.send(self.request(Method::GET, url), directory).await {
                Ok(response) => response,
                Err(Error::NotFound(_)) => return Ok(Vec::new()),
                Err(e) => return Err(e),
            };
            continuation = continuation_of(&response);

            let page: PathList = response.json().await?;
            entries.extend(page.paths.into_iter().map(PathItem::into_entry));

            if continuation.is_none() {
                break;
            }
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.url_for(path)?;
        let response = self.send(self.request(Method::GET, url), path).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn create(&self, path: &str) -> Result<()> {
        let mut url = self.url_for(path)?;
        url.query_pairs_mut().append_pair("resource", "file");
        self.send(self.request(Method::PUT, url).body(Vec::new()), path)
            .await?;
        Ok(())
    }

    async fn append(&self, path: &str, position: u64, data: &[u8]) -> Result<()> {
        let mut url = self.url_for(path)?;
        url.query_pairs_mut()
            .append_pair("action", "append")
            .append_pair("position", &position.to_string());
        self.send(self.request(Method::PATCH, url).body(data.to_vec()), path)
            .await?;
        Ok(())
    }

    async fn flush(&self, path: &str, length: u64) -> Result<()> {
        let mut url = self.url_for(path)?;
        url.query_pairs_mut()
            .append_pair("action", "flush")
            .append_pair("position", &length.to_string());
        self.send(self.request(Method::PATCH, url).body(Vec::new()), path)
            .await?;
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        let url = self.url_for(path)?;
        self.send(self.request(Method::DELETE, url), path).await?;
        Ok(())
    }

    async fn delete_directory(&self, path: &str, recursive: bool) -> Result<()> {
        let mut continuation: Option<String> = None;
        loop {
            let mut url = self.url_for(path)?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("recursive", if recursive { "true" } else { "false" });
                if let Some(token) = &continuation {
                    query.append_pair("continuation", token);
                }
            }
            let response = self.send(self.request(Method::DELETE, url), path).await?;
            continuation = continuation_of(&response);
            if continuation.is_none() {
                return Ok(());
            }
        }
    }
}
