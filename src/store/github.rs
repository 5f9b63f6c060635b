use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};

use super::{ObjectStore, RemoteEntry, StoreError};
use crate::config::{StoreConfig, APP_NAME, APP_VERSION};
use crate::credentials::TokenSource;

const GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// GitHub Contents API client acting as the object store.
pub struct GitHubStore {
    config: StoreConfig,
    client: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
}

/// Request body for PUT /contents/{path}
#[derive(Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
}

/// Request body for DELETE /contents/{path}
#[derive(Serialize)]
struct DeleteRequest<'a> {
    message: &'a str,
    sha: &'a str,
    branch: &'a str,
}

/// Response body from PUT /contents/{path}
#[derive(Deserialize)]
struct PutResponse {
    content: RemoteEntry,
}

/// Response body from GET /contents/{path} for a single file
#[derive(Deserialize)]
struct FileResponse {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

impl GitHubStore {
    pub fn new(config: StoreConfig, tokens: Arc<dyn TokenSource>) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("{APP_NAME}/{APP_VERSION}"))
            .build()
            .map_err(|e| StoreError::HttpClient(e.to_string()))?;

        Ok(Self {
            config,
            client,
            tokens,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Headers for every API call. Fails before any network activity when
    /// no token is stored.
    fn headers(&self) -> Result<HeaderMap, StoreError> {
        let token = self.tokens.token()?.ok_or(StoreError::AuthMissing)?;
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| StoreError::HttpClient("token contains invalid header characters".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_JSON));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    fn send_error(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::RemoteUnavailable(format!(
                "request timed out after {}s",
                self.config.timeout_secs
            ))
        } else if e.is_connect() {
            StoreError::RemoteUnavailable(format!("cannot connect to {}", self.config.api_base))
        } else {
            StoreError::RemoteUnavailable(e.to_string())
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::RemoteStatus {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ObjectStore for GitHubStore {
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, StoreError> {
        let headers = self.headers()?;
        let url = self.config.contents_url(path);

        tracing::debug!(path, "Listing remote directory");
        let response = self
            .client
            .get(&url)
            .headers(headers)
            .query(&[("ref", self.config.branch.as_str())])
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = Self::check_status(response).await?;

        response
            .json::<Vec<RemoteEntry>>()
            .await
            .map_err(|e| StoreError::ResponseParsing(e.to_string()))
    }

    async fn read(&self, path: &str, download_url: Option<&str>) -> Result<Vec<u8>, StoreError> {
        let headers = self.headers()?;

        if let Some(raw_url) = download_url {
            // Raw links for private repos carry their own short-lived token;
            // the bearer token only goes to the API host.
            let mut request = self.client.get(raw_url);
            if raw_url.starts_with(&self.config.api_base) {
                request = request.headers(headers);
            }
            let response = request
                .send()
                .await
                .map_err(|e| self.send_error(e))?;
            let response = Self::check_status(response).await?;
            let bytes = response
                .bytes()
                .await
                .map_err(|e| StoreError::ResponseParsing(e.to_string()))?;
            return Ok(bytes.to_vec());
        }

        let response = self
            .client
            .get(self.config.contents_url(path))
            .headers(headers)
            .query(&[("ref", self.config.branch.as_str())])
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = Self::check_status(response).await?;
        let file: FileResponse = response
            .json()
            .await
            .map_err(|e| StoreError::ResponseParsing(e.to_string()))?;

        if file.encoding != "base64" {
            return Err(StoreError::ResponseParsing(format!(
                "unsupported content encoding '{}' for {path}",
                file.encoding
            )));
        }
        // GitHub wraps base64 payloads at 60 columns.
        let compact: String = file.content.split_whitespace().collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| StoreError::ResponseParsing(e.to_string()))
    }

    async fn put(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> Result<RemoteEntry, StoreError> {
        let headers = self.headers()?;
        let body = PutRequest {
            message,
            content: base64::engine::general_purpose::STANDARD.encode(content),
            branch: &self.config.branch,
        };

        tracing::debug!(path, bytes = content.len(), "Writing remote object");
        let response = self
            .client
            .put(self.config.contents_url(path))
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = Self::check_status(response).await?;

        let parsed: PutResponse = response
            .json()
            .await
            .map_err(|e| StoreError::ResponseParsing(e.to_string()))?;
        Ok(parsed.content)
    }

    async fn delete(&self, path: &str, sha: &str, message: &str) -> Result<(), StoreError> {
        let headers = self.headers()?;
        let body = DeleteRequest {
            message,
            sha,
            branch: &self.config.branch,
        };

        tracing::debug!(path, "Deleting remote object");
        let response = self
            .client
            .delete(self.config.contents_url(path))
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticToken;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer, token: StaticToken) -> GitHubStore {
        let config = StoreConfig::new("acme", "records").with_api_base(&server.uri());
        GitHubStore::new(config, Arc::new(token)).unwrap()
    }

    fn listing_item(name: &str, sha: &str, server: &MockServer) -> serde_json::Value {
        json!({
            "name": name,
            "path": format!("uploads/{name}"),
            "sha": sha,
            "size": 1024,
            "download_url": format!("{}/raw/uploads/{name}", server.uri()),
            "html_url": format!("https://github.com/acme/records/blob/main/uploads/{name}"),
            "type": "file"
        })
    }

    #[tokio::test]
    async fn list_sends_bearer_token_and_parses_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/records/contents/uploads"))
            .and(header("authorization", "Bearer ghp_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                listing_item("2024-01-15_tax_a.pdf", "sha-a", &server),
                listing_item("2024-01-15_tax_a.pdf.metadata.json", "sha-m", &server),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server, StaticToken::new("ghp_test"));
        let entries = store.list("uploads").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sha, "sha-a");
    }

    #[tokio::test]
    async fn missing_token_fails_without_network_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let store = store_for(&server, StaticToken::missing());
        let err = store.list("uploads").await.unwrap_err();
        assert!(matches!(err, StoreError::AuthMissing));
    }

    #[tokio::test]
    async fn non_success_listing_is_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/records/contents/uploads"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let store = store_for(&server, StaticToken::new("t"));
        let err = store.list("uploads").await.unwrap_err();
        match err {
            StoreError::RemoteStatus { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn put_sends_base64_content_and_branch() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/repos/acme/records/contents/uploads/2024-01-15_tax_a.pdf"))
            .and(body_partial_json(json!({
                "message": "Upload a.pdf",
                "content": "aGVsbG8=",
                "branch": "main"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "content": listing_item("2024-01-15_tax_a.pdf", "new-sha", &server),
                "commit": { "sha": "commit-sha" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server, StaticToken::new("t"));
        let entry = store
            .put("uploads/2024-01-15_tax_a.pdf", b"hello", "Upload a.pdf")
            .await
            .unwrap();
        assert_eq!(entry.sha, "new-sha");
        assert!(entry.html_url.unwrap().contains("/blob/main/"));
    }

    #[tokio::test]
    async fn read_prefers_download_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/raw/uploads/a.json"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"{\"k\":1}".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server, StaticToken::new("t"));
        let url = format!("{}/raw/uploads/a.json", server.uri());
        let bytes = store.read("uploads/a.json", Some(&url)).await.unwrap();
        assert_eq!(bytes, b"{\"k\":1}");
    }

    #[tokio::test]
    async fn read_without_download_url_decodes_wrapped_base64() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/records/contents/uploads/a.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": "aGVs\nbG8=\n",
                "encoding": "base64"
            })))
            .mount(&server)
            .await;

        let store = store_for(&server, StaticToken::new("t"));
        let bytes = store.read("uploads/a.txt", None).await.unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn delete_sends_sha() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/repos/acme/records/contents/uploads/a.pdf"))
            .and(body_partial_json(json!({ "sha": "old-sha", "branch": "main" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "commit": {} })))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server, StaticToken::new("t"));
        store.delete("uploads/a.pdf", "old-sha", "Move a.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_server_is_remote_unavailable() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let config = StoreConfig::new("acme", "records").with_api_base(&uri);
        let store = GitHubStore::new(config, Arc::new(StaticToken::new("t"))).unwrap();
        let err = store.list("uploads").await.unwrap_err();
        assert!(err.is_remote_unavailable(), "got {err:?}");
    }
}
