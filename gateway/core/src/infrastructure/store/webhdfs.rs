// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! WebHDFS Remote Store Implementation
//!
//! Talks to an HDFS namenode through the WebHDFS REST API. Implements the
//! RemoteStore trait as an Anti-Corruption Layer.
//!
//! # API Endpoints
//!
//! All requests go to `{base}/webhdfs/v1{path}?op=...&user.name={superuser}`.
//!
//! - `GET op=GETFILESTATUS` - Metadata of one node
//! - `GET op=LISTSTATUS` - Metadata of a directory's children
//! - `PUT op=MKDIRS` - Recursive directory creation
//! - `DELETE op=DELETE&recursive=` - Delete a node
//! - `PUT op=RENAME&destination=` - Rename a node
//! - `PUT op=SETOWNER&owner=&group=` - Change ownership
//! - `GET op=OPEN&offset=` - Read (redirects to a datanode)
//! - `PUT op=CREATE&overwrite=true` - Write (redirects to a datanode)
//!
//! Redirects are followed by hand so uploads can stream their body to the
//! datanode instead of replaying it.

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{header::LOCATION, redirect::Policy, Client, Method, Response, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::domain::path;
use crate::domain::permission::PermissionBits;
use crate::domain::remote_store::{ByteReader, FileKind, FileStatus, RemoteStore, StoreError};

const API_PREFIX: &str = "/webhdfs/v1";

/// WebHDFS client adapter
pub struct WebHdfsAdapter {
    /// HTTP client; redirects are handled manually
    client: Client,

    /// Namenode base URL (e.g., "http://namenode:9870")
    base_url: String,

    /// Identity sent as `user.name` on every request
    user: String,
}

impl WebHdfsAdapter {
    /// Create a new adapter with a 30 second request timeout
    ///
    /// # Arguments
    /// * `base_url` - Namenode HTTP address
    /// * `user` - Superuser the gateway acts as
    pub fn new(base_url: impl Into<String>, user: impl Into<String>) -> Result<Self, StoreError> {
        Self::with_timeout(base_url, user, Duration::from_secs(30))
    }

    /// Create adapter with custom timeout
    ///
    /// The timeout bounds connection setup and each read, not whole
    /// transfers.
    pub fn with_timeout(
        base_url: impl Into<String>,
        user: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| StoreError::Unavailable(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user: user.into(),
        })
    }

    /// Build the REST URL for a remote path
    fn build_url(&self, remote_path: &str) -> Result<Url, StoreError> {
        if !remote_path.starts_with('/') {
            return Err(StoreError::InvalidPath(format!(
                "Path must start with /: {remote_path}"
            )));
        }

        let mut url = Url::parse(&format!("{}{}", self.base_url, API_PREFIX))
            .map_err(|e| StoreError::InvalidPath(format!("Invalid backend URI {}: {e}", self.base_url)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::InvalidPath(format!("Backend URI cannot be a base: {}", self.base_url)))?;
            let parts: Vec<&str> = remote_path.split('/').filter(|s| !s.is_empty()).collect();
            if parts.is_empty() {
                segments.push("");
            } else {
                segments.extend(parts);
            }
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        remote_path: &str,
        op: &str,
        params: &[(&str, &str)],
    ) -> Result<Response, StoreError> {
        let url = self.build_url(remote_path)?;
        tracing::trace!(%method, %url, op, "WebHDFS request");

        let response = self
            .client
            .request(method, url)
            .query(&[("op", op), ("user.name", self.user.as_str())])
            .query(params)
            .send()
            .await?;
        Ok(response)
    }

    /// Send a request and require a 2xx answer
    async fn call(
        &self,
        method: Method,
        remote_path: &str,
        op: &str,
        params: &[(&str, &str)],
    ) -> Result<Response, StoreError> {
        let response = self.send(method, remote_path, op, params).await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from(response, remote_path).await)
        }
    }

    /// Send a request answered with `{"boolean": ...}`
    async fn call_boolean(
        &self,
        method: Method,
        remote_path: &str,
        op: &str,
        params: &[(&str, &str)],
    ) -> Result<bool, StoreError> {
        let response = self.call(method, remote_path, op, params).await?;
        let body: BooleanResponse = response.json().await?;
        Ok(body.boolean)
    }

    /// Follow a datanode redirect answered either as a 307 or, with
    /// `noredirect=true`, as a JSON body.
    async fn datanode_location(response: Response, remote_path: &str) -> Result<String, StoreError> {
        let status = response.status();
        if status.is_redirection() {
            return response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| StoreError::Remote {
                    exception: "MissingLocation".to_string(),
                    message: format!("Redirect without Location header for {remote_path}"),
                });
        }
        if status.is_success() {
            let body: LocationResponse = response.json().await?;
            return Ok(body.location);
        }
        Err(Self::error_from(response, remote_path).await)
    }

    /// Map an error response to a StoreError
    async fn error_from(response: Response, remote_path: &str) -> StoreError {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| format!("HTTP {status}"));

        let remote = serde_json::from_str::<RemoteExceptionResponse>(&text)
            .map(|r| r.remote_exception)
            .ok();

        match (status, remote) {
            (StatusCode::NOT_FOUND, _) => StoreError::NotFound(remote_path.to_string()),
            (StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED, Some(e)) => StoreError::PermissionDenied(e.message),
            (StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED, None) => {
                StoreError::PermissionDenied(remote_path.to_string())
            }
            (StatusCode::SERVICE_UNAVAILABLE, _) => StoreError::Unavailable(text),
            (_, Some(e)) => StoreError::Remote {
                exception: e.exception,
                message: e.message,
            },
            (status, None) => StoreError::Remote {
                exception: format!("HTTP {status}"),
                message: text,
            },
        }
    }
}

#[async_trait]
impl RemoteStore for WebHdfsAdapter {
    async fn status(&self, remote_path: &str) -> Result<FileStatus, StoreError> {
        let response = self.call(Method::GET, remote_path, "GETFILESTATUS", &[]).await?;
        let body: FileStatusResponse = response.json().await?;
        body.file_status.into_status(path::normalize(remote_path))
    }

    async fn list(&self, remote_path: &str) -> Result<Vec<FileStatus>, StoreError> {
        let response = self.call(Method::GET, remote_path, "LISTSTATUS", &[]).await?;
        let body: ListStatusResponse = response.json().await?;
        let parent = path::normalize(remote_path);

        body.file_statuses
            .file_status
            .into_iter()
            .map(|entry| {
                // A file lists as itself with an empty suffix
                let child = if entry.path_suffix.is_empty() {
                    parent.clone()
                } else {
                    path::join(&parent, &entry.path_suffix)
                };
                entry.into_status(child)
            })
            .collect()
    }

    async fn mkdirs(&self, remote_path: &str) -> Result<bool, StoreError> {
        self.call_boolean(Method::PUT, remote_path, "MKDIRS", &[]).await
    }

    async fn delete(&self, remote_path: &str, recursive: bool) -> Result<bool, StoreError> {
        let recursive = if recursive { "true" } else { "false" };
        self.call_boolean(Method::DELETE, remote_path, "DELETE", &[("recursive", recursive)])
            .await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<bool, StoreError> {
        self.call_boolean(Method::PUT, from, "RENAME", &[("destination", to)])
            .await
    }

    async fn set_owner(&self, remote_path: &str, owner: &str, group: &str) -> Result<(), StoreError> {
        self.call(
            Method::PUT,
            remote_path,
            "SETOWNER",
            &[("owner", owner), ("group", group)],
        )
        .await?;
        Ok(())
    }

    async fn open(&self, remote_path: &str, offset: u64) -> Result<ByteReader, StoreError> {
        let offset = offset.to_string();
        let response = self
            .send(Method::GET, remote_path, "OPEN", &[("offset", &offset)])
            .await?;

        let response = if response.status().is_redirection() {
            let location = Self::datanode_location(response, remote_path).await?;
            self.client.get(location).send().await?
        } else {
            response
        };

        if !response.status().is_success() {
            return Err(Self::error_from(response, remote_path).await);
        }

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::pin(StreamReader::new(stream)))
    }

    async fn create(&self, remote_path: &str, content: ByteReader) -> Result<(), StoreError> {
        let response = self
            .send(
                Method::PUT,
                remote_path,
                "CREATE",
                &[("overwrite", "true"), ("noredirect", "true")],
            )
            .await?;
        let location = Self::datanode_location(response, remote_path).await?;

        let body = reqwest::Body::wrap_stream(ReaderStream::new(content));
        let response = self.client.put(location).body(body).send().await?;

        match response.status() {
            StatusCode::CREATED | StatusCode::OK => Ok(()),
            _ => Err(Self::error_from(response, remote_path).await),
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let response = self.send(Method::GET, "/", "GETFILESTATUS", &[]).await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!(
                "Namenode returned status {}",
                response.status()
            )))
        }
    }
}

// ============================================================================
// WebHDFS API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct FileStatusResponse {
    #[serde(rename = "FileStatus")]
    file_status: WebHdfsFileStatus,
}

#[derive(Debug, Deserialize)]
struct ListStatusResponse {
    #[serde(rename = "FileStatuses")]
    file_statuses: FileStatuses,
}

#[derive(Debug, Deserialize)]
struct FileStatuses {
    #[serde(rename = "FileStatus", default)]
    file_status: Vec<WebHdfsFileStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebHdfsFileStatus {
    #[serde(default)]
    path_suffix: String,

    #[serde(rename = "type")]
    kind: String,

    #[serde(default)]
    length: u64,

    #[serde(default)]
    modification_time: i64,

    owner: String,

    group: String,

    /// Octal mode, e.g. "755" or "1777"
    permission: String,
}

impl WebHdfsFileStatus {
    fn into_status(self, full_path: String) -> Result<FileStatus, StoreError> {
        let kind = match self.kind.as_str() {
            "DIRECTORY" => FileKind::Directory,
            "SYMLINK" => FileKind::Symlink,
            _ => FileKind::File,
        };
        let permission: PermissionBits = self
            .permission
            .parse()
            .map_err(|e| StoreError::Serialization(format!("{e} for {full_path}")))?;

        Ok(FileStatus {
            path: full_path,
            kind,
            length: self.length,
            modification_time: self.modification_time,
            owner: self.owner,
            group: self.group,
            permission,
        })
    }
}

#[derive(Debug, Deserialize)]
struct BooleanResponse {
    boolean: bool,
}

#[derive(Debug, Deserialize)]
struct LocationResponse {
    #[serde(rename = "Location")]
    location: String,
}

#[derive(Debug, Deserialize)]
struct RemoteExceptionResponse {
    #[serde(rename = "RemoteException")]
    remote_exception: RemoteException,
}

#[derive(Debug, Deserialize)]
struct RemoteException {
    exception: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use tokio::io::AsyncReadExt;

    fn query(pairs: &[(&str, &str)]) -> Matcher {
        Matcher::AllOf(
            pairs
                .iter()
                .map(|(k, v)| Matcher::UrlEncoded(k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_url_building() {
        let adapter = WebHdfsAdapter::new("http://namenode:9870/", "hdfs").unwrap();
        assert_eq!(
            adapter.build_url("/").unwrap().as_str(),
            "http://namenode:9870/webhdfs/v1/"
        );
        assert_eq!(
            adapter.build_url("/data/q3 report.csv").unwrap().as_str(),
            "http://namenode:9870/webhdfs/v1/data/q3%20report.csv"
        );
    }

    #[tokio::test]
    async fn test_invalid_path_rejection() {
        let adapter = WebHdfsAdapter::new("http://namenode:9870", "hdfs").unwrap();
        let result = adapter.status("relative/path").await;
        assert!(matches!(result, Err(StoreError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/webhdfs/v1/data/report.csv")
            .match_query(query(&[("op", "GETFILESTATUS"), ("user.name", "hdfs")]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"FileStatus":{"accessTime":0,"blockSize":134217728,"group":"staff",
                "length":24930,"modificationTime":1320173277227,"owner":"alice",
                "pathSuffix":"","permission":"640","replication":3,"type":"FILE"}}"#,
            )
            .create_async()
            .await;

        let adapter = WebHdfsAdapter::new(server.url(), "hdfs").unwrap();
        let status = adapter.status("/data/report.csv").await.unwrap();

        assert_eq!(status.path, "/data/report.csv");
        assert!(status.is_file());
        assert_eq!(status.length, 24930);
        assert_eq!(status.modification_time, 1320173277227);
        assert_eq!(status.owner, "alice");
        assert_eq!(status.group, "staff");
        assert_eq!(status.permission.to_string(), "rw-r-----");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_not_found() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/webhdfs/v1/missing")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(
                r#"{"RemoteException":{"exception":"FileNotFoundException",
                "javaClassName":"java.io.FileNotFoundException",
                "message":"File does not exist: /missing"}}"#,
            )
            .create_async()
            .await;

        let adapter = WebHdfsAdapter::new(server.url(), "hdfs").unwrap();
        assert!(matches!(
            adapter.status("/missing").await,
            Err(StoreError::NotFound(p)) if p == "/missing"
        ));
    }

    #[tokio::test]
    async fn test_remote_exception_mapping() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", "/webhdfs/v1/data")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(
                r#"{"RemoteException":{"exception":"AccessControlException",
                "javaClassName":"org.apache.hadoop.security.AccessControlException",
                "message":"Permission denied: user=hdfs"}}"#,
            )
            .create_async()
            .await;
        server
            .mock("DELETE", "/webhdfs/v1/data")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let adapter = WebHdfsAdapter::new(server.url(), "hdfs").unwrap();
        assert!(matches!(
            adapter.mkdirs("/data").await,
            Err(StoreError::PermissionDenied(m)) if m.contains("user=hdfs")
        ));
        assert!(matches!(
            adapter.delete("/data", true).await,
            Err(StoreError::Remote { message, .. }) if message == "boom"
        ));
    }

    #[tokio::test]
    async fn test_list() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/webhdfs/v1/data")
            .match_query(query(&[("op", "LISTSTATUS")]))
            .with_status(200)
            .with_body(
                r#"{"FileStatuses":{"FileStatus":[
                {"group":"staff","length":0,"modificationTime":1,"owner":"alice",
                 "pathSuffix":"archive","permission":"750","type":"DIRECTORY"},
                {"group":"staff","length":8,"modificationTime":2,"owner":"alice",
                 "pathSuffix":"report.csv","permission":"640","type":"FILE"}]}}"#,
            )
            .create_async()
            .await;

        let adapter = WebHdfsAdapter::new(server.url(), "hdfs").unwrap();
        let children = adapter.list("/data").await.unwrap();

        assert_eq!(children.len(), 2);
        assert_eq!(children[0].path, "/data/archive");
        assert!(children[0].is_directory());
        assert_eq!(children[1].path, "/data/report.csv");
        assert_eq!(children[1].length, 8);
    }

    #[tokio::test]
    async fn test_boolean_operations() {
        let mut server = Server::new_async().await;
        let mkdirs = server
            .mock("PUT", "/webhdfs/v1/a/b")
            .match_query(query(&[("op", "MKDIRS"), ("user.name", "ftp")]))
            .with_status(200)
            .with_body(r#"{"boolean":true}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/webhdfs/v1/a")
            .match_query(query(&[("op", "DELETE"), ("recursive", "true")]))
            .with_status(200)
            .with_body(r#"{"boolean":true}"#)
            .create_async()
            .await;
        let rename = server
            .mock("PUT", "/webhdfs/v1/a/b")
            .match_query(query(&[("op", "RENAME"), ("destination", "/c")]))
            .with_status(200)
            .with_body(r#"{"boolean":false}"#)
            .create_async()
            .await;
        let set_owner = server
            .mock("PUT", "/webhdfs/v1/a/b")
            .match_query(query(&[("op", "SETOWNER"), ("owner", "alice"), ("group", "staff")]))
            .with_status(200)
            .create_async()
            .await;

        let adapter = WebHdfsAdapter::new(server.url(), "ftp").unwrap();
        assert!(adapter.mkdirs("/a/b").await.unwrap());
        assert!(adapter.delete("/a", true).await.unwrap());
        assert!(!adapter.rename("/a/b", "/c").await.unwrap());
        adapter.set_owner("/a/b", "alice", "staff").await.unwrap();

        mkdirs.assert_async().await;
        delete.assert_async().await;
        rename.assert_async().await;
        set_owner.assert_async().await;
    }

    #[tokio::test]
    async fn test_open_follows_redirect() {
        let mut server = Server::new_async().await;
        let datanode = format!("{}/datanode/read?offset=4", server.url());
        server
            .mock("GET", "/webhdfs/v1/data/report.csv")
            .match_query(query(&[("op", "OPEN"), ("offset", "4")]))
            .with_status(307)
            .with_header("location", &datanode)
            .create_async()
            .await;
        server
            .mock("GET", "/datanode/read")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("1,2\n")
            .create_async()
            .await;

        let adapter = WebHdfsAdapter::new(server.url(), "hdfs").unwrap();
        let mut reader = adapter.open("/data/report.csv", 4).await.unwrap();
        let mut content = String::new();
        reader.read_to_string(&mut content).await.unwrap();
        assert_eq!(content, "1,2\n");
    }

    #[tokio::test]
    async fn test_create_streams_to_datanode() {
        let mut server = Server::new_async().await;
        let datanode = format!("{}/datanode/write", server.url());
        server
            .mock("PUT", "/webhdfs/v1/out.txt")
            .match_query(query(&[("op", "CREATE"), ("overwrite", "true"), ("noredirect", "true")]))
            .with_status(200)
            .with_body(format!(r#"{{"Location":"{datanode}"}}"#))
            .create_async()
            .await;
        let upload = server
            .mock("PUT", "/datanode/write")
            .match_body("hello hdfs")
            .with_status(201)
            .create_async()
            .await;

        let adapter = WebHdfsAdapter::new(server.url(), "hdfs").unwrap();
        let content: ByteReader = Box::pin(std::io::Cursor::new(b"hello hdfs".to_vec()));
        adapter.create("/out.txt", content).await.unwrap();
        upload.assert_async().await;
    }

    #[tokio::test]
    async fn test_health_check_unavailable() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/webhdfs/v1/")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let adapter = WebHdfsAdapter::new(server.url(), "hdfs").unwrap();
        assert!(matches!(adapter.health_check().await, Err(StoreError::Unavailable(_))));
    }

    // Integration tests require a running namenode
    // Run these manually with: cargo test -p hdfs-gateway-core -- --ignored

    #[tokio::test]
    #[ignore]
    async fn integration_test_directory_lifecycle() {
        let adapter = WebHdfsAdapter::new("http://localhost:9870", "hdfs").unwrap();

        adapter.health_check().await.unwrap();

        let path = "/tmp/hdfsgw-integration/dir";
        assert!(adapter.mkdirs(path).await.unwrap());
        assert!(adapter.status(path).await.unwrap().is_directory());

        assert!(adapter.delete("/tmp/hdfsgw-integration", true).await.unwrap());
        assert!(matches!(adapter.status(path).await, Err(StoreError::NotFound(_))));
    }
}
