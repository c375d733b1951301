//! Microsoft Graph (OneDrive) connector
//!
//! Uploads are path-addressed: a document always lands at
//! `{folder}/{localDocId}-{name}`, so uploading the same document again
//! replaces the same drive item.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::provider::{ExternalSystem, RemoteChange, SyncProvider, UploadMetadata};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use core_runtime::config::OneDriveSettings;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::OneDriveError;
use crate::types::{DeltaResponse, DriveItem};

const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(120);

/// OneDrive connector over the Graph API
///
/// Throttling is reported, not retried: a 429 or 503 becomes
/// [`OneDriveError::Throttled`] carrying the `Retry-After` value.
pub struct OneDriveConnector {
    http_client: Arc<dyn HttpClient>,
    access_token: String,
    folder_path: String,
}

impl OneDriveConnector {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        access_token: impl Into<String>,
        folder_path: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            access_token: access_token.into(),
            folder_path: folder_path.into().trim_matches('/').to_string(),
        }
    }

    pub fn from_settings(http_client: Arc<dyn HttpClient>, settings: &OneDriveSettings) -> Self {
        Self::new(
            http_client,
            settings.access_token.clone(),
            settings.folder_path.clone(),
        )
    }

    pub fn folder_path(&self) -> &str {
        &self.folder_path
    }

    /// Percent-encode each segment of a drive path, keeping the separators
    fn encode_path(path: &str) -> String {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn item_path(&self, local_doc_id: &str, name: &str) -> String {
        let file_name = format!("{}-{}", local_doc_id, name.replace('/', "_"));
        if self.folder_path.is_empty() {
            Self::encode_path(&file_name)
        } else {
            format!(
                "{}/{}",
                Self::encode_path(&self.folder_path),
                urlencoding::encode(&file_name)
            )
        }
    }

    fn delta_url(&self) -> String {
        if self.folder_path.is_empty() {
            format!("{}/me/drive/root/delta", GRAPH_API_BASE)
        } else {
            format!(
                "{}/me/drive/root:/{}:/delta",
                GRAPH_API_BASE,
                Self::encode_path(&self.folder_path)
            )
        }
    }

    async fn send(&self, request: HttpRequest, item_id: Option<&str>) -> Result<HttpResponse> {
        let response = self
            .http_client
            .execute_with_retry(
                request.bearer_token(self.access_token.as_str()),
                RetryPolicy::no_retry(),
            )
            .await?;

        if response.is_success() {
            debug!(status = response.status, "Graph request succeeded");
            return Ok(response);
        }

        warn!(status = response.status, "Graph request failed");
        let error = match (response.status, item_id) {
            (401, _) => OneDriveError::AuthRequired,
            (404, Some(item_id)) => OneDriveError::ItemNotFound {
                item_id: item_id.to_string(),
            },
            (429, _) | (503, _) => OneDriveError::Throttled(
                response
                    .header("Retry-After")
                    .and_then(|value| value.trim().parse().ok())
                    .unwrap_or(0),
            ),
            (status_code, _) => OneDriveError::ApiError {
                status_code,
                message: response.text_lossy(),
            },
        };
        Err(error.into())
    }

    fn parse<T: serde::de::DeserializeOwned>(response: &HttpResponse) -> Result<T> {
        serde_json::from_slice(&response.body)
            .map_err(|e| OneDriveError::ParseError(e.to_string()).into())
    }

    fn convert_item(item: DriveItem, since: DateTime<Utc>) -> Option<RemoteChange> {
        if !item.is_file() {
            return None;
        }

        let last_modified = item
            .last_modified_date_time
            .as_deref()
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
            .map(|dt| dt.with_timezone(&Utc))?;
        if last_modified <= since {
            return None;
        }

        Some(RemoteChange {
            path: item.full_path(),
            mime_type: item
                .file
                .as_ref()
                .and_then(|file| file.mime_type.clone())
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            external_id: item.id,
            name: item.name,
            last_modified,
            size: item.size,
        })
    }
}

#[async_trait]
impl SyncProvider for OneDriveConnector {
    fn system(&self) -> ExternalSystem {
        ExternalSystem::OneDrive
    }

    #[instrument(skip(self), fields(item_id = %external_id))]
    async fn fetch(&self, external_id: &str) -> Result<Bytes> {
        let url = format!(
            "{}/me/drive/items/{}/content",
            GRAPH_API_BASE,
            urlencoding::encode(external_id)
        );

        let response = self
            .send(
                HttpRequest::new(HttpMethod::Get, url).timeout(TRANSFER_TIMEOUT),
                Some(external_id),
            )
            .await?;

        info!(size = response.body.len(), "Downloaded item from OneDrive");
        Ok(response.body)
    }

    #[instrument(skip(self, content, metadata), fields(size = content.len()))]
    async fn upload(&self, local_doc_id: &str, content: Bytes, metadata: &UploadMetadata) -> Result<String> {
        let url = format!(
            "{}/me/drive/root:/{}:/content",
            GRAPH_API_BASE,
            self.item_path(local_doc_id, &metadata.name)
        );
        let request = HttpRequest::new(HttpMethod::Put, url)
            .content(metadata.mime_type.as_str(), content)
            .timeout(TRANSFER_TIMEOUT);

        let response = self.send(request, None).await?;
        let item: DriveItem = Self::parse(&response)?;

        info!(item_id = %item.id, "Uploaded item to OneDrive");
        Ok(item.id)
    }

    #[instrument(skip(self))]
    async fn list_changes(&self, since: DateTime<Utc>) -> Result<Vec<RemoteChange>> {
        let mut changes = Vec::new();
        let mut url = self.delta_url();

        loop {
            let response = self
                .send(HttpRequest::new(HttpMethod::Get, url).timeout(REQUEST_TIMEOUT), None)
                .await?;
            let page: DeltaResponse = Self::parse(&response)?;

            changes.extend(
                page.value
                    .into_iter()
                    .filter_map(|item| Self::convert_item(item, since)),
            );

            match page.next_link {
                Some(next) => url = next,
                None => break,
            }
        }

        changes.sort_by(|a, b| a.last_modified.cmp(&b.last_modified));
        info!("Listed {} changed items from OneDrive", changes.len());
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::{mock, Sequence};
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
            async fn execute_with_retry(&self, request: HttpRequest, policy: RetryPolicy) -> Result<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).unwrap().with_timezone(&Utc)
    }

    #[tokio::test]
    async fn test_upload_is_path_addressed() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute_with_retry().times(1).returning(|req, _| {
            assert_eq!(req.method, HttpMethod::Put);
            assert_eq!(
                req.url,
                "https://graph.microsoft.com/v1.0/me/drive/root:/Apps/DocSync/doc-1-Q1%20report.pdf:/content"
            );
            assert_eq!(
                req.headers.get("Content-Type"),
                Some(&"application/pdf".to_string())
            );
            assert_eq!(
                req.headers.get("Authorization"),
                Some(&"Bearer token".to_string())
            );
            Ok(response(201, r#"{ "id": "item-42", "name": "doc-1-Q1 report.pdf" }"#))
        });

        let connector = OneDriveConnector::new(Arc::new(mock_http), "token", "/Apps/DocSync/");
        let item_id = connector
            .upload(
                "doc-1",
                Bytes::from_static(b"%PDF"),
                &UploadMetadata::new("Q1 report.pdf", "application/pdf"),
            )
            .await
            .unwrap();

        assert_eq!(item_id, "item-42");
    }

    #[tokio::test]
    async fn test_fetch_content() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute_with_retry().times(1).returning(|req, _| {
            assert!(req.url.ends_with("/me/drive/items/item-42/content"));
            Ok(response(200, "hello"))
        });

        let connector = OneDriveConnector::new(Arc::new(mock_http), "token", "DocSync");
        let content = connector.fetch("item-42").await.unwrap();

        assert_eq!(content, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_fetch_missing_item() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute_with_retry()
            .returning(|_, _| Ok(response(404, r#"{ "error": { "code": "itemNotFound" } }"#)));

        let connector = OneDriveConnector::new(Arc::new(mock_http), "token", "DocSync");
        let err = connector.fetch("item-404").await.unwrap_err();

        assert!(err.to_string().contains("Drive item not found: item-404"));
    }

    #[tokio::test]
    async fn test_throttling_is_surfaced() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().never();
        mock_http
            .expect_execute_with_retry()
            .withf(|_, policy| policy.max_attempts == 1)
            .times(1)
            .returning(|_, _| {
                let mut headers = HashMap::new();
                headers.insert("Retry-After".to_string(), "30".to_string());
                Ok(HttpResponse {
                    status: 429,
                    headers,
                    body: Bytes::new(),
                })
            });

        let connector = OneDriveConnector::new(Arc::new(mock_http), "token", "DocSync");
        let err = connector.fetch("item-1").await.unwrap_err();

        assert!(err.to_string().contains("retry after 30 seconds"));
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute_with_retry()
            .returning(|_, _| Ok(response(401, "")));

        let connector = OneDriveConnector::new(Arc::new(mock_http), "expired", "DocSync");
        let err = connector
            .upload("doc-1", Bytes::new(), &UploadMetadata::new("a.txt", "text/plain"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Authentication required"));
    }

    #[tokio::test]
    async fn test_list_changes_follows_next_link() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = Sequence::new();

        mock_http
            .expect_execute_with_retry()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req, _| {
                assert_eq!(
                    req.url,
                    "https://graph.microsoft.com/v1.0/me/drive/root:/DocSync:/delta"
                );
                Ok(response(
                    200,
                    r#"{
                        "value": [
                            { "id": "old", "name": "old.txt", "size": 1, "lastModifiedDateTime": "2024-01-01T00:00:00Z", "file": {} },
                            { "id": "new", "name": "new.txt", "size": 2, "lastModifiedDateTime": "2024-03-01T00:00:00Z", "file": { "mimeType": "text/plain" } }
                        ],
                        "@odata.nextLink": "https://graph.microsoft.com/v1.0/me/drive/root/delta?token=page2"
                    }"#,
                ))
            });
        mock_http
            .expect_execute_with_retry()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req, _| {
                assert!(req.url.ends_with("token=page2"));
                Ok(response(
                    200,
                    r#"{
                        "value": [
                            { "id": "dir", "name": "sub", "lastModifiedDateTime": "2024-03-02T00:00:00Z", "folder": {} },
                            { "id": "later", "name": "later.bin", "size": 3, "lastModifiedDateTime": "2024-02-15T00:00:00Z", "file": {} }
                        ],
                        "@odata.deltaLink": "https://graph.microsoft.com/v1.0/me/drive/root/delta?token=done"
                    }"#,
                ))
            });

        let connector = OneDriveConnector::new(Arc::new(mock_http), "token", "DocSync");
        let changes = connector
            .list_changes(timestamp("2024-02-01T00:00:00Z"))
            .await
            .unwrap();

        let ids: Vec<_> = changes.iter().map(|c| c.external_id.as_str()).collect();
        assert_eq!(ids, vec!["later", "new"]);
        assert_eq!(changes[0].mime_type, DEFAULT_MIME_TYPE);
        assert_eq!(changes[1].mime_type, "text/plain");
    }

    #[test]
    fn test_from_settings_uses_folder() {
        let settings = OneDriveSettings::new("token");
        let connector = OneDriveConnector::from_settings(Arc::new(MockHttpClient::new()), &settings);

        assert_eq!(connector.folder_path(), OneDriveSettings::DEFAULT_FOLDER);
        assert_eq!(connector.system(), ExternalSystem::OneDrive);
    }
}
