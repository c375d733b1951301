//! Google Drive API connector implementation
//!
//! Implements the `SyncProvider` trait for Google Drive API v3.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::provider::{ExternalSystem, RemoteChange, SyncProvider, UploadMetadata};
use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, SecondsFormat, Utc};
use core_runtime::config::GoogleDriveSettings;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::GoogleDriveError;
use crate::types::{DriveFile, FilesListResponse, NewDriveFile, LOCAL_DOC_ID_PROPERTY};

/// Google Drive API base URL
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Google Drive upload endpoint base URL
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Maximum results per page (Google Drive API limit)
const MAX_PAGE_SIZE: u32 = 1000;

/// Fields to request for file resources
const FILE_FIELDS: &str = "id,name,mimeType,size,modifiedTime,md5Checksum,parents,trashed,appProperties";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(120);

/// Google Drive API connector
///
/// # Features
///
/// - Media download by file id
/// - Idempotent upload: files are tagged with the local document id and
///   re-uploads overwrite the tagged file instead of creating a copy
/// - Change listing by modification time
/// - Exponential backoff for rate limiting, delegated to the `HttpClient`
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::GoogleDriveConnector;
/// use bridge_traits::SyncProvider;
///
/// let connector = GoogleDriveConnector::new(http_client, access_token);
/// let content = connector.fetch("1AbCdEf").await?;
/// ```
pub struct GoogleDriveConnector {
    http_client: Arc<dyn HttpClient>,
    access_token: String,
    folder_id: Option<String>,
    retry_policy: RetryPolicy,
}

impl GoogleDriveConnector {
    /// Create a new Google Drive connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `access_token` - OAuth 2.0 access token with `drive.file` scope
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: impl Into<String>) -> Self {
        Self {
            http_client,
            access_token: access_token.into(),
            folder_id: None,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn from_settings(http_client: Arc<dyn HttpClient>, settings: &GoogleDriveSettings) -> Self {
        let connector = Self::new(http_client, settings.access_token.clone());
        match &settings.folder_id {
            Some(folder_id) => connector.with_folder_id(folder_id.clone()),
            None => connector,
        }
    }

    /// Create new files inside this folder instead of the Drive root
    pub fn with_folder_id(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Parse RFC 3339 timestamp
    fn parse_timestamp(rfc3339: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(rfc3339)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Convert DriveFile to RemoteChange; folders and undated files are skipped
    fn convert_file(drive_file: DriveFile) -> Option<RemoteChange> {
        if drive_file.is_folder() {
            return None;
        }

        let last_modified = drive_file
            .modified_time
            .as_deref()
            .and_then(Self::parse_timestamp)?;

        Some(RemoteChange {
            size: drive_file
                .size
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            external_id: drive_file.id,
            name: drive_file.name,
            path: None,
            mime_type: drive_file.mime_type,
            last_modified,
        })
    }

    /// Send an authorized request and map non-2xx statuses to errors.
    ///
    /// Rate limiting and server errors are retried by the `HttpClient`
    /// according to the connector's retry policy.
    async fn send(&self, request: HttpRequest, file_id: Option<&str>) -> Result<HttpResponse> {
        let request = request.bearer_token(self.access_token.as_str());
        let response = self
            .http_client
            .execute_with_retry(request, self.retry_policy.clone())
            .await?;

        if response.is_success() {
            debug!(status = response.status, "API request succeeded");
            return Ok(response);
        }

        warn!(status = response.status, "API request failed");
        let error = match (response.status, file_id) {
            (401, _) => GoogleDriveError::AuthenticationFailed(response.text_lossy()),
            (404, Some(file_id)) => GoogleDriveError::FileNotFound {
                file_id: file_id.to_string(),
            },
            (429, _) => GoogleDriveError::RateLimitExceeded {
                retry_after_seconds: response
                    .header("Retry-After")
                    .and_then(|value| value.trim().parse().ok())
                    .unwrap_or(0),
            },
            (status_code, _) => GoogleDriveError::ApiError {
                status_code,
                message: response.text_lossy(),
            },
        };
        Err(error.into())
    }

    fn parse<T: serde::de::DeserializeOwned>(response: &HttpResponse, what: &str) -> Result<T> {
        serde_json::from_slice(&response.body).map_err(|e| {
            GoogleDriveError::ParseError(format!("Failed to parse {}: {}", what, e)).into()
        })
    }

    /// Find the non-trashed file tagged with `local_doc_id`
    async fn find_by_local_id(&self, local_doc_id: &str) -> Result<Option<DriveFile>> {
        let query = format!(
            "appProperties has {{ key='{}' and value='{}' }} and trashed = false",
            LOCAL_DOC_ID_PROPERTY,
            local_doc_id.replace('\'', "\\'")
        );
        let url = format!(
            "{}/files?q={}&pageSize=1&fields=files({})",
            DRIVE_API_BASE,
            urlencoding::encode(&query),
            FILE_FIELDS
        );

        let response = self
            .send(HttpRequest::new(HttpMethod::Get, url).timeout(REQUEST_TIMEOUT), None)
            .await?;
        let list: FilesListResponse = Self::parse(&response, "files list response")?;
        Ok(list.files.into_iter().next())
    }

    async fn update_media(&self, file_id: &str, content: Bytes, mime_type: &str) -> Result<DriveFile> {
        let url = format!(
            "{}/files/{}?uploadType=media&fields=id",
            DRIVE_UPLOAD_BASE,
            urlencoding::encode(file_id)
        );
        let request = HttpRequest::new(HttpMethod::Patch, url)
            .content(mime_type, content)
            .timeout(TRANSFER_TIMEOUT);

        let response = self.send(request, Some(file_id)).await?;
        Self::parse(&response, "updated file")
    }

    async fn create(&self, local_doc_id: &str, content: Bytes, metadata: &UploadMetadata) -> Result<DriveFile> {
        let new_file = NewDriveFile::new(
            local_doc_id,
            metadata.name.as_str(),
            metadata.mime_type.as_str(),
            self.folder_id.as_deref(),
        );
        let boundary = format!("docsync-{}", local_doc_id);
        let body = multipart_body(&boundary, &new_file, &metadata.mime_type, &content)?;

        let url = format!("{}/files?uploadType=multipart&fields=id", DRIVE_UPLOAD_BASE);
        let request = HttpRequest::new(HttpMethod::Post, url)
            .content(format!("multipart/related; boundary={}", boundary), body)
            .timeout(TRANSFER_TIMEOUT);

        let response = self.send(request, None).await?;
        Self::parse(&response, "created file")
    }
}

/// Assemble a `multipart/related` body: JSON metadata part, then media part
fn multipart_body(boundary: &str, metadata: &NewDriveFile, mime_type: &str, content: &Bytes) -> Result<Bytes> {
    let json = serde_json::to_vec(metadata).map_err(|e| {
        GoogleDriveError::ParseError(format!("Failed to serialize file metadata: {}", e))
    })?;

    let mut body = BytesMut::with_capacity(json.len() + content.len() + 256);
    body.put_slice(format!("--{}\r\n", boundary).as_bytes());
    body.put_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.put_slice(&json);
    body.put_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.put_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
    body.put_slice(content);
    body.put_slice(format!("\r\n--{}--", boundary).as_bytes());

    Ok(body.freeze())
}

#[async_trait]
impl SyncProvider for GoogleDriveConnector {
    fn system(&self) -> ExternalSystem {
        ExternalSystem::GoogleDrive
    }

    #[instrument(skip(self), fields(file_id = %external_id))]
    async fn fetch(&self, external_id: &str) -> Result<Bytes> {
        let url = format!(
            "{}/files/{}?alt=media",
            DRIVE_API_BASE,
            urlencoding::encode(external_id)
        );

        let response = self
            .send(
                HttpRequest::new(HttpMethod::Get, url).timeout(TRANSFER_TIMEOUT),
                Some(external_id),
            )
            .await?;

        info!(size = response.body.len(), "Downloaded file from Google Drive");
        Ok(response.body)
    }

    #[instrument(skip(self, content, metadata), fields(size = content.len()))]
    async fn upload(&self, local_doc_id: &str, content: Bytes, metadata: &UploadMetadata) -> Result<String> {
        let file = match self.find_by_local_id(local_doc_id).await? {
            Some(existing) => {
                debug!(file_id = %existing.id, "Overwriting existing Drive file");
                self.update_media(&existing.id, content, &metadata.mime_type)
                    .await?
            }
            None => self.create(local_doc_id, content, metadata).await?,
        };

        info!(file_id = %file.id, "Uploaded file to Google Drive");
        Ok(file.id)
    }

    #[instrument(skip(self))]
    async fn list_changes(&self, since: DateTime<Utc>) -> Result<Vec<RemoteChange>> {
        let mut query = format!(
            "modifiedTime > '{}' and trashed = false",
            since.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
        if let Some(folder_id) = &self.folder_id {
            query.push_str(&format!(" and '{}' in parents", folder_id));
        }

        let mut changes = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/files?q={}&pageSize={}&orderBy=modifiedTime&fields=nextPageToken,files({})",
                DRIVE_API_BASE,
                urlencoding::encode(&query),
                MAX_PAGE_SIZE,
                FILE_FIELDS
            );
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
            }

            let response = self
                .send(HttpRequest::new(HttpMethod::Get, url).timeout(REQUEST_TIMEOUT), None)
                .await?;
            let list: FilesListResponse = Self::parse(&response, "files list response")?;

            changes.extend(list.files.into_iter().filter_map(Self::convert_file));

            match list.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!("Listed {} changed files from Google Drive", changes.len());
        Ok(changes)
    }
}
