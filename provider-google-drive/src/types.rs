//! Google Drive API response types
//!
//! Data structures for (de)serializing Google Drive API v3 payloads.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key of the app property that ties a Drive file to a local document
pub const LOCAL_DOC_ID_PROPERTY: &str = "localDocId";

/// Google Drive API file resource
///
/// See: https://developers.google.com/drive/api/v3/reference/files#resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub mime_type: String,

    /// File size in bytes, as a decimal string (omitted for folders)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Modification time (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5_checksum: Option<String>,

    #[serde(default)]
    pub parents: Vec<String>,

    #[serde(default)]
    pub trashed: bool,

    /// Private key/value pairs visible only to this application
    #[serde(default)]
    pub app_properties: HashMap<String, String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == "application/vnd.google-apps.folder"
    }
}

/// Google Drive API files.list response
///
/// See: https://developers.google.com/drive/api/v3/reference/files/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    #[serde(default)]
    pub files: Vec<DriveFile>,

    /// Token for next page
    pub next_page_token: Option<String>,

    #[serde(default)]
    pub incomplete_search: bool,
}

/// Metadata part of a multipart create request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDriveFile {
    pub name: String,
    pub mime_type: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,

    pub app_properties: HashMap<String, String>,
}

impl NewDriveFile {
    pub fn new(
        local_doc_id: &str,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        folder_id: Option<&str>,
    ) -> Self {
        let mut app_properties = HashMap::new();
        app_properties.insert(LOCAL_DOC_ID_PROPERTY.to_string(), local_doc_id.to_string());

        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            parents: folder_id.map(|id| vec![id.to_string()]).unwrap_or_default(),
            app_properties,
        }
    }
}
