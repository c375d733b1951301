//! Microsoft Graph drive item types
//!
//! See: https://learn.microsoft.com/graph/api/resources/driveitem

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub size: u64,

    /// RFC 3339 timestamp
    pub last_modified_date_time: Option<String>,

    /// Present only for files
    pub file: Option<FileFacet>,

    /// Present only for folders
    pub folder: Option<serde_json::Value>,

    /// Present when the item was removed (delta responses)
    pub deleted: Option<serde_json::Value>,

    pub parent_reference: Option<ItemReference>,
}

impl DriveItem {
    pub fn is_file(&self) -> bool {
        self.file.is_some() && self.folder.is_none() && self.deleted.is_none()
    }

    /// `{parent path}/{name}`, when Graph reported the parent path
    pub fn full_path(&self) -> Option<String> {
        self.parent_reference
            .as_ref()
            .and_then(|parent| parent.path.as_deref())
            .map(|parent| format!("{}/{}", parent, self.name))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFacet {
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReference {
    pub path: Option<String>,
}

/// One page of a delta query
#[derive(Debug, Deserialize)]
pub struct DeltaResponse {
    #[serde(default)]
    pub value: Vec<DriveItem>,

    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,

    #[serde(rename = "@odata.deltaLink")]
    pub delta_link: Option<String>,
}
