use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// MIME type Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// What a remote entry is. Folders are never uploadable content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    File,
    Folder,
}

impl ObjectKind {
    pub fn from_mime_type(mime_type: &str) -> Self {
        if mime_type == FOLDER_MIME_TYPE {
            ObjectKind::Folder
        } else {
            ObjectKind::File
        }
    }
}

/// Snapshot of one object held by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// Opaque, store-assigned identifier
    pub id: String,
    pub name: String,
    /// Size in bytes (0 for folders)
    pub size: u64,
    /// Creation time as reported by the store (RFC 3339)
    pub created_at: String,
    /// Link a user can open to view the object
    pub link: String,
    pub kind: ObjectKind,
}

impl RemoteObject {
    /// Parsed creation time, or `None` when the store sent something that
    /// is not RFC 3339.
    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    pub fn is_folder(&self) -> bool {
        self.kind == ObjectKind::Folder
    }
}

/// Identity of a freshly created object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedObject {
    pub id: String,
    pub link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(created_at: &str) -> RemoteObject {
        RemoteObject {
            id: "1".to_string(),
            name: "a.txt".to_string(),
            size: 1,
            created_at: created_at.to_string(),
            link: String::new(),
            kind: ObjectKind::File,
        }
    }

    #[test]
    fn test_created_time_parses_rfc3339() {
        let t = object("2023-04-01T10:00:00.000Z").created_time().unwrap();
        assert_eq!(t.timestamp(), 1680343200);
    }

    #[test]
    fn test_created_time_rejects_garbage() {
        assert!(object("yesterday").created_time().is_none());
        assert!(object("").created_time().is_none());
    }

    #[test]
    fn test_kind_from_mime_type() {
        assert_eq!(ObjectKind::from_mime_type(FOLDER_MIME_TYPE), ObjectKind::Folder);
        assert_eq!(ObjectKind::from_mime_type("text/plain"), ObjectKind::File);
    }
}
