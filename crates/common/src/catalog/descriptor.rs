use serde::{Deserialize, Serialize};

use object_store::RemoteObject;

/// One row of the merged file listing.
///
/// Built fresh for every listing; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Local path, or the remote link for files that only exist remotely
    pub path: String,
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Remote object id once uploaded; `null` until then
    #[serde(default)]
    pub upload_id: Option<String>,
    /// Upload progress, 0 to 100
    #[serde(rename = "upload_progress", default)]
    pub progress: f64,
    /// Remote viewing link once uploaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl FileDescriptor {
    /// A local file that has not been uploaded.
    pub fn local(path: impl Into<String>, name: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            size,
            upload_id: None,
            progress: 0.0,
            link: None,
        }
    }

    /// A local file with an upload in flight.
    pub fn uploading(
        path: impl Into<String>,
        name: impl Into<String>,
        size: u64,
        progress: f64,
    ) -> Self {
        Self {
            progress,
            ..Self::local(path, name, size)
        }
    }

    /// A remote object with no local counterpart; its link stands in for the path.
    pub fn remote(object: &RemoteObject) -> Self {
        let mut file = Self::local(object.link.clone(), object.name.clone(), object.size);
        file.mark_uploaded(object);
        file
    }

    /// Take on the identity of the remote object this file was uploaded as.
    pub fn mark_uploaded(&mut self, object: &RemoteObject) {
        // Remote-only rows are keyed by the link of the object they show
        if self.link.as_deref() == Some(self.path.as_str()) {
            self.path = object.link.clone();
        }
        self.upload_id = Some(object.id.clone());
        self.link = Some(object.link.clone());
        self.progress = 100.0;
    }

    pub fn is_uploaded(&self) -> bool {
        self.upload_id.is_some()
    }
}
