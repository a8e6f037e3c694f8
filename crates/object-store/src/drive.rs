//! Google Drive v3 backend.
//!
//! Uploads use Drive's resumable protocol: one `POST` opens an upload
//! session, then the content is `PUT` in fixed-size chunks. Drive answers
//! `308 Resume Incomplete` for every chunk except the last, which returns
//! the created file. Progress is reported after each acknowledged chunk.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, LOCATION, RANGE};
use reqwest::{redirect, Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use url::Url;

use crate::error::{Result, StoreError};
use crate::object::{CreatedObject, ObjectKind, RemoteObject};
use crate::object_store::{read_chunk, NewObject, ObjectStore, ProgressFn};

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/";

/// Drive requires chunk sizes to be a multiple of 256 KiB.
const CHUNK_GRANULARITY: usize = 256 * 1024;

/// Default upload chunk size (8 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 32 * CHUNK_GRANULARITY;

const LIST_FIELDS: &str = "nextPageToken,files(id,name,size,mimeType,createdTime,webViewLink)";
const CREATE_FIELDS: &str = "id,webViewLink";
const PAGE_SIZE: &str = "1000";

/// 308 answers in a row that persist nothing before the upload gives up.
const MAX_STALLED_CHUNKS: u32 = 3;

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    // Drive encodes int64 fields as decimal strings
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    created_time: String,
    #[serde(default)]
    web_view_link: String,
}

impl From<DriveFile> for RemoteObject {
    fn from(file: DriveFile) -> Self {
        RemoteObject {
            kind: ObjectKind::from_mime_type(&file.mime_type),
            id: file.id,
            name: file.name,
            size: file.size.unwrap_or(0),
            created_at: file.created_time,
            link: file.web_view_link,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct UploadMetadata<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parents: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveCreated {
    id: String,
    #[serde(default)]
    web_view_link: String,
}

/// Object store backed by a Google Drive account.
#[derive(Debug, Clone)]
pub struct DriveStore {
    client: Client,
    access_token: String,
    api_base: Url,
    chunk_size: usize,
}

impl DriveStore {
    pub fn new(access_token: &str) -> Result<Self> {
        let base = Url::parse(DRIVE_API_BASE)
            .map_err(|e| StoreError::Config(format!("invalid drive api base: {}", e)))?;
        Self::with_api_base(access_token, base)
    }

    pub fn with_api_base(access_token: &str, api_base: Url) -> Result<Self> {
        // 308 is Drive's "resume incomplete", not a redirect to follow
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            access_token: access_token.to_string(),
            api_base,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Set the upload chunk size, rounded up to Drive's 256 KiB granularity.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        let chunks = chunk_size.div_ceil(CHUNK_GRANULARITY).max(1);
        self.chunk_size = chunks * CHUNK_GRANULARITY;
        self
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_base
            .join(path)
            .map_err(|e| StoreError::Config(format!("invalid drive endpoint {}: {}", path, e)))
    }

    /// `files/<id>` under the v3 API, with `id` escaped as one path segment.
    fn file_endpoint(&self, id: &str) -> Result<Url> {
        let mut url = self.endpoint("drive/v3/files")?;
        url.path_segments_mut()
            .map_err(|_| {
                StoreError::Config(format!("drive api base {} cannot hold a path", self.api_base))
            })?
            .push(id);
        Ok(url)
    }

    async fn open_session(
        &self,
        name: &str,
        parent_id: Option<&str>,
        mime_type: &str,
        total_size: u64,
    ) -> Result<String> {
        let metadata = UploadMetadata {
            name,
            parents: parent_id.into_iter().collect(),
        };

        let response = self
            .client
            .post(self.endpoint("upload/drive/v3/files")?)
            .bearer_auth(&self.access_token)
            .query(&[("uploadType", "resumable"), ("fields", CREATE_FIELDS)])
            .header("X-Upload-Content-Type", mime_type)
            .header("X-Upload-Content-Length", total_size)
            .json(&metadata)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::from_response(response).await);
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| StoreError::InvalidResponse("upload session has no location".into()))
    }
}

/// `Content-Range` value for the chunk starting at `offset`.
fn content_range(offset: u64, len: u64, total: u64) -> String {
    if len == 0 {
        format!("bytes */{}", total)
    } else {
        format!("bytes {}-{}/{}", offset, offset + len - 1, total)
    }
}

/// Bytes Drive says it has persisted, from a `Range: bytes=0-N` header.
///
/// No header means nothing has been persisted yet.
fn persisted_bytes(range: Option<&str>) -> Result<u64> {
    let Some(range) = range else { return Ok(0) };
    range
        .strip_prefix("bytes=0-")
        .and_then(|end| end.parse::<u64>().ok())
        .map(|end| end + 1)
        .ok_or_else(|| StoreError::InvalidResponse(format!("unparsable range header {:?}", range)))
}

/// The part of `chunk` (sent from `offset`) that Drive has not persisted.
///
/// Only bytes still held in `chunk` can be sent again.
fn unpersisted_tail(chunk: &Bytes, offset: u64, persisted: u64) -> Result<Bytes> {
    let end = offset + chunk.len() as u64;
    if persisted < offset || persisted > end {
        return Err(StoreError::InvalidResponse(format!(
            "drive persisted {} bytes, outside the chunk {}..{}",
            persisted, offset, end
        )));
    }
    Ok(chunk.slice((persisted - offset) as usize..))
}

#[async_trait]
impl ObjectStore for DriveStore {
    fn name(&self) -> &str {
        "drive"
    }

    async fn list(&self) -> Result<Vec<RemoteObject>> {
        let url = self.endpoint("drive/v3/files")?;
        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(url.clone())
                .bearer_auth(&self.access_token)
                .query(&[("fields", LIST_FIELDS), ("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(StoreError::from_response(response).await);
            }
            let page: FileList = response.json().await?;
            objects.extend(page.files.into_iter().map(RemoteObject::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(count = objects.len(), "listed drive files");
        Ok(objects)
    }

    async fn create(&self, object: NewObject, on_progress: ProgressFn) -> Result<CreatedObject> {
        let NewObject {
            name,
            parent_id,
            mime_type,
            total_size: total,
            mut content,
        } = object;
        let session = self
            .open_session(&name, parent_id.as_deref(), &mime_type, total)
            .await?;

        tracing::debug!(name = %name, total, "opened drive upload session");

        let mut offset: u64 = 0;
        let mut stalled = 0;
        let mut chunk = read_chunk(&mut content, self.chunk_size).await?;

        loop {
            let len = chunk.len() as u64;
            if offset + len < total && chunk.len() < self.chunk_size {
                return Err(StoreError::InvalidResponse(format!(
                    "content ended after {} of {} bytes",
                    offset + len,
                    total
                )));
            }

            let response = self
                .client
                .put(&session)
                .bearer_auth(&self.access_token)
                .header(CONTENT_RANGE, content_range(offset, len, total))
                .header(CONTENT_LENGTH, len)
                .body(chunk.clone())
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::PERMANENT_REDIRECT {
                let range = response.headers().get(RANGE).and_then(|v| v.to_str().ok());
                let persisted = persisted_bytes(range)?;
                let tail = unpersisted_tail(&chunk, offset, persisted)?;

                if persisted == offset {
                    stalled += 1;
                    if stalled > MAX_STALLED_CHUNKS {
                        return Err(StoreError::InvalidResponse(format!(
                            "drive stopped accepting data at byte {}",
                            offset
                        )));
                    }
                } else {
                    stalled = 0;
                    on_progress(persisted, total);
                }
                if !tail.is_empty() {
                    tracing::debug!(
                        persisted,
                        resend = tail.len(),
                        "drive persisted a partial chunk"
                    );
                }

                offset = persisted;
                let refill = read_chunk(&mut content, self.chunk_size - tail.len()).await?;
                chunk = if tail.is_empty() {
                    refill
                } else {
                    let mut joined = BytesMut::with_capacity(tail.len() + refill.len());
                    joined.extend_from_slice(&tail);
                    joined.extend_from_slice(&refill);
                    joined.freeze()
                };
                continue;
            }

            if !status.is_success() {
                return Err(StoreError::from_response(response).await);
            }

            on_progress(offset + len, total);
            let created: DriveCreated = response.json().await?;
            return Ok(CreatedObject {
                id: created.id,
                link: created.web_view_link,
            });
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let url = self.file_endpoint(id)?;
        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(id.to_string())),
            _ => Err(StoreError::from_response(response).await),
        }
    }
}
