pub mod github;

use async_trait::async_trait;
use base64::Engine;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::RemoteError;
use crate::model::{RemoteFileHandle, RemoteFileLocation};

pub const DEFAULT_COMMIT_MESSAGE: &str = "Update kanban board data";
/// Largest page the repository listing asks for. No further pages are read.
pub const REPO_PAGE_SIZE: u32 = 100;

/// What the contents endpoint returned for a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEntry {
    /// A file with its version tag and base64 payload.
    File { sha: String, content: String },
    Directory,
}

impl RemoteEntry {
    pub fn sha(&self) -> Option<&str> {
        match self {
            RemoteEntry::File { sha, .. } => Some(sha),
            RemoteEntry::Directory => None,
        }
    }
}

/// Body of a create-or-update call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PutFile {
    pub message: String,
    /// Base64 of the UTF-8 file content.
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl Repository {
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Raw calls against a hosting platform's contents API.
#[async_trait]
pub trait ContentsApi: Send + Sync {
    async fn get_file(&self, location: &RemoteFileLocation) -> Result<RemoteEntry, RemoteError>;

    /// Create or update a file. Returns the new version tag.
    async fn put_file(
        &self,
        location: &RemoteFileLocation,
        request: &PutFile,
    ) -> Result<String, RemoteError>;

    async fn delete_file(
        &self,
        location: &RemoteFileLocation,
        message: &str,
        sha: &str,
    ) -> Result<(), RemoteError>;

    /// Repositories visible to the credentials, most recently updated first.
    async fn list_repositories(&self, per_page: u32) -> Result<Vec<Repository>, RemoteError>;
}

pub fn encode_content(text: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(text.as_bytes())
}

/// Decode a contents payload. The API wraps base64 at 60 columns, so line
/// breaks are dropped before decoding.
pub fn decode_content(encoded: &str) -> Result<String, RemoteError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| RemoteError::Decode(format!("invalid base64 content: {e}")))?;
    String::from_utf8(bytes).map_err(|e| RemoteError::Decode(format!("content is not UTF-8: {e}")))
}

/// File-level read/write protocol on top of a [`ContentsApi`].
pub struct Gateway<A: ContentsApi> {
    api: A,
    default_message: String,
}

impl<A: ContentsApi> Gateway<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            default_message: DEFAULT_COMMIT_MESSAGE.to_string(),
        }
    }

    pub fn with_default_message(mut self, message: impl Into<String>) -> Self {
        self.default_message = message.into();
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// `false` for a 404, every other failure propagates.
    pub async fn exists(&self, location: &RemoteFileLocation) -> Result<bool, RemoteError> {
        match self.api.get_file(location).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// File text, or `None` when nothing exists at the path. An existing empty
    /// file is `Some("")`.
    pub async fn read(&self, location: &RemoteFileLocation) -> Result<Option<String>, RemoteError> {
        debug!(%location, "reading remote file");
        match self.api.get_file(location).await {
            Ok(RemoteEntry::File { content, .. }) => decode_content(&content).map(Some),
            Ok(RemoteEntry::Directory) => Err(RemoteError::Decode(
                "Expected file content but got directory listing".into(),
            )),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// [`Gateway::read`] with a missing file reported as empty text.
    pub async fn read_or_empty(&self, location: &RemoteFileLocation) -> Result<String, RemoteError> {
        Ok(self.read(location).await?.unwrap_or_default())
    }

    async fn current_sha(&self, location: &RemoteFileLocation) -> Result<Option<String>, RemoteError> {
        match self.api.get_file(location).await {
            Ok(entry) => Ok(entry.sha().map(String::from)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create or overwrite a file with `content`.
    ///
    /// The current metadata is always fetched first, so auth failures stop
    /// the write before anything is sent; a 404 means create. A `sha` on the
    /// handle takes precedence over the fetched one. A 409 on the write triggers exactly one refetch of the
    /// sha and one more attempt, which overwrites whatever landed in between.
    /// A second 409 is returned to the caller.
    pub async fn write(&self, handle: &RemoteFileHandle, content: &str) -> Result<(), RemoteError> {
        let location = &handle.location;
        let current = self.current_sha(location).await?;
        let sha = handle.sha.clone().or(current);

        let mut request = PutFile {
            message: handle
                .message
                .clone()
                .unwrap_or_else(|| self.default_message.clone()),
            content: encode_content(content),
            sha,
        };

        match self.api.put_file(location, &request).await {
            Ok(new_sha) => {
                info!(%location, sha = %new_sha, "saved remote file");
                Ok(())
            }
            Err(e) if e.is_conflict() => {
                warn!(%location, "write conflicted, retrying once with the latest sha");
                let Some(fresh) = self.api.get_file(location).await?.sha().map(String::from) else {
                    return Err(RemoteError::Conflict);
                };
                request.sha = Some(fresh);
                let new_sha = self.api.put_file(location, &request).await?;
                info!(%location, sha = %new_sha, "saved remote file after retry");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Remove a file. The current sha is read first; a missing file is
    /// `RemoteError::NotFound`.
    pub async fn delete(&self, handle: &RemoteFileHandle) -> Result<(), RemoteError> {
        let location = &handle.location;
        let sha = match &handle.sha {
            Some(sha) => sha.clone(),
            None => self
                .api
                .get_file(location)
                .await?
                .sha()
                .map(String::from)
                .ok_or_else(|| RemoteError::Decode(format!("{location} is a directory")))?,
        };
        let message = handle
            .message
            .clone()
            .unwrap_or_else(|| format!("Delete {}", location.path));
        self.api.delete_file(location, &message, &sha).await?;
        info!(%location, "deleted remote file");
        Ok(())
    }

    pub async fn list_repositories(&self) -> Result<Vec<Repository>, RemoteError> {
        self.api.list_repositories(REPO_PAGE_SIZE).await
    }
}

#[cfg(test)]
pub mod tests;
