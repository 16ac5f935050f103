use serde::{Deserialize, Serialize};
use std::fmt;

/// One file in one repository. `path` is repository-relative, no leading slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteFileLocation {
    pub owner: String,
    pub repo: String,
    pub path: String,
}

impl RemoteFileLocation {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, path: impl AsRef<str>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            path: normalize_path(path.as_ref()),
        }
    }

    /// Same repository, different file.
    pub fn sibling(&self, path: impl AsRef<str>) -> Self {
        Self::new(self.owner.clone(), self.repo.clone(), path)
    }

    /// Parse `owner/repo` into its two halves.
    pub fn parse_slug(slug: &str) -> Option<(String, String)> {
        let (owner, repo) = slug.trim().split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some((owner.to_string(), repo.to_string()))
    }
}

impl fmt::Display for RemoteFileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.owner, self.repo, self.path)
    }
}

fn normalize_path(path: &str) -> String {
    path.trim().trim_start_matches('/').to_string()
}

/// A location plus the optimistic-concurrency version tag and an optional
/// commit message. A missing `sha` on write means "create".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileHandle {
    pub location: RemoteFileLocation,
    pub sha: Option<String>,
    pub message: Option<String>,
}

impl RemoteFileHandle {
    pub fn with_sha(mut self, sha: impl Into<String>) -> Self {
        self.sha = Some(sha.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl From<RemoteFileLocation> for RemoteFileHandle {
    fn from(location: RemoteFileLocation) -> Self {
        Self {
            location,
            sha: None,
            message: None,
        }
    }
}

impl From<&RemoteFileLocation> for RemoteFileHandle {
    fn from(location: &RemoteFileLocation) -> Self {
        location.clone().into()
    }
}
