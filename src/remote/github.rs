use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{ContentsApi, PutFile, RemoteEntry, Repository};
use crate::error::RemoteError;
use crate::model::RemoteFileLocation;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("gitboard/", env!("CARGO_PKG_VERSION"));

/// GitHub REST client authenticated with a personal access token.
pub struct GitHubClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_API_BASE, token)
    }

    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn contents_url(&self, location: &RemoteFileLocation) -> String {
        contents_url(&self.base_url, location)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }
}

/// Contents endpoint for a file, with each path segment percent-encoded.
pub fn contents_url(base_url: &str, location: &RemoteFileLocation) -> String {
    let path = location
        .path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!(
        "{}/repos/{}/{}/contents/{}",
        base_url,
        urlencoding::encode(&location.owner),
        urlencoding::encode(&location.repo),
        path
    )
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct PutResponse {
    content: Option<PutContent>,
}

#[derive(Deserialize)]
struct PutContent {
    sha: String,
}

#[derive(Deserialize)]
struct GhRepo {
    name: String,
    owner: GhOwner,
}

#[derive(Deserialize)]
struct GhOwner {
    login: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Interpret a contents GET body. An array is a directory listing.
///
/// Files over 1 MB come back with `encoding: "none"` and an empty `content`;
/// those are rejected rather than read as empty files.
pub fn parse_entry(body: Value) -> Result<RemoteEntry, RemoteError> {
    if body.is_array() {
        return Ok(RemoteEntry::Directory);
    }
    let resp: ContentResponse =
        serde_json::from_value(body).map_err(|e| RemoteError::Decode(e.to_string()))?;
    if let Some(encoding) = resp.encoding.as_deref().filter(|e| *e != "base64") {
        return Err(RemoteError::Decode(format!(
            "File content not inlined (encoding \"{encoding}\"); it is too large for the contents API"
        )));
    }
    match (resp.kind.as_str(), resp.content) {
        ("file", Some(content)) => Ok(RemoteEntry::File {
            sha: resp.sha,
            content,
        }),
        ("dir", _) => Ok(RemoteEntry::Directory),
        (kind, _) => Err(RemoteError::Decode(format!(
            "Expected file content but got {kind} entry"
        ))),
    }
}

/// Turn a non-success response into a [`RemoteError`], keeping the API's
/// own message for unclassified statuses.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    Err(RemoteError::from_status(status.as_u16(), message))
}

#[async_trait]
impl ContentsApi for GitHubClient {
    async fn get_file(&self, location: &RemoteFileLocation) -> Result<RemoteEntry, RemoteError> {
        let resp = self
            .request(reqwest::Method::GET, &self.contents_url(location))
            .send()
            .await?;
        let body: Value = check(resp).await?.json().await?;
        parse_entry(body)
    }

    async fn put_file(
        &self,
        location: &RemoteFileLocation,
        request: &PutFile,
    ) -> Result<String, RemoteError> {
        let resp = self
            .request(reqwest::Method::PUT, &self.contents_url(location))
            .json(request)
            .send()
            .await?;
        let body: PutResponse = check(resp).await?.json().await?;
        body.content
            .map(|c| c.sha)
            .ok_or_else(|| RemoteError::Decode("No content sha in write response".into()))
    }

    async fn delete_file(
        &self,
        location: &RemoteFileLocation,
        message: &str,
        sha: &str,
    ) -> Result<(), RemoteError> {
        let body = serde_json::json!({ "message": message, "sha": sha });
        let resp = self
            .request(reqwest::Method::DELETE, &self.contents_url(location))
            .json(&body)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    async fn list_repositories(&self, per_page: u32) -> Result<Vec<Repository>, RemoteError> {
        let per_page = per_page.to_string();
        let resp = self
            .request(reqwest::Method::GET, &format!("{}/user/repos", self.base_url))
            .query(&[("sort", "updated"), ("per_page", per_page.as_str())])
            .send()
            .await?;
        let repos: Vec<GhRepo> = check(resp).await?.json().await?;
        Ok(repos
            .into_iter()
            .map(|r| Repository {
                owner: r.owner.login,
                name: r.name,
            })
            .collect())
    }
}
