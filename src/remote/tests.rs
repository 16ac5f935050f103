use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::*;

#[derive(Default)]
struct MockState {
    /// path -> (sha, base64 content)
    files: HashMap<String, (String, String)>,
    next_sha: u32,
    conflicts_to_inject: u32,
    put_calls: Vec<PutFile>,
    get_calls: u32,
    fail_get: Option<u16>,
    fail_paths: Vec<String>,
    repos: Vec<Repository>,
}

/// In-memory contents API with sha checks and scripted failures.
#[derive(Clone, Default)]
pub struct MockApi {
    state: Arc<Mutex<MockState>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn with_file(self, path: &str, text: &str) -> Self {
        {
            let mut state = self.state();
            state.next_sha += 1;
            let sha = format!("sha-{}", state.next_sha);
            state
                .files
                .insert(path.to_string(), (sha, encode_content(text)));
        }
        self
    }

    pub fn with_repos(self, repos: &[(&str, &str)]) -> Self {
        self.state().repos = repos
            .iter()
            .map(|(owner, name)| Repository {
                owner: owner.to_string(),
                name: name.to_string(),
            })
            .collect();
        self
    }

    /// The next `count` writes fail with 409, each one after a concurrent
    /// writer bumped the file's sha.
    pub fn inject_conflicts(&self, count: u32) {
        self.state().conflicts_to_inject = count;
    }

    /// Every `get_file` fails with `status`.
    pub fn fail_gets_with(&self, status: u16) {
        self.state().fail_get = Some(status);
    }

    /// Reads of this path fail with a 500.
    pub fn fail_path(&self, path: &str) {
        self.state().fail_paths.push(path.to_string());
    }

    pub fn text(&self, path: &str) -> Option<String> {
        self.state()
            .files
            .get(path)
            .map(|(_, content)| decode_content(content).unwrap())
    }

    pub fn sha(&self, path: &str) -> Option<String> {
        self.state().files.get(path).map(|(sha, _)| sha.clone())
    }

    pub fn put_calls(&self) -> Vec<PutFile> {
        self.state().put_calls.clone()
    }

    pub fn get_calls(&self) -> u32 {
        self.state().get_calls
    }
}

#[async_trait]
impl ContentsApi for MockApi {
    async fn get_file(&self, location: &RemoteFileLocation) -> Result<RemoteEntry, RemoteError> {
        let mut state = self.state();
        state.get_calls += 1;
        if let Some(status) = state.fail_get {
            return Err(RemoteError::from_status(status, "scripted failure"));
        }
        if state.fail_paths.contains(&location.path) {
            return Err(RemoteError::from_status(500, "scripted failure"));
        }
        if state
            .files
            .keys()
            .any(|p| p.starts_with(&format!("{}/", location.path)))
        {
            return Ok(RemoteEntry::Directory);
        }
        state
            .files
            .get(&location.path)
            .map(|(sha, content)| RemoteEntry::File {
                sha: sha.clone(),
                content: content.clone(),
            })
            .ok_or(RemoteError::NotFound)
    }

    async fn put_file(
        &self,
        location: &RemoteFileLocation,
        request: &PutFile,
    ) -> Result<String, RemoteError> {
        let mut state = self.state();
        state.put_calls.push(request.clone());

        if state.conflicts_to_inject > 0 {
            state.conflicts_to_inject -= 1;
            state.next_sha += 1;
            let sha = format!("sha-{}", state.next_sha);
            let concurrent = encode_content("concurrent edit");
            state
                .files
                .insert(location.path.clone(), (sha, concurrent));
            return Err(RemoteError::Conflict);
        }

        let current = state.files.get(&location.path).map(|(sha, _)| sha.clone());
        if current != request.sha {
            return Err(RemoteError::Conflict);
        }

        state.next_sha += 1;
        let sha = format!("sha-{}", state.next_sha);
        state
            .files
            .insert(location.path.clone(), (sha.clone(), request.content.clone()));
        Ok(sha)
    }

    async fn delete_file(
        &self,
        location: &RemoteFileLocation,
        _message: &str,
        sha: &str,
    ) -> Result<(), RemoteError> {
        let mut state = self.state();
        match state.files.get(&location.path) {
            None => Err(RemoteError::NotFound),
            Some((current, _)) if current != sha => Err(RemoteError::Conflict),
            Some(_) => {
                state.files.remove(&location.path);
                Ok(())
            }
        }
    }

    async fn list_repositories(&self, per_page: u32) -> Result<Vec<Repository>, RemoteError> {
        let state = self.state();
        if let Some(status) = state.fail_get {
            return Err(RemoteError::from_status(status, "scripted failure"));
        }
        Ok(state.repos.iter().take(per_page as usize).cloned().collect())
    }
}

fn loc(path: &str) -> RemoteFileLocation {
    RemoteFileLocation::new("me", "notes", path)
}

#[tokio::test]
async fn exists_is_false_for_unwritten_path() {
    let gateway = Gateway::new(MockApi::new());
    assert!(!gateway.exists(&loc("never.json")).await.unwrap());
}

#[tokio::test]
async fn exists_propagates_other_failures() {
    let api = MockApi::new();
    api.fail_gets_with(401);
    let gateway = Gateway::new(api);
    let err = gateway.exists(&loc("a.json")).await.unwrap_err();
    assert!(matches!(err, RemoteError::Unauthorized));
}

#[tokio::test]
async fn write_then_read_returns_same_content() {
    let gateway = Gateway::new(MockApi::new());
    let content = "{\n  \"boards\": []\n}\nünïcödé ✓";
    gateway.write(&loc("cfg.json").into(), content).await.unwrap();
    assert_eq!(
        gateway.read(&loc("cfg.json")).await.unwrap().as_deref(),
        Some(content)
    );
    assert!(gateway.exists(&loc("cfg.json")).await.unwrap());
}

#[tokio::test]
async fn read_distinguishes_missing_from_empty() {
    let api = MockApi::new().with_file("empty.csv", "");
    let gateway = Gateway::new(api);
    assert_eq!(gateway.read(&loc("missing.csv")).await.unwrap(), None);
    assert_eq!(gateway.read(&loc("empty.csv")).await.unwrap().as_deref(), Some(""));
    assert_eq!(gateway.read_or_empty(&loc("missing.csv")).await.unwrap(), "");
}

#[tokio::test]
async fn read_of_directory_fails() {
    let api = MockApi::new().with_file("libraries/a.csv", "term");
    let gateway = Gateway::new(api);
    let err = gateway.read(&loc("libraries")).await.unwrap_err();
    assert!(err.to_string().contains("directory listing"));
}

#[tokio::test]
async fn write_creates_without_sha_and_updates_with_current_sha() {
    let api = MockApi::new();
    let gateway = Gateway::new(api.clone());

    gateway.write(&loc("a.json").into(), "one").await.unwrap();
    let first_sha = api.sha("a.json").unwrap();
    gateway.write(&loc("a.json").into(), "two").await.unwrap();

    let calls = api.put_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].sha, None);
    assert_eq!(calls[1].sha.as_deref(), Some(first_sha.as_str()));
    assert_eq!(calls[1].message, DEFAULT_COMMIT_MESSAGE);
    assert_eq!(api.text("a.json").as_deref(), Some("two"));
}

#[tokio::test]
async fn write_uses_handle_message() {
    let api = MockApi::new();
    let gateway = Gateway::new(api.clone()).with_default_message("default");
    let handle = RemoteFileHandle::from(loc("a.json")).with_message("Add library terms");
    gateway.write(&handle, "x").await.unwrap();
    gateway.write(&loc("a.json").into(), "y").await.unwrap();
    let calls = api.put_calls();
    assert_eq!(calls[0].message, "Add library terms");
    assert_eq!(calls[1].message, "default");
}

#[tokio::test]
async fn write_propagates_non_404_sha_lookup_failure() {
    let api = MockApi::new();
    api.fail_gets_with(403);
    let gateway = Gateway::new(api.clone());
    let err = gateway.write(&loc("a.json").into(), "x").await.unwrap_err();
    assert!(matches!(err, RemoteError::Forbidden));
    assert!(api.put_calls().is_empty());
}

#[tokio::test]
async fn single_conflict_is_retried_with_fresh_sha() {
    let api = MockApi::new().with_file("board.json", "old");
    let gateway = Gateway::new(api.clone());
    api.inject_conflicts(1);

    gateway.write(&loc("board.json").into(), "mine").await.unwrap();

    let calls = api.put_calls();
    assert_eq!(calls.len(), 2);
    assert_ne!(calls[0].sha, calls[1].sha);
    // The retry overwrites the concurrent edit.
    assert_eq!(api.text("board.json").as_deref(), Some("mine"));
}

#[tokio::test]
async fn second_conflict_is_fatal() {
    let api = MockApi::new().with_file("board.json", "old");
    let gateway = Gateway::new(api.clone());
    api.inject_conflicts(2);

    let err = gateway.write(&loc("board.json").into(), "mine").await.unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(api.put_calls().len(), 2);
    assert_eq!(api.text("board.json").as_deref(), Some("concurrent edit"));
}

#[tokio::test]
async fn stale_caller_sha_conflicts_then_recovers() {
    let api = MockApi::new().with_file("a.json", "v1");
    let gateway = Gateway::new(api.clone());
    let handle = RemoteFileHandle::from(loc("a.json")).with_sha("stale");

    gateway.write(&handle, "v2").await.unwrap();

    // One lookup before the first attempt, one after the conflict.
    assert_eq!(api.get_calls(), 2);
    assert_eq!(api.put_calls()[0].sha.as_deref(), Some("stale"));
    assert_eq!(api.text("a.json").as_deref(), Some("v2"));
}

#[tokio::test]
async fn caller_sha_still_checks_access_before_writing() {
    let api = MockApi::new().with_file("a.json", "v1");
    let current = api.sha("a.json").unwrap();
    api.fail_gets_with(401);
    let gateway = Gateway::new(api.clone());
    let handle = RemoteFileHandle::from(loc("a.json")).with_sha(current);

    let err = gateway.write(&handle, "v2").await.unwrap_err();

    assert!(matches!(err, RemoteError::Unauthorized));
    assert!(api.put_calls().is_empty());
}

#[tokio::test]
async fn delete_reads_sha_then_removes() {
    let api = MockApi::new().with_file("old.json", "bye");
    let gateway = Gateway::new(api.clone());
    gateway.delete(&loc("old.json").into()).await.unwrap();
    assert!(!gateway.exists(&loc("old.json")).await.unwrap());

    let err = gateway.delete(&loc("old.json").into()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn list_repositories_caps_at_page_size() {
    let names: Vec<String> = (0..150).map(|i| format!("repo-{i}")).collect();
    let pairs: Vec<(&str, &str)> = names.iter().map(|n| ("me", n.as_str())).collect();
    let gateway = Gateway::new(MockApi::new().with_repos(&pairs));

    let repos = gateway.list_repositories().await.unwrap();
    assert_eq!(repos.len(), REPO_PAGE_SIZE as usize);
    assert_eq!(repos[0].slug(), "me/repo-0");
}

#[test]
fn content_encoding_round_trips_utf8() {
    let text = "line one\nline two ✓";
    assert_eq!(decode_content(&encode_content(text)).unwrap(), text);
    assert!(matches!(decode_content("%%%"), Err(RemoteError::Decode(_))));
}
