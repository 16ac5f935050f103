//! The app config file and the board files it points to.
//!
//! Every save rewrites the whole file. Mutating calls work on a copy of the
//! config and only replace the caller's value once the save went through.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::BoardError;
use crate::model::{AppConfig, Board, BoardData, LibraryFile, RemoteFileHandle, RemoteFileLocation};
use crate::remote::{ContentsApi, Gateway};

pub struct Workspace<A: ContentsApi> {
    gateway: Gateway<A>,
    config_location: RemoteFileLocation,
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl<A: ContentsApi> Workspace<A> {
    pub fn new(gateway: Gateway<A>, config_location: RemoteFileLocation) -> Self {
        Self {
            gateway,
            config_location,
        }
    }

    pub fn gateway(&self) -> &Gateway<A> {
        &self.gateway
    }

    pub fn config_location(&self) -> &RemoteFileLocation {
        &self.config_location
    }

    /// Read a JSON file. `None` when the file is missing or blank.
    async fn read_json<T: DeserializeOwned>(&self, location: &RemoteFileLocation) -> Result<Option<T>> {
        let text = self
            .gateway
            .read(location)
            .await
            .with_context(|| format!("Failed to load {location}"))?;
        match text {
            Some(text) if !text.trim().is_empty() => serde_json::from_str(&text)
                .map(Some)
                .with_context(|| format!("Failed to parse {location}")),
            _ => Ok(None),
        }
    }

    async fn write_json<T: serde::Serialize>(
        &self,
        location: &RemoteFileLocation,
        value: &T,
        message: Option<String>,
    ) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        let mut handle = RemoteFileHandle::from(location);
        handle.message = message;
        self.gateway
            .write(&handle, &json)
            .await
            .with_context(|| format!("Failed to save {location}"))
    }

    /// Load the app config; a missing file yields an empty config pointing at
    /// this workspace's location.
    pub async fn load_config(&self) -> Result<AppConfig> {
        let config = self
            .read_json::<AppConfig>(&self.config_location)
            .await?
            .unwrap_or_else(|| {
                debug!(location = %self.config_location, "no app config yet, starting empty");
                AppConfig {
                    git_config: Some(self.config_location.clone()),
                    ..AppConfig::default()
                }
            });
        Ok(config)
    }

    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        self.write_json(&self.config_location, config, None).await
    }

    async fn commit(&self, config: &mut AppConfig, updated: AppConfig) -> Result<()> {
        self.save_config(&updated).await?;
        *config = updated;
        Ok(())
    }

    pub async fn add_board(
        &self,
        config: &mut AppConfig,
        name: &str,
        location: RemoteFileLocation,
    ) -> Result<Board> {
        let board = Board {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            git_config: location,
            last_modified: now(),
        };
        let mut updated = config.clone();
        updated.boards.push(board.clone());
        self.commit(config, updated).await?;
        Ok(board)
    }

    pub async fn update_board(
        &self,
        config: &mut AppConfig,
        id: &str,
        name: Option<&str>,
        location: Option<RemoteFileLocation>,
    ) -> Result<Board> {
        let mut updated = config.clone();
        let board = updated
            .boards
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| BoardError::UnknownBoard(id.to_string()))?;
        if let Some(name) = name {
            board.name = name.to_string();
        }
        if let Some(location) = location {
            board.git_config = location;
        }
        board.last_modified = now();
        let board = board.clone();
        self.commit(config, updated).await?;
        Ok(board)
    }

    /// Drop a board from the config. Its data file stays in the repository.
    pub async fn delete_board(&self, config: &mut AppConfig, id: &str) -> Result<Board> {
        let mut updated = config.clone();
        let index = updated
            .boards
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| BoardError::UnknownBoard(id.to_string()))?;
        let removed = updated.boards.remove(index);
        self.commit(config, updated).await?;
        Ok(removed)
    }

    /// Register a library, replacing any entry that points at the same file.
    /// A replaced entry keeps its id so task tags stay attached. Returns the
    /// stored entry.
    pub async fn add_library(&self, config: &mut AppConfig, mut library: LibraryFile) -> Result<LibraryFile> {
        let mut updated = config.clone();
        match updated.libraries.iter_mut().find(|l| l.git_config == library.git_config) {
            Some(existing) => {
                library.id = existing.id.clone();
                *existing = library.clone();
            }
            None => updated.libraries.push(library.clone()),
        }
        self.commit(config, updated).await?;
        Ok(library)
    }

    /// Rename a library or point it at another file. `lastModified` is bumped
    /// so cached items are reloaded.
    pub async fn update_library(
        &self,
        config: &mut AppConfig,
        id: &str,
        name: Option<&str>,
        location: Option<RemoteFileLocation>,
    ) -> Result<LibraryFile> {
        let mut updated = config.clone();
        let library = updated
            .libraries
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| BoardError::UnknownLibrary(id.to_string()))?;
        if let Some(name) = name {
            library.name = name.to_string();
        }
        if let Some(location) = location {
            if location != library.git_config {
                // Another file may have other columns.
                library.fields = None;
            }
            library.git_config = location;
        }
        library.last_modified = Some(now());
        let library = library.clone();
        self.commit(config, updated).await?;
        Ok(library)
    }

    pub async fn remove_library(&self, config: &mut AppConfig, id: &str) -> Result<LibraryFile> {
        let mut updated = config.clone();
        let index = updated
            .libraries
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| BoardError::UnknownLibrary(id.to_string()))?;
        let removed = updated.libraries.remove(index);
        self.commit(config, updated).await?;
        Ok(removed)
    }

    /// Columns and tasks of a board; the default layout when nothing has been
    /// saved yet.
    pub async fn load_board(&self, board: &Board) -> Result<BoardData> {
        Ok(self
            .read_json::<BoardData>(&board.git_config)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_board(&self, board: &Board, data: &BoardData) -> Result<()> {
        self.write_json(
            &board.git_config,
            data,
            Some(format!("Update board {}", board.name)),
        )
        .await
    }
}
