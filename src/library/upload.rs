//! Turning a local CSV file into a library stored next to the app config.

use anyhow::{bail, Context, Result};

use crate::csv;
use crate::model::{LibraryFile, RemoteFileHandle, RemoteFileLocation};
use crate::remote::{ContentsApi, Gateway};

/// Lower-case file stem with every run of other characters turned into `-`.
pub fn safe_name(file_name: &str) -> String {
    let stem = file_name.strip_suffix(".csv").unwrap_or(file_name);
    let mut out = String::with_capacity(stem.len());
    let mut in_run = false;
    for ch in stem.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            out.push(ch);
            in_run = false;
        } else if !in_run {
            out.push('-');
            in_run = true;
        }
    }
    out
}

/// A validated upload, ready to be written.
#[derive(Debug, Clone)]
pub struct PreparedUpload {
    pub library: LibraryFile,
    pub content: String,
}

#[derive(Debug)]
pub enum UploadOutcome {
    Uploaded(LibraryFile),
    /// A file already exists at the target path and overwriting was not
    /// requested. Nothing was written.
    AlreadyExists(PreparedUpload),
}

/// Validate `text` and describe where it will be stored: the app repository,
/// under `libraries/<safe name>.csv`. Headers found in the file are pinned.
pub fn prepare_upload(
    file_name: &str,
    text: &str,
    app_location: &RemoteFileLocation,
) -> Result<PreparedUpload> {
    let parsed = csv::parse_document(text).with_context(|| format!("Failed to parse {file_name}"))?;
    let name = safe_name(file_name);
    let library = LibraryFile {
        id: uuid::Uuid::new_v4().to_string(),
        git_config: app_location.sibling(default_library_path(&name)),
        name,
        last_modified: Some(chrono::Utc::now().to_rfc3339()),
        fields: Some(parsed.headers),
    };
    Ok(PreparedUpload {
        library,
        content: parsed.content,
    })
}

/// `libraries/<safe name>.csv`, where uploads land and new libraries point
/// by default.
pub fn default_library_path(name: &str) -> String {
    format!("libraries/{}.csv", safe_name(name))
}

/// Retarget a prepared upload at a new name, keeping its content and pinned
/// headers. Used when the original target is taken.
pub fn rename_upload(
    prepared: PreparedUpload,
    new_name: &str,
    app_location: &RemoteFileLocation,
) -> Result<PreparedUpload> {
    let name = safe_name(new_name.trim());
    if name.trim_matches('-').is_empty() {
        bail!("'{new_name}' does not make a usable file name");
    }
    let mut library = prepared.library;
    library.git_config = app_location.sibling(default_library_path(&name));
    library.name = name;
    Ok(PreparedUpload {
        library,
        content: prepared.content,
    })
}

/// Describe an existing CSV file as a library. Headers are not pinned, so
/// they are read from the file's first line on every load.
pub fn new_library(name: &str, location: RemoteFileLocation) -> LibraryFile {
    LibraryFile {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.trim().to_string(),
        git_config: location,
        last_modified: Some(chrono::Utc::now().to_rfc3339()),
        fields: None,
    }
}

pub async fn upload_library<A: ContentsApi>(
    gateway: &Gateway<A>,
    prepared: PreparedUpload,
    overwrite: bool,
) -> Result<UploadOutcome> {
    let location = &prepared.library.git_config;
    if !overwrite
        && gateway
            .exists(location)
            .await
            .context("Failed to check for an existing library file")?
    {
        return Ok(UploadOutcome::AlreadyExists(prepared));
    }

    let handle = RemoteFileHandle::from(location)
        .with_message(format!("Upload library {}", prepared.library.name));
    gateway
        .write(&handle, &prepared.content)
        .await
        .with_context(|| format!("Failed to upload library to {location}"))?;
    Ok(UploadOutcome::Uploaded(prepared.library))
}
