//! Flat list of glossary items across every library file.

use std::collections::HashSet;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::csv;
use crate::model::{LibraryFile, LibraryItem, TaskHyperTag};
use crate::remote::{ContentsApi, Gateway};

/// Identity of a library set: id, path and modification stamp of every entry,
/// in order. A change in any of them invalidates the resolved items.
pub fn library_set_key(libraries: &[LibraryFile]) -> String {
    libraries
        .iter()
        .map(|lib| {
            format!(
                "{}:{}:{}",
                lib.id,
                lib.git_config.path,
                lib.last_modified.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Turn the stored CSV of one library into items. Rows without a term are
/// dropped; ids use the row's position among the data rows.
pub fn items_from_csv(text: &str, library: &LibraryFile) -> Vec<LibraryItem> {
    let table = csv::extract_rows(text, library.fields.as_deref());
    let term_index = table.columns.first().copied().unwrap_or(0);

    table
        .rows
        .iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let term = row.get(term_index).cloned().unwrap_or_default();
            if term.is_empty() {
                return None;
            }
            let columns = table
                .named_cells(row)
                .filter(|(_, value)| !value.is_empty())
                .map(|(header, value)| (header.to_string(), value.to_string()))
                .collect();
            Some(LibraryItem {
                id: format!("{}-item-{}", library.id, index),
                term,
                library_file_id: library.id.clone(),
                columns,
            })
        })
        .collect()
}

/// Keep the first item for every `(library file, term)` pair.
pub fn dedup_items(items: Vec<LibraryItem>) -> Vec<LibraryItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert((item.library_file_id.clone(), item.term.clone())))
        .collect()
}

/// Fetch and parse every library. A file that cannot be read is logged and
/// skipped; it never fails the batch.
pub async fn load_library_items<A: ContentsApi>(
    gateway: &Gateway<A>,
    libraries: &[LibraryFile],
) -> Vec<LibraryItem> {
    let reads = libraries
        .iter()
        .map(|library| async move { (library, gateway.read(&library.git_config).await) });

    let mut items = Vec::new();
    for (library, result) in join_all(reads).await {
        match result {
            Ok(Some(text)) => items.extend(items_from_csv(&text, library)),
            Ok(None) => debug!(library = %library.id, "library file does not exist yet"),
            Err(e) => warn!(library = %library.id, "Failed to load library: {e}"),
        }
    }
    dedup_items(items)
}

/// Cached library items, recomputed when the library set changes.
#[derive(Debug, Default)]
pub struct LibraryResolver {
    key: Option<String>,
    items: Vec<LibraryItem>,
}

impl LibraryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute only if `libraries` differs from the last resolved set.
    pub async fn sync<A: ContentsApi>(
        &mut self,
        gateway: &Gateway<A>,
        libraries: &[LibraryFile],
    ) -> &[LibraryItem] {
        let key = library_set_key(libraries);
        if self.key.as_deref() != Some(key.as_str()) {
            self.items = load_library_items(gateway, libraries).await;
            self.key = Some(key);
        }
        &self.items
    }

    /// Recompute unconditionally.
    pub async fn refresh<A: ContentsApi>(
        &mut self,
        gateway: &Gateway<A>,
        libraries: &[LibraryFile],
    ) -> &[LibraryItem] {
        self.items = load_library_items(gateway, libraries).await;
        self.key = Some(library_set_key(libraries));
        &self.items
    }

    pub fn items(&self) -> &[LibraryItem] {
        &self.items
    }

    pub fn items_for<'a>(&'a self, library_id: &'a str) -> impl Iterator<Item = &'a LibraryItem> + 'a {
        self.items
            .iter()
            .filter(move |item| item.library_file_id == library_id)
    }

    /// First item carrying `term`, across all libraries.
    pub fn find_term(&self, term: &str) -> Option<&LibraryItem> {
        self.items.iter().find(|item| item.term == term)
    }

    /// The item a task tag points at. Both the item id and its library file
    /// must match; `None` once the row moved or the library was removed.
    pub fn lookup(&self, tag: &TaskHyperTag) -> Option<&LibraryItem> {
        self.items
            .iter()
            .find(|item| item.id == tag.library_item_id && item.library_file_id == tag.library_file_id)
    }
}
