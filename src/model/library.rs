use serde::{Deserialize, Serialize};

use super::location::RemoteFileLocation;

/// A CSV glossary tracked in the app config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryFile {
    pub id: String,
    pub name: String,
    pub git_config: RemoteFileLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// Canonical header order. When absent the first CSV row is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

/// One glossary row. `id` is `<library id>-item-<row index>`, so it only stays
/// stable while the row order of the source file does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItem {
    pub id: String,
    pub term: String,
    pub library_file_id: String,
    /// Non-empty cells keyed by header name, in header order.
    pub columns: Vec<(String, String)>,
}

impl LibraryItem {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Display fields for a tag's detail view: every column except `id` and
    /// `term`, labelled in title case (`associated_material` becomes
    /// "Associated Material").
    pub fn details(&self) -> Vec<(String, &str)> {
        self.columns
            .iter()
            .filter(|(name, value)| name != "id" && name != "term" && !value.trim().is_empty())
            .map(|(name, value)| (field_label(name), value.as_str()))
            .collect()
    }
}

fn field_label(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Association between a task and a library item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskHyperTag {
    pub term: String,
    pub library_item_id: String,
    pub library_file_id: String,
}

impl From<&LibraryItem> for TaskHyperTag {
    fn from(item: &LibraryItem) -> Self {
        Self {
            term: item.term.clone(),
            library_item_id: item.id.clone(),
            library_file_id: item.library_file_id.clone(),
        }
    }
}
