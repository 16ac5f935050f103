use serde::{Deserialize, Serialize};

use super::library::{LibraryFile, TaskHyperTag};
use super::location::RemoteFileLocation;

/// Contents of the app config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub git_config: Option<RemoteFileLocation>,
    #[serde(default)]
    pub boards: Vec<Board>,
    #[serde(default)]
    pub libraries: Vec<LibraryFile>,
}

impl AppConfig {
    pub fn board(&self, id: &str) -> Option<&Board> {
        self.boards.iter().find(|b| b.id == id)
    }

    pub fn library(&self, id: &str) -> Option<&LibraryFile> {
        self.libraries.iter().find(|l| l.id == id)
    }
}

/// A board entry in the app config. Its columns and tasks live in the file at
/// `git_config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub name: String,
    pub git_config: RemoteFileLocation,
    pub last_modified: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority '{other}' (expected low, medium or high)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Id of the column holding the task.
    pub status: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hyper_tags: Vec<TaskHyperTag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub title: String,
    /// Always written empty; tasks are stored flat in [`BoardData::tasks`].
    #[serde(default)]
    pub tasks: Vec<Task>,
    pub order: u32,
}

/// Contents of a board data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardData {
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Default for BoardData {
    fn default() -> Self {
        let column = |id: &str, title: &str, order| Column {
            id: id.into(),
            title: title.into(),
            tasks: Vec::new(),
            order,
        };
        BoardData {
            columns: vec![
                column("column-1", "To Do", 0),
                column("column-2", "In Progress", 1),
                column("column-3", "Done", 2),
            ],
            tasks: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_config_reads_files_without_libraries() {
        let json = r#"{"gitConfig": null, "boards": []}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn board_data_round_trip_keeps_camel_case() {
        let mut data = BoardData::default();
        data.tasks.push(Task {
            id: "t1".into(),
            title: "Write docs".into(),
            description: String::new(),
            status: "column-1".into(),
            priority: Priority::High,
            due_date: Some("2024-03-22".into()),
            hyper_tags: Vec::new(),
        });
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["tasks"][0]["dueDate"], "2024-03-22");
        assert_eq!(json["tasks"][0]["priority"], "high");
        assert!(json["tasks"][0].get("hyperTags").is_none());

        let back: BoardData = serde_json::from_value(json).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn default_board_has_three_columns() {
        let data = BoardData::default();
        let titles: Vec<_> = data.columns.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["To Do", "In Progress", "Done"]);
        assert!(data.tasks.is_empty());
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }
}
