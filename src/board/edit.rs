//! In-memory edits of a board's columns and tasks. Nothing here touches the
//! network; callers save the whole [`BoardData`] afterwards.

use uuid::Uuid;

use crate::error::BoardError;
use crate::model::{BoardData, Column, Priority, Task, TaskHyperTag};

#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<String>,
    pub hyper_tags: Vec<TaskHyperTag>,
}

/// Fields to change on an existing task. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<String>>,
    pub hyper_tags: Option<Vec<TaskHyperTag>>,
}

impl BoardData {
    pub fn column(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Columns in display order.
    pub fn sorted_columns(&self) -> Vec<&Column> {
        let mut columns: Vec<&Column> = self.columns.iter().collect();
        columns.sort_by_key(|c| c.order);
        columns
    }

    pub fn tasks_in<'a>(&'a self, column_id: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.iter().filter(move |t| t.status == column_id)
    }

    fn require_column(&self, id: &str) -> Result<(), BoardError> {
        self.column(id)
            .map(|_| ())
            .ok_or_else(|| BoardError::UnknownColumn(id.to_string()))
    }

    fn task_mut(&mut self, id: &str) -> Result<&mut Task, BoardError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| BoardError::UnknownTask(id.to_string()))
    }

    pub fn add_task(&mut self, column_id: &str, new: NewTask) -> Result<&Task, BoardError> {
        self.require_column(column_id)?;
        self.tasks.push(Task {
            id: Uuid::new_v4().to_string(),
            title: new.title,
            description: new.description,
            status: column_id.to_string(),
            priority: new.priority,
            due_date: new.due_date,
            hyper_tags: new.hyper_tags,
        });
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    pub fn edit_task(&mut self, id: &str, patch: TaskPatch) -> Result<(), BoardError> {
        let task = self.task_mut(id)?;
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        if let Some(tags) = patch.hyper_tags {
            task.hyper_tags = tags;
        }
        Ok(())
    }

    pub fn delete_task(&mut self, id: &str) -> Result<Task, BoardError> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| BoardError::UnknownTask(id.to_string()))?;
        Ok(self.tasks.remove(index))
    }

    pub fn move_task(&mut self, id: &str, column_id: &str) -> Result<(), BoardError> {
        self.require_column(column_id)?;
        self.task_mut(id)?.status = column_id.to_string();
        Ok(())
    }

    /// Append a column at the end of the display order.
    pub fn add_column(&mut self, title: &str) -> &Column {
        let order = self.columns.iter().map(|c| c.order.saturating_add(1)).max().unwrap_or(0);
        self.columns.push(Column {
            id: format!("column-{}", Uuid::new_v4()),
            title: title.to_string(),
            tasks: Vec::new(),
            order,
        });
        &self.columns[self.columns.len() - 1]
    }

    pub fn rename_column(&mut self, id: &str, title: &str) -> Result<(), BoardError> {
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| BoardError::UnknownColumn(id.to_string()))?;
        column.title = title.to_string();
        Ok(())
    }

    /// Remove a column. Its tasks move to the first remaining column; when it
    /// was the last column they keep pointing at the removed id.
    pub fn delete_column(&mut self, id: &str) -> Result<Column, BoardError> {
        let index = self
            .columns
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| BoardError::UnknownColumn(id.to_string()))?;
        let removed = self.columns.remove(index);

        let target = self.sorted_columns().first().map(|c| c.id.clone());
        if let Some(target) = target {
            for task in self.tasks.iter_mut().filter(|t| t.status == removed.id) {
                task.status = target.clone();
            }
        }
        Ok(removed)
    }

    /// Move a column to `new_index` in display order and renumber all orders.
    pub fn reorder_column(&mut self, id: &str, new_index: usize) -> Result<(), BoardError> {
        self.require_column(id)?;
        self.columns.sort_by_key(|c| c.order);
        let from = self
            .columns
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| BoardError::UnknownColumn(id.to_string()))?;
        let column = self.columns.remove(from);
        let to = new_index.min(self.columns.len());
        self.columns.insert(to, column);
        for (order, column) in self.columns.iter_mut().enumerate() {
            column.order = order as u32;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str) -> NewTask {
        NewTask {
            title: title.into(),
            ..Default::default()
        }
    }

    #[test]
    fn add_task_assigns_unique_ids() {
        let mut board = BoardData::default();
        let first = board.add_task("column-1", task("a")).unwrap().id.clone();
        let second = board.add_task("column-1", task("b")).unwrap().id.clone();
        assert_ne!(first, second);
        assert_eq!(board.tasks_in("column-1").count(), 2);
    }

    #[test]
    fn add_task_to_unknown_column_fails() {
        let mut board = BoardData::default();
        let err = board.add_task("nope", task("a")).unwrap_err();
        assert_eq!(err, BoardError::UnknownColumn("nope".into()));
        assert!(board.tasks.is_empty());
    }

    #[test]
    fn edit_task_applies_only_given_fields() {
        let mut board = BoardData::default();
        let id = board.add_task("column-1", task("a")).unwrap().id.clone();
        board
            .edit_task(
                &id,
                TaskPatch {
                    priority: Some(Priority::High),
                    due_date: Some(Some("2024-03-20".into())),
                    ..Default::default()
                },
            )
            .unwrap();
        let edited = board.task(&id).unwrap();
        assert_eq!(edited.title, "a");
        assert_eq!(edited.priority, Priority::High);
        assert_eq!(edited.due_date.as_deref(), Some("2024-03-20"));
    }

    #[test]
    fn move_and_delete_task() {
        let mut board = BoardData::default();
        let id = board.add_task("column-1", task("a")).unwrap().id.clone();
        board.move_task(&id, "column-3").unwrap();
        assert_eq!(board.task(&id).unwrap().status, "column-3");
        assert!(board.move_task(&id, "column-9").is_err());

        let removed = board.delete_task(&id).unwrap();
        assert_eq!(removed.title, "a");
        assert_eq!(board.delete_task(&id).unwrap_err(), BoardError::UnknownTask(id));
    }

    #[test]
    fn add_column_goes_last() {
        let mut board = BoardData::default();
        let id = board.add_column("Review").id.clone();
        let sorted = board.sorted_columns();
        assert_eq!(sorted.last().unwrap().id, id);
        assert_eq!(sorted.last().unwrap().order, 3);
    }

    #[test]
    fn add_column_after_maximal_order_does_not_overflow() {
        let mut board = BoardData::default();
        board.columns[2].order = u32::MAX;
        let id = board.add_column("Review").id.clone();
        assert_eq!(board.column(&id).unwrap().order, u32::MAX);
        assert_eq!(board.sorted_columns().last().unwrap().id, id);
    }

    #[test]
    fn delete_column_moves_tasks_to_first_remaining() {
        let mut board = BoardData::default();
        let id = board.add_task("column-2", task("a")).unwrap().id.clone();
        board.delete_column("column-2").unwrap();
        assert_eq!(board.task(&id).unwrap().status, "column-1");
        assert_eq!(board.columns.len(), 2);
    }

    #[test]
    fn deleting_last_column_keeps_tasks() {
        let mut board = BoardData {
            columns: Vec::new(),
            tasks: Vec::new(),
        };
        let col = board.add_column("Only").id.clone();
        board.add_task(&col, task("a")).unwrap();
        board.delete_column(&col).unwrap();
        assert!(board.columns.is_empty());
        assert_eq!(board.tasks.len(), 1);
        assert_eq!(board.tasks[0].status, col);
    }

    #[test]
    fn reorder_column_renumbers() {
        let mut board = BoardData::default();
        board.reorder_column("column-3", 0).unwrap();
        let ids: Vec<_> = board.sorted_columns().iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, ["column-3", "column-1", "column-2"]);
        let orders: Vec<_> = board.sorted_columns().iter().map(|c| c.order).collect();
        assert_eq!(orders, [0, 1, 2]);

        board.reorder_column("column-3", 99).unwrap();
        assert_eq!(board.sorted_columns().last().unwrap().id, "column-3");
    }

    #[test]
    fn rename_column() {
        let mut board = BoardData::default();
        board.rename_column("column-1", "Backlog").unwrap();
        assert_eq!(board.column("column-1").unwrap().title, "Backlog");
        assert!(board.rename_column("x", "y").is_err());
    }
}
