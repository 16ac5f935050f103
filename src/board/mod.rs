pub mod edit;
pub mod workspace;

pub use edit::{NewTask, TaskPatch};
pub use workspace::Workspace;
