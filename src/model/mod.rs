pub mod board;
pub mod library;
pub mod location;

pub use board::{AppConfig, Board, BoardData, Column, Priority, Task};
pub use library::{LibraryFile, LibraryItem, TaskHyperTag};
pub use location::{RemoteFileHandle, RemoteFileLocation};
