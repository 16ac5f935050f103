//! Kanban boards and CSV glossary libraries kept as plain files in a GitHub
//! repository.

pub mod board;
pub mod cli;
pub mod config;
pub mod csv;
pub mod error;
pub mod library;
pub mod model;
pub mod remote;
pub mod token;
