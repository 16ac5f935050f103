//! Command-line front end. Each command loads what it needs, performs one
//! action and saves the whole file back.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::board::{NewTask, TaskPatch, Workspace};
use crate::config::{self, AppLocation, Settings, DEFAULT_CONFIG_PATH};
use crate::library::{self, LibraryResolver, UploadOutcome};
use crate::model::{
    AppConfig, Board, BoardData, LibraryFile, Priority, RemoteFileLocation, TaskHyperTag,
};
use crate::remote::github::GitHubClient;
use crate::remote::Gateway;
use crate::token::{FileStore, TokenStore};

/// Kanban boards stored in your own GitHub repository
#[derive(Parser)]
#[command(name = "gitboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Verify a personal access token and remember it
    Login { token: String },
    /// Forget the stored token
    Logout,
    /// List repositories the token can see, most recently updated first
    Repos,
    /// Choose where the app config file lives
    Init {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        repo: String,
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        path: String,
    },
    #[command(subcommand)]
    Board(BoardCommand),
    #[command(subcommand)]
    Task(TaskCommand),
    #[command(subcommand)]
    Column(ColumnCommand),
    #[command(subcommand)]
    Library(LibraryCommand),
}

#[derive(Subcommand)]
enum BoardCommand {
    /// List boards in the app config
    List,
    /// Register a new board
    Add {
        name: String,
        /// File holding the board's columns and tasks
        #[arg(long)]
        path: String,
        /// Repository owner (defaults to the app config's repository)
        #[arg(long, requires = "repo")]
        owner: Option<String>,
        #[arg(long, requires = "owner")]
        repo: Option<String>,
    },
    Rename { board: String, name: String },
    /// Remove a board from the app config (its data file is kept)
    Delete { board: String },
    /// Print columns and tasks
    Show { board: String },
}

#[derive(Subcommand)]
enum TaskCommand {
    Add {
        board: String,
        column: String,
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "medium")]
        priority: Priority,
        #[arg(long)]
        due: Option<String>,
        /// Library term to tag the task with (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Change fields of an existing task
    Edit {
        board: String,
        task: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        priority: Option<Priority>,
        /// Due date; an empty value clears it
        #[arg(long)]
        due: Option<String>,
    },
    Move {
        board: String,
        task: String,
        column: String,
    },
    Delete { board: String, task: String },
}

#[derive(Subcommand)]
enum ColumnCommand {
    Add { board: String, title: String },
    Rename { board: String, column: String, title: String },
    /// Move a column to a new position (0 is leftmost)
    Move {
        board: String,
        column: String,
        position: usize,
    },
    /// Remove a column; its tasks move to the first remaining column
    Delete { board: String, column: String },
}

#[derive(Subcommand)]
enum LibraryCommand {
    List,
    /// Upload a CSV file as a new library
    Upload {
        file: std::path::PathBuf,
        /// Store under this name instead of the file's own
        #[arg(long)]
        name: Option<String>,
        /// Replace an existing library file with the same name
        #[arg(long)]
        force: bool,
    },
    /// Register a CSV file that already exists in a repository
    Add {
        #[arg(long)]
        name: String,
        /// Repository owner (defaults to the app config's repository)
        #[arg(long, requires = "repo")]
        owner: Option<String>,
        #[arg(long, requires = "owner")]
        repo: Option<String>,
        /// Defaults to libraries/<name>.csv
        #[arg(long)]
        path: Option<String>,
    },
    /// Rename a library or point it at another file
    Edit {
        library: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, requires = "repo")]
        owner: Option<String>,
        #[arg(long, requires = "owner")]
        repo: Option<String>,
        #[arg(long)]
        path: Option<String>,
    },
    /// Print library items (all libraries, or one)
    Items {
        #[arg(long)]
        library: Option<String>,
    },
    /// Remove a library from the app config
    Remove { library: String },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG always wins; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let settings = config::load_settings()?;
    let tokens = TokenStore::new(FileStore::open_default());

    match cli.command {
        Command::Login { token } => handle_login(&settings, &tokens, &token).await,
        Command::Logout => {
            tokens.clear()?;
            println!("Token removed.");
            Ok(())
        }
        Command::Repos => {
            let gateway = gateway(&settings, &tokens)?;
            for repo in gateway.list_repositories().await? {
                println!("{}", repo.slug());
            }
            Ok(())
        }
        Command::Init { owner, repo, path } => handle_init(settings, owner, repo, &path),
        Command::Board(cmd) => handle_board(cmd, workspace(&settings, &tokens)?).await,
        Command::Task(cmd) => handle_task(cmd, workspace(&settings, &tokens)?).await,
        Command::Column(cmd) => handle_column(cmd, workspace(&settings, &tokens)?).await,
        Command::Library(cmd) => handle_library(cmd, workspace(&settings, &tokens)?).await,
    }
}

fn gateway(settings: &Settings, tokens: &TokenStore<FileStore>) -> Result<Gateway<GitHubClient>> {
    let Some(token) = tokens.current() else {
        bail!("Not logged in. Run `gitboard login <token>` first.");
    };
    let client = GitHubClient::with_base_url(&settings.api_base, token);
    Ok(Gateway::new(client).with_default_message(settings.commit_message()))
}

fn workspace(settings: &Settings, tokens: &TokenStore<FileStore>) -> Result<Workspace<GitHubClient>> {
    let Some(location) = settings.app_location() else {
        bail!("No app config location. Run `gitboard init --owner <owner> --repo <repo>` first.");
    };
    Ok(Workspace::new(gateway(settings, tokens)?, location))
}

async fn handle_login(settings: &Settings, tokens: &TokenStore<FileStore>, token: &str) -> Result<()> {
    let client = GitHubClient::with_base_url(&settings.api_base, token);
    let repos = Gateway::new(client)
        .list_repositories()
        .await
        .context("Authentication failed")?;
    tokens.save(token)?;
    println!("Connected to GitHub ({} repositories visible).", repos.len());
    Ok(())
}

fn handle_init(mut settings: Settings, owner: String, repo: String, path: &str) -> Result<()> {
    if owner.contains('/') || repo.contains('/') {
        bail!("Owner and repository are plain names, got '{owner}' and '{repo}'");
    }
    let app = AppLocation {
        owner,
        repo,
        path: path.trim_start_matches('/').to_string(),
    };
    println!("App config: {}/{}/{}", app.owner, app.repo, app.path);
    settings.app = Some(app);
    config::save_settings(&settings)
}

/// Match a board by id, id prefix or (case-insensitive) name.
fn find_board<'a>(config: &'a AppConfig, key: &str) -> Result<&'a Board> {
    config
        .boards
        .iter()
        .find(|b| b.id == key)
        .or_else(|| config.boards.iter().find(|b| b.name.eq_ignore_ascii_case(key)))
        .or_else(|| config.boards.iter().find(|b| b.id.starts_with(key)))
        .with_context(|| format!("No board matching '{key}'"))
}

/// Match a column by id or (case-insensitive) title.
fn find_column(data: &BoardData, key: &str) -> Result<String> {
    data.columns
        .iter()
        .find(|c| c.id == key)
        .or_else(|| data.columns.iter().find(|c| c.title.eq_ignore_ascii_case(key)))
        .map(|c| c.id.clone())
        .with_context(|| format!("No column matching '{key}'"))
}

fn find_task(data: &BoardData, key: &str) -> Result<String> {
    data.tasks
        .iter()
        .find(|t| t.id == key)
        .or_else(|| data.tasks.iter().find(|t| t.id.starts_with(key)))
        .or_else(|| data.tasks.iter().find(|t| t.title.eq_ignore_ascii_case(key)))
        .map(|t| t.id.clone())
        .with_context(|| format!("No task matching '{key}'"))
}

/// Match a library by id or (case-insensitive) name.
fn find_library<'a>(config: &'a AppConfig, key: &str) -> Result<&'a LibraryFile> {
    config
        .libraries
        .iter()
        .find(|l| l.id == key)
        .or_else(|| config.libraries.iter().find(|l| l.name.eq_ignore_ascii_case(key)))
        .with_context(|| format!("No library matching '{key}'"))
}

/// `#term` followed by the tagged item's fields, one per line.
fn tag_lines(resolver: &LibraryResolver, tag: &TaskHyperTag) -> Vec<String> {
    let mut lines = vec![format!("#{}", tag.term)];
    match resolver.lookup(tag).map(|item| item.details()) {
        Some(details) if !details.is_empty() => {
            lines.extend(details.into_iter().map(|(label, value)| format!("  {label}: {value}")));
        }
        _ => lines.push("  (no additional details)".to_string()),
    }
    lines
}

fn print_board(board: &Board, data: &BoardData, resolver: &LibraryResolver) {
    println!("{} ({})", board.name, board.git_config);
    for column in data.sorted_columns() {
        println!("\n## {} [{}]", column.title, column.id);
        for task in data.tasks_in(&column.id) {
            let due = task
                .due_date
                .as_deref()
                .map(|d| format!(" due {d}"))
                .unwrap_or_default();
            let short: String = task.id.chars().take(8).collect();
            println!("  - {} ({:?}{}) [{short}]", task.title, task.priority, due);
            for tag in &task.hyper_tags {
                for line in tag_lines(resolver, tag) {
                    println!("      {line}");
                }
            }
        }
    }
}

async fn handle_board(cmd: BoardCommand, ws: Workspace<GitHubClient>) -> Result<()> {
    let mut config = ws.load_config().await?;
    match cmd {
        BoardCommand::List => {
            if config.boards.is_empty() {
                println!("No boards yet. Create one with `gitboard board add`.");
            }
            for board in &config.boards {
                println!("{}  {}  ({})", board.id, board.name, board.git_config);
            }
        }
        BoardCommand::Add {
            name,
            path,
            owner,
            repo,
        } => {
            let location = match (owner, repo) {
                (Some(owner), Some(repo)) => RemoteFileLocation::new(owner, repo, &path),
                _ => ws.config_location().sibling(&path),
            };
            let board = ws.add_board(&mut config, &name, location).await?;
            println!("Created board {} ({})", board.name, board.id);
        }
        BoardCommand::Rename { board, name } => {
            let id = find_board(&config, &board)?.id.clone();
            let board = ws.update_board(&mut config, &id, Some(&name), None).await?;
            println!("Renamed board to {}", board.name);
        }
        BoardCommand::Delete { board } => {
            let id = find_board(&config, &board)?.id.clone();
            let removed = ws.delete_board(&mut config, &id).await?;
            println!("Removed board {} (data file {} kept)", removed.name, removed.git_config);
        }
        BoardCommand::Show { board } => {
            let board = find_board(&config, &board)?;
            let data = ws.load_board(board).await?;
            let mut resolver = LibraryResolver::new();
            if data.tasks.iter().any(|t| !t.hyper_tags.is_empty()) {
                resolver.sync(ws.gateway(), &config.libraries).await;
            }
            print_board(board, &data, &resolver);
        }
    }
    Ok(())
}

async fn handle_task(cmd: TaskCommand, ws: Workspace<GitHubClient>) -> Result<()> {
    let config = ws.load_config().await?;
    match cmd {
        TaskCommand::Add {
            board,
            column,
            title,
            description,
            priority,
            due,
            tags,
        } => {
            let board = find_board(&config, &board)?;
            let mut data = ws.load_board(board).await?;
            let column = find_column(&data, &column)?;

            let mut hyper_tags = Vec::new();
            if !tags.is_empty() {
                let mut resolver = LibraryResolver::new();
                resolver.sync(ws.gateway(), &config.libraries).await;
                for term in &tags {
                    let item = resolver
                        .find_term(term)
                        .with_context(|| format!("No library item with term '{term}'"))?;
                    hyper_tags.push(TaskHyperTag::from(item));
                }
            }

            let task = data
                .add_task(
                    &column,
                    NewTask {
                        title,
                        description,
                        priority,
                        due_date: due,
                        hyper_tags,
                    },
                )?
                .clone();
            ws.save_board(board, &data).await?;
            println!("Added task {} ({})", task.title, task.id);
        }
        TaskCommand::Edit {
            board,
            task,
            title,
            description,
            priority,
            due,
        } => {
            let board = find_board(&config, &board)?;
            let mut data = ws.load_board(board).await?;
            let task = find_task(&data, &task)?;
            let patch = TaskPatch {
                title,
                description,
                priority,
                due_date: due.map(|d| Some(d).filter(|d| !d.is_empty())),
                hyper_tags: None,
            };
            data.edit_task(&task, patch)?;
            ws.save_board(board, &data).await?;
            println!("Updated task {task}");
        }
        TaskCommand::Move {
            board,
            task,
            column,
        } => {
            let board = find_board(&config, &board)?;
            let mut data = ws.load_board(board).await?;
            let task = find_task(&data, &task)?;
            let column = find_column(&data, &column)?;
            data.move_task(&task, &column)?;
            ws.save_board(board, &data).await?;
            println!("Moved task to {column}");
        }
        TaskCommand::Delete { board, task } => {
            let board = find_board(&config, &board)?;
            let mut data = ws.load_board(board).await?;
            let task = find_task(&data, &task)?;
            let removed = data.delete_task(&task)?;
            ws.save_board(board, &data).await?;
            println!("Deleted task {}", removed.title);
        }
    }
    Ok(())
}

async fn handle_column(cmd: ColumnCommand, ws: Workspace<GitHubClient>) -> Result<()> {
    let config = ws.load_config().await?;
    match cmd {
        ColumnCommand::Add { board, title } => {
            let board = find_board(&config, &board)?;
            let mut data = ws.load_board(board).await?;
            let id = data.add_column(&title).id.clone();
            ws.save_board(board, &data).await?;
            println!("Added column {title} ({id})");
        }
        ColumnCommand::Rename {
            board,
            column,
            title,
        } => {
            let board = find_board(&config, &board)?;
            let mut data = ws.load_board(board).await?;
            let column = find_column(&data, &column)?;
            data.rename_column(&column, &title)?;
            ws.save_board(board, &data).await?;
            println!("Renamed column to {title}");
        }
        ColumnCommand::Move {
            board,
            column,
            position,
        } => {
            let board = find_board(&config, &board)?;
            let mut data = ws.load_board(board).await?;
            let column = find_column(&data, &column)?;
            data.reorder_column(&column, position)?;
            ws.save_board(board, &data).await?;
            println!("Moved column to position {position}");
        }
        ColumnCommand::Delete { board, column } => {
            let board = find_board(&config, &board)?;
            let mut data = ws.load_board(board).await?;
            let column = find_column(&data, &column)?;
            let removed = data.delete_column(&column)?;
            ws.save_board(board, &data).await?;
            println!("Deleted column {}", removed.title);
        }
    }
    Ok(())
}

async fn handle_library(cmd: LibraryCommand, ws: Workspace<GitHubClient>) -> Result<()> {
    let mut config = ws.load_config().await?;
    match cmd {
        LibraryCommand::List => {
            for lib in &config.libraries {
                let fields = lib.fields.as_ref().map(|f| f.join(", ")).unwrap_or_default();
                println!("{}  {}  ({})  [{}]", lib.id, lib.name, lib.git_config, fields);
            }
        }
        LibraryCommand::Upload { file, name, force } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "library.csv".to_string());
            let mut prepared = library::prepare_upload(&file_name, &text, ws.config_location())?;
            if let Some(name) = name {
                prepared = library::rename_upload(prepared, &name, ws.config_location())?;
            }
            match library::upload_library(ws.gateway(), prepared, force).await? {
                UploadOutcome::Uploaded(lib) => {
                    let lib = ws.add_library(&mut config, lib).await?;
                    println!("Uploaded library {} to {}", lib.name, lib.git_config);
                }
                UploadOutcome::AlreadyExists(prepared) => {
                    bail!(
                        "{} already exists. Re-run with --force to overwrite it, or --name <name> to save it as a new file.",
                        prepared.library.git_config
                    );
                }
            }
        }
        LibraryCommand::Add {
            name,
            owner,
            repo,
            path,
        } => {
            let path = path.unwrap_or_else(|| library::default_library_path(&name));
            let location = match (owner, repo) {
                (Some(owner), Some(repo)) => RemoteFileLocation::new(owner, repo, &path),
                _ => ws.config_location().sibling(&path),
            };
            if !ws.gateway().exists(&location).await? {
                println!("Note: {location} does not exist yet; the library stays empty until it does.");
            }
            let lib = ws.add_library(&mut config, library::new_library(&name, location)).await?;
            println!("Added library {} ({})", lib.name, lib.id);
        }
        LibraryCommand::Edit {
            library,
            name,
            owner,
            repo,
            path,
        } => {
            let current = find_library(&config, &library)?;
            let id = current.id.clone();
            let location = if owner.is_some() || path.is_some() {
                let here = &current.git_config;
                let (owner, repo) = match (owner, repo) {
                    (Some(owner), Some(repo)) => (owner, repo),
                    _ => (here.owner.clone(), here.repo.clone()),
                };
                Some(RemoteFileLocation::new(owner, repo, path.as_deref().unwrap_or(&here.path)))
            } else {
                None
            };
            let lib = ws
                .update_library(&mut config, &id, name.as_deref(), location)
                .await?;
            println!("Updated library {} ({})", lib.name, lib.git_config);
        }
        LibraryCommand::Items { library } => {
            let libraries = match &library {
                Some(key) => vec![find_library(&config, key)?.clone()],
                None => config.libraries.clone(),
            };
            let mut resolver = LibraryResolver::new();
            for item in resolver.sync(ws.gateway(), &libraries).await {
                let extra = item
                    .columns
                    .iter()
                    .skip(1)
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join("  ");
                println!("{}  {}", item.term, extra);
            }
        }
        LibraryCommand::Remove { library } => {
            let id = find_library(&config, &library)?.id.clone();
            let removed = ws.remove_library(&mut config, &id).await?;
            println!("Removed library {}", removed.name);
        }
    }
    Ok(())
}
