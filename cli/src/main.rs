mod tui;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use clap::Parser;
use supertodo_core::{
    ActionOutcome, Config, ImageAttachment, RestBackend, SessionFile, TaskId, TodoService,
};
use tabled::settings::Style;
use tabled::{Table, Tabled};

const LOGIN_HINT: &str = "Not signed in. Run `supertodo login <email>` first.";

#[derive(Parser)]
#[command(name = "supertodo")]
#[command(about = "A remote-backed task list", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Create an account (a confirmation mail completes it)
    Signup {
        email: String,
        /// Password; prompted for when not given
        #[arg(long, env = "SUPERTODO_PASSWORD")]
        password: Option<String>,
    },
    /// Sign in and keep the session for later commands
    Login {
        email: String,
        #[arg(long, env = "SUPERTODO_PASSWORD")]
        password: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Add a task (usage: add --image photo.png Buy milk)
    Add {
        /// Attach an image; it is uploaded before the task is created
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// List all tasks
    List,
    /// Replace a task's text
    Edit {
        id: i64,
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Toggle a task between open and completed
    Done { id: i64 },
    /// Toggle a task's important flag
    Star { id: i64 },
    /// Delete a task
    Rm { id: i64 },
    /// Open the Terminal User Interface
    Tui,
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "St")]
    state: String,
    #[tabled(rename = "Flag")]
    important: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Task")]
    text: String,
    #[tabled(rename = "Image")]
    image: String,
}

impl From<&supertodo_core::Task> for TaskRow {
    fn from(task: &supertodo_core::Task) -> Self {
        TaskRow {
            id: task.id.0,
            state: if task.completed { "✔" } else { "☐" }.to_string(),
            important: if task.important { "★" } else { "" }.to_string(),
            created: DateTime::<Local>::from(task.created_at)
                .format("%Y-%m-%d")
                .to_string(),
            text: task.text.clone(),
            image: task.image_url.clone().unwrap_or_default(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let config = Config::load(None)?;
    let backend = RestBackend::new(&config);
    let session_file = SessionFile::new(None)?;
    let mut service = TodoService::new(backend);

    match cli.command {
        Some(Commands::Signup { email, password }) => {
            let password = password_or_prompt(password)?;
            match rt.block_on(service.sign_up(&email, &password)) {
                Ok(()) => println!(
                    "Account created. Check {} for the confirmation mail, then log in.",
                    email
                ),
                Err(err) => println!("Sign-up failed: {}", err),
            }
        }
        Some(Commands::Login { email, password }) => {
            let password = password_or_prompt(password)?;
            match rt.block_on(service.sign_in(&email, &password)) {
                Ok(()) => {
                    if let Some(session) = service.session() {
                        session_file.save(session)?;
                    }
                    println!("Signed in as {} ({} tasks).", email, service.tasks().len());
                }
                Err(err) => println!("Login failed: {}", err),
            }
        }
        Some(Commands::Logout) => {
            rt.block_on(service.restore_session(session_file.load()?));
            rt.block_on(service.sign_out());
            session_file.clear()?;
            println!("Signed out.");
        }
        Some(Commands::Add { image, text }) => {
            rt.block_on(service.restore_session(session_file.load()?));
            let text = text.join(" ");
            let image = match image {
                Some(path) => Some(ImageAttachment::from_file(&path)?),
                None => None,
            };
            if image.is_some() {
                println!("Uploading image...");
            }
            let before = service.tasks().len();
            match rt.block_on(service.add_task(&text, image)) {
                ActionOutcome::NeedsLogin => println!("{}", LOGIN_HINT),
                ActionOutcome::Done => {
                    // On a swallowed store failure the list is unchanged and
                    // there is nothing to report; details go to the log.
                    if service.tasks().len() > before {
                        if let Some(task) = service.tasks().last() {
                            println!("Added: {} (id {})", task.text, task.id);
                        }
                    }
                }
            }
        }
        Some(Commands::List) => {
            rt.block_on(service.restore_session(session_file.load()?));
            if !service.is_signed_in() {
                println!("{}", LOGIN_HINT);
                return Ok(());
            }
            if service.tasks().is_empty() {
                println!("No tasks yet.");
            } else {
                let rows: Vec<TaskRow> = service.tasks().iter().map(TaskRow::from).collect();
                let mut table = Table::new(rows);
                table.with(Style::rounded());
                println!("{}", table);
                let stats = service.stats();
                println!(
                    "{} total / {} completed / {} important",
                    stats.total, stats.completed, stats.important
                );
            }
        }
        Some(Commands::Edit { id, text }) => {
            rt.block_on(service.restore_session(session_file.load()?));
            let text = text.join(" ");
            match rt.block_on(service.edit_text(TaskId(id), &text)) {
                ActionOutcome::NeedsLogin => println!("{}", LOGIN_HINT),
                ActionOutcome::Done => match service.get(TaskId(id)) {
                    Some(task) => println!("Task {}: {}", id, task.text),
                    None => println!("No task with id {}.", id),
                },
            }
        }
        Some(Commands::Done { id }) => {
            rt.block_on(service.restore_session(session_file.load()?));
            match rt.block_on(service.toggle_completed(TaskId(id))) {
                ActionOutcome::NeedsLogin => println!("{}", LOGIN_HINT),
                ActionOutcome::Done => match service.get(TaskId(id)) {
                    Some(task) if task.completed => println!("Completed: {}", task.text),
                    Some(task) => println!("Reopened: {}", task.text),
                    None => println!("No task with id {}.", id),
                },
            }
        }
        Some(Commands::Star { id }) => {
            rt.block_on(service.restore_session(session_file.load()?));
            match rt.block_on(service.toggle_important(TaskId(id))) {
                ActionOutcome::NeedsLogin => println!("{}", LOGIN_HINT),
                ActionOutcome::Done => match service.get(TaskId(id)) {
                    Some(task) if task.important => println!("Flagged: {}", task.text),
                    Some(task) => println!("Unflagged: {}", task.text),
                    None => println!("No task with id {}.", id),
                },
            }
        }
        Some(Commands::Rm { id }) => {
            rt.block_on(service.restore_session(session_file.load()?));
            match rt.block_on(service.delete(TaskId(id))) {
                ActionOutcome::NeedsLogin => println!("{}", LOGIN_HINT),
                ActionOutcome::Done => println!("Deleted task {}.", id),
            }
        }
        Some(Commands::Tui) | None => {
            tui::run(service, session_file, rt.handle().clone())?;
        }
    }
    Ok(())
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    print!("Password: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(anyhow!("empty password"));
    }
    Ok(password)
}
