use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use notekeeper::api::{self, SecurityConfig};
use notekeeper::config::{self, ClientConfig};
use notekeeper::models::{add_tag, relative_date, remove_tag, NoteInput, UpdateNoteInput};
use notekeeper::store::{Level, Notification, NotesStore};
use notekeeper::{db, NotesError};

#[derive(Parser)]
#[command(name = "notekeeper")]
#[command(about = "Personal notes with tags, pins, search and optional passwords")]
struct Cli {
    /// Directory of the local notes file
    #[arg(long, global = true, env = "NOTEKEEPER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Base URL of a notekeeper server
    #[arg(long, global = true, env = "NOTEKEEPER_URL")]
    url: Option<String>,

    /// Bearer token; when set, notes are stored on the server
    #[arg(long, global = true, env = "NOTEKEEPER_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the notes server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
    },
    #[command(flatten)]
    Notes(NotesCommand),
}

/// Commands that work on the notes of the configured backend.
#[derive(Subcommand)]
enum NotesCommand {
    /// List notes, pinned first
    List {
        /// Only show notes whose title, content or tags contain this text
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Print one note
    Show {
        id: Uuid,

        /// Password of a protected note
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Create a note
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short, long, default_value = "")]
        content: String,

        /// Tag to attach (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        #[arg(long)]
        pin: bool,

        /// Protect the note with a password
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Change a note; omitted fields stay as they are
    Edit {
        id: Uuid,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        content: Option<String>,

        /// Tag to add (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Tag to remove (repeatable)
        #[arg(long = "untag")]
        untags: Vec<String>,

        /// Drop all existing tags first
        #[arg(long)]
        clear_tags: bool,

        /// New password; an empty string removes protection
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Delete a note
    Delete { id: Uuid },
    /// Pin or unpin a note
    Pin { id: Uuid },
}

/// Initialize tracing. Client commands log to stderr so stdout stays the listing.
fn init_tracing(serving: bool) {
    let default = if serving {
        "notekeeper=info,tower_http=debug"
    } else {
        "notekeeper=warn"
    };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
    );

    if serving {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let command = match cli.command {
        Some(Commands::Serve { port, db }) => {
            init_tracing(true);
            serve(port, db).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Some(Commands::Notes(command)) => command,
        None => NotesCommand::List { query: None },
    };
    init_tracing(false);

    let mut config = ClientConfig::new(cli.data_dir.unwrap_or_else(config::default_data_dir));
    if let Some(url) = cli.url {
        config.url = url;
    }
    config.token = cli.token;

    let mut store = NotesStore::open(&config).await?;
    let outcome = run(&mut store, command).await;
    print_notifications(store.take_notifications());

    Ok(match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    })
}

async fn serve(port: u16, db_path: Option<PathBuf>) -> anyhow::Result<()> {
    tracing::info!("Starting notekeeper server on port {}", port);

    let db = db::Database::open(db_path.unwrap_or_else(config::default_db_path))?;
    db.migrate()?;

    let app = api::create_router(db, SecurityConfig::from_env());

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("notekeeper server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn run(store: &mut NotesStore, command: NotesCommand) -> notekeeper::Result<()> {
    match command {
        NotesCommand::List { query } => {
            if let Some(query) = query {
                store.set_search_query(query);
            }
            print_list(store);
        }
        NotesCommand::Show { id, password } => {
            if let Some(password) = password {
                store.unlock(id, &password).await?;
            }
            let note = store.get(id).ok_or(NotesError::NotFound(id))?.clone();
            match store.content(id) {
                Ok(content) => {
                    println!("{}", display_title(&note.title));
                    if !note.tags.is_empty() {
                        println!("tags: {}", note.tags.join(", "));
                    }
                    println!();
                    println!("{}", content);
                }
                Err(e @ NotesError::Locked(_)) => {
                    eprintln!("{} (pass --password to unlock)", e.user_message());
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
        }
        NotesCommand::Create {
            title,
            content,
            tags,
            pin,
            password,
        } => {
            let mut input = NoteInput::new(title, content);
            for tag in &tags {
                input.add_tag(tag);
            }
            input.is_pinned = pin;
            input.password = password;
            let note = store.create(input).await?;
            println!("{}", note.id);
        }
        NotesCommand::Edit {
            id,
            title,
            content,
            tags,
            untags,
            clear_tags,
            password,
        } => {
            let tags = if clear_tags || !tags.is_empty() || !untags.is_empty() {
                let mut merged = match store.get(id) {
                    Some(note) if !clear_tags => note.tags.clone(),
                    _ => Vec::new(),
                };
                for tag in &untags {
                    remove_tag(&mut merged, tag);
                }
                for tag in &tags {
                    add_tag(&mut merged, tag);
                }
                Some(merged)
            } else {
                None
            };

            let input = UpdateNoteInput {
                title,
                content,
                tags,
                is_pinned: None,
                password,
            };
            if input.is_empty() {
                eprintln!("Nothing to change. Pass --title, --content, --tag, --untag, --clear-tags or --password.");
                return Err(NotesError::Validation("Nothing to change".to_string()));
            }
            store.update(id, input).await?;
        }
        NotesCommand::Delete { id } => store.delete(id).await?,
        NotesCommand::Pin { id } => {
            store.toggle_pin(id).await?;
        }
    }
    Ok(())
}

fn display_title(title: &str) -> &str {
    if title.trim().is_empty() {
        notekeeper::models::UNTITLED
    } else {
        title
    }
}

fn print_list(store: &NotesStore) {
    let summaries = store.summaries();
    let query = store.search_query().trim();

    if summaries.is_empty() {
        if query.is_empty() {
            println!("No notes yet. Create your first note with `notekeeper create --title ...`.");
        } else {
            println!("No notes match your search for \"{}\".", query);
        }
        return;
    }

    let count = summaries.len();
    println!("{} note{}", count, if count == 1 { "" } else { "s" });

    let now = chrono::Utc::now();
    for s in summaries {
        let pin = if s.is_pinned { "* " } else { "" };
        let lock = if s.is_locked { " [locked]" } else { "" };
        println!();
        println!("{}{}{}  ({})", pin, s.title, lock, s.id);
        if !s.preview.is_empty() {
            println!("  {}", s.preview);
        }

        let mut meta = Vec::new();
        if !s.tags.is_empty() {
            let mut shown = s.tags.iter().take(3).cloned().collect::<Vec<_>>().join(", ");
            if s.tags.len() > 3 {
                shown.push_str(&format!(" +{} more", s.tags.len() - 3));
            }
            meta.push(shown);
        }
        if !s.is_locked {
            meta.push(format!("{} characters", s.char_count));
        }
        meta.push(relative_date(s.updated_at, now));
        println!("  {}", meta.join(" | "));
    }
}

fn print_notifications(notifications: Vec<Notification>) {
    for n in notifications {
        match n.level {
            Level::Info => println!("{}: {}", n.title, n.description),
            Level::Error => eprintln!("{}: {}", n.title, n.description),
        }
    }
}
