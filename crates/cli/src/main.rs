//! Command-line front end for generating slide-deck notes.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use deck_notes_client::{ApiClient, ClientConfig, NotesBackend, SessionStore, Workspace};
use deck_notes_core::{GenerationEvent, LoadedDeck, ProgressReporter, Slide};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

/// Upload slide decks and generate expanded study notes for each slide.
#[derive(Parser, Debug)]
#[command(name = "deck-notes")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend base URL
    #[arg(long, global = true, env = "DECK_NOTES_URL")]
    url: Option<String>,

    /// Session file (default: <config dir>/deck-notes/session.json)
    #[arg(long, global = true, env = "DECK_NOTES_SESSION")]
    session: Option<PathBuf>,

    /// Config file (default: <config dir>/deck-notes/config.toml)
    #[arg(long, global = true, env = "DECK_NOTES_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and remember the session
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "DECK_NOTES_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,

        /// Repeat the password
        #[arg(long)]
        confirm: String,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Check that the backend is reachable
    Health,

    /// Upload a .pptx deck from disk or by URL
    Upload {
        /// Deck file (.pptx)
        #[arg(required_unless_present = "from_url", conflicts_with = "from_url")]
        file: Option<PathBuf>,

        /// Let the backend download the deck from this URL
        #[arg(long)]
        from_url: Option<String>,

        /// Generate notes for every slide after uploading
        #[arg(long)]
        all: bool,

        /// Output file for generated notes (default: <deck id>.md)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the slides of an uploaded deck
    Slides {
        #[arg(short, long)]
        deck: String,
    },

    /// Generate notes for one slide
    Expand {
        #[arg(short, long)]
        deck: String,

        /// Slide index (1-based)
        #[arg(short, long)]
        slide: u32,

        /// Write the note to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate notes for every slide; Ctrl-C stops the run
    ExpandAll {
        #[arg(short, long)]
        deck: String,

        /// Output file (default: <deck id>.md)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print notes to stdout instead of writing a file
        #[arg(short, long)]
        print: bool,
    },

    /// Search a deck by keyword
    Search {
        #[arg(short, long)]
        deck: String,

        query: String,

        /// Number of hits to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Generate notes for the best hit
        #[arg(long)]
        expand: bool,
    },
}

/// Everything a command needs to talk to the backend.
struct App {
    client: Arc<ApiClient>,
    workspace: Workspace,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let app = build_app(&args)?;
    run(app, args.command).await
}

/// Resolve configuration from file, environment and flags.
fn build_app(args: &Args) -> Result<App> {
    let mut config = ClientConfig::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(url) = &args.url {
        config = config.with_base_url(url.clone());
    }
    if let Some(path) = &args.session {
        config.session_path = Some(path.clone());
    }
    // Nothing renders the completed state, so there is no reason to linger in it
    config = config.with_idle_reset_delay(Duration::ZERO);
    log::debug!("Using backend {}", config.base_url);

    let session = Arc::new(SessionStore::open(config.session_path()));
    let client = Arc::new(ApiClient::new(config.clone(), session).context("Failed to build HTTP client")?);
    let backend: Arc<dyn NotesBackend> = client.clone();
    let workspace = Workspace::new(backend, &config);
    Ok(App { client, workspace })
}

async fn run(app: App, command: Command) -> Result<()> {
    match command {
        Command::Login { username, password } => {
            let session = app.client.login(&username, &password).await?;
            eprintln!("Logged in as {}", session.username);
        }
        Command::Register {
            username,
            password,
            confirm,
        } => {
            app.client.register(&username, &password, &confirm).await?;
            eprintln!("Registered {}; log in to continue", username.trim());
        }
        Command::Logout => {
            app.client.logout();
            eprintln!("Logged out");
        }
        Command::Whoami => match app.client.session().username() {
            Some(name) => println!("{}", name),
            None => bail!("not logged in"),
        },
        Command::Health => {
            let status = app.client.health().await?;
            println!("{}", status);
        }
        Command::Upload {
            file,
            from_url,
            all,
            output,
        } => {
            require_login(&app)?;
            let loaded = match (file, from_url) {
                (Some(path), _) => app
                    .workspace
                    .upload_file(&path)
                    .await
                    .with_context(|| format!("Failed to upload {}", path.display()))?,
                (None, Some(url)) => app.workspace.upload_url(&url).await?,
                (None, None) => bail!("give a file or --from-url"),
            };
            println!("{}", loaded.id());
            print_slides(&loaded);
            if all {
                generate_all(&app.workspace, loaded.id(), output, false).await?;
            }
        }
        Command::Slides { deck } => {
            require_login(&app)?;
            app.workspace.open(&deck).await?;
            if let Some(loaded) = app.workspace.deck() {
                print_slides(&loaded);
            }
        }
        Command::Expand {
            deck,
            slide,
            output,
        } => {
            require_login(&app)?;
            app.workspace.open(&deck).await?;
            let outcome = app.workspace.generate_one(slide).await?;
            if let Some(error) = &outcome.error {
                log::warn!("Slide {} failed: {}", slide, error);
            }
            let content = format!("{}\n", outcome.note.markdown.trim_end());
            match output {
                Some(path) => write_output(&path, &content)?,
                None => print!("{}", content),
            }
        }
        Command::ExpandAll {
            deck,
            output,
            print,
        } => {
            require_login(&app)?;
            app.workspace.open(&deck).await?;
            generate_all(&app.workspace, &deck, output, print).await?;
        }
        Command::Search {
            deck,
            query,
            top_k,
            expand,
        } => {
            require_login(&app)?;
            app.workspace.open(&deck).await?;
            let hits = app.workspace.search(&query, top_k).await?;
            if hits.is_empty() {
                eprintln!("No matches");
                return Ok(());
            }
            for hit in &hits {
                let score = hit.score.map(|s| format!(" ({:.2})", s)).unwrap_or_default();
                println!("{:>4}  {}{}", hit.slide_index, hit.title, score);
                if !hit.snippet.is_empty() {
                    println!("      {}", hit.snippet);
                }
            }
            if expand {
                let best = hits[0].slide_index;
                let outcome = app.workspace.generate_one(best).await?;
                println!();
                println!("{}", outcome.note.markdown.trim_end());
            }
        }
    }

    Ok(())
}

fn require_login(app: &App) -> Result<()> {
    if app.client.session().token().is_none() {
        bail!("not logged in; run `deck-notes login` first");
    }
    Ok(())
}

/// Bullets shown per slide in listings.
const LISTED_BULLETS: usize = 3;

fn print_slides(deck: &LoadedDeck) {
    for slide in deck.slides_in_order() {
        println!("{}", format_slide(slide));
    }
}

/// Index and title, then the first few bullets on an indented line.
fn format_slide(slide: &Slide) -> String {
    let summary = slide.bullet_summary(LISTED_BULLETS);
    let summary = if summary.is_empty() {
        "(none)"
    } else {
        summary.as_str()
    };
    format!("{:>4}  {}\n      {}", slide.index, slide.title, summary)
}

/// Run a full-deck generation, reporting progress on stderr, and write the
/// resulting notes.
async fn generate_all(
    workspace: &Workspace,
    deck_id: &str,
    output: Option<PathBuf>,
    print: bool,
) -> Result<()> {
    let mut events = workspace.subscribe();
    let mut reporter = ProgressReporter::new();
    let token = workspace.batch_token();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;
    let mut listening = true;

    let run = workspace.generate_all();
    tokio::pin!(run);

    let outcome = loop {
        tokio::select! {
            outcome = &mut run => break outcome?,
            event = events.recv(), if listening => match event {
                Ok(event) => report(&mut reporter, &event),
                Err(RecvError::Lagged(skipped)) => log::debug!("Skipped {} progress events", skipped),
                Err(RecvError::Closed) => listening = false,
            },
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                eprintln!("Cancelling…");
                token.cancel();
            }
        }
    };
    drain(&mut events, &mut reporter);

    if outcome.cancelled {
        eprintln!(
            "Cancelled after {} of {} slides",
            outcome.processed(),
            outcome.total
        );
    } else if outcome.failed > 0 {
        eprintln!("{} of {} slides failed", outcome.failed, outcome.total);
    }

    let markdown = workspace.to_markdown();
    if print {
        print!("{}", markdown);
        return Ok(());
    }
    let output_path = get_output_path(deck_id, output.as_ref())?;
    write_output(&output_path, &markdown)?;
    eprintln!("Written to: {}", output_path.display());
    Ok(())
}

fn drain(events: &mut broadcast::Receiver<GenerationEvent>, reporter: &mut ProgressReporter) {
    while let Ok(event) = events.try_recv() {
        report(reporter, &event);
    }
}

fn report(reporter: &mut ProgressReporter, event: &GenerationEvent) {
    reporter.apply(event);
    match event {
        GenerationEvent::NoteWritten { index, failed: true } => {
            eprintln!("  slide {} failed", index);
        }
        GenerationEvent::NoteWritten { .. } | GenerationEvent::Idle => {}
        _ => {
            let progress = reporter.progress();
            match (progress.visible, progress.percent) {
                (false, _) => {}
                (true, Some(percent)) => eprintln!("[{:>3.0}%] {}", percent, progress.message),
                (true, None) => eprintln!("{}", progress.message),
            }
        }
    }
}

/// Determine where generated notes go.
fn get_output_path(deck_id: &str, output: Option<&PathBuf>) -> Result<PathBuf> {
    let output_filename = format!("{}.md", sanitize_file_stem(deck_id));

    let output_path = match output {
        Some(path) if path.is_dir() => path.join(output_filename),
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
            path.clone()
        }
        None => PathBuf::from(output_filename),
    };

    Ok(output_path)
}

/// Keep a deck id usable as a file name.
fn sanitize_file_stem(deck_id: &str) -> String {
    let stem: String = deck_id
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "notes".to_string()
    } else {
        stem
    }
}

/// Write output to a file.
fn write_output(path: &Path, content: &str) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}
