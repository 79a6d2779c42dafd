mod action;
mod app;
mod auth;
mod composer;
mod config;
mod error;
mod event;
mod forge;
mod github;
mod markup;
mod pagination;
mod schedule;
mod thread;
mod timeline;
mod tui;
mod types;
mod ui;

use std::panic;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::action::Action;
use crate::app::App;
use crate::auth::AuthContext;
use crate::config::Config;
use crate::event::Event;
use crate::github::GitHub;
use crate::tui::EventHandler;

/// Read and join a GitHub issue comment thread from the terminal
#[derive(Debug, Parser)]
#[command(name = "natter", version, about)]
struct Cli {
    /// Repository as <owner>/<repo>
    repo: Option<String>,

    /// Issue number
    issue: Option<u64>,

    /// Comments per page (1-100)
    #[arg(long)]
    page_size: Option<u32>,

    /// Ignore every credential source and browse read-only
    #[arg(long)]
    anonymous: bool,

    /// Sign in with the GitHub device flow and store the token, then exit
    #[arg(long)]
    login: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let log_file = dirs::cache_dir()
        .map(|dir| dir.join("natter"))
        .and_then(|dir| {
            std::fs::create_dir_all(&dir).ok()?;
            std::fs::File::create(dir.join("natter.log")).ok()
        });

    // The alternate screen owns stdout/stderr, so log to a file when we can.
    match log_file {
        Some(file) => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init(),
        None => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();

    if cli.login {
        auth::device_login().await?;
        println!("Token saved. Run natter <owner>/<repo> <issue> to join a thread.");
        return Ok(());
    }

    let (Some(slug), Some(number)) = (cli.repo.as_deref(), cli.issue) else {
        return Err("usage: natter <owner>/<repo> <issue>".into());
    };
    let (owner, repo) = config::parse_repo(slug)?;

    let mut config = Config::load();
    if let Some(page_size) = cli.page_size {
        config.thread.page_size = page_size.clamp(1, 100);
    }

    let auth = if cli.anonymous {
        AuthContext::anonymous()
    } else {
        auth::resolve(&config.auth).await
    };
    tracing::info!(owner = %owner, repo = %repo, number, ?auth, "starting");

    let github = GitHub::new(auth, &owner, &repo, config.thread.page_size)?;

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = tui::restore();
        original_hook(panic_info);
    }));

    let result = run(github, owner, repo, number, config).await;

    tui::restore()?;

    result
}

async fn run(
    github: GitHub,
    owner: String,
    repo: String,
    number: u64,
    config: Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut terminal = tui::init()?;

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let mut app = App::new(
        Arc::new(github),
        owner,
        repo,
        number,
        config.thread,
        action_tx.clone(),
    );

    let tick_rate = Duration::from_millis(250);
    let render_rate = Duration::from_millis(16); // ~60fps
    let mut events = EventHandler::new(tick_rate, render_rate);

    loop {
        tokio::select! {
            Some(event) = events.next() => {
                if event.is_quit() {
                    break;
                }

                match event {
                    Event::Render | Event::Resize => {
                        terminal.draw(|frame| ui::render(frame, &app))?;
                    }
                    _ => {
                        let action = app.handle_event(event);
                        if !matches!(action, Action::None) {
                            action_tx.send(action)?;
                        }
                    }
                }
            }
            Some(action) = action_rx.recv() => {
                app.update(action);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
