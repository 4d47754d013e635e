use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::Editor;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use threadline_app::{
    ConversationCoordinator, MessageExchange, RegistryService, UsernameBootstrap, ViewEvent,
    ViewState,
};
use threadline_backend::{HttpChatBackend, SseChangeFeed};
use threadline_core::backend::ChatBackend;
use threadline_core::config::RootConfig;
use threadline_core::conversation::Conversation;
use threadline_core::feed::ChangeFeed;
use threadline_core::identity::{Identity, IdentityProvider, StaticIdentityProvider};
use threadline_core::message::MessageRole;

const COMMANDS: &[&str] = &[
    "/threads", "/new", "/open", "/delete", "/models", "/model", "/export", "/quit",
];

/// Threadline terminal surface.
#[derive(Parser)]
#[command(name = "threadline")]
#[command(about = "Threadline - chat with the conversation controller from your terminal", long_about = None)]
struct Cli {
    /// Backend base URL (overrides the config file)
    #[arg(long)]
    base_url: Option<String>,

    /// Identity id to act as
    #[arg(long, default_value = "local-user")]
    user: String,

    /// Display name, used by the profile bootstrap
    #[arg(long)]
    name: Option<String>,

    /// Alternate config file
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Readline helper providing completion, highlighting, and hints for slash
/// commands.
#[derive(Clone)]
struct ReplHelper {
    commands: Vec<String>,
}

impl ReplHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Helper for ReplHelper {}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for ReplHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for ReplHelper {}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("threadline=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => RootConfig::load_from(path)?,
        None => RootConfig::load()?,
    };
    if let Some(base_url) = cli.base_url {
        config.backend.base_url = base_url;
    }

    // ===== Identity =====
    let provider = StaticIdentityProvider::new(Identity {
        id: cli.user,
        email: None,
        display_name: cli.name,
        avatar_url: None,
    });
    let identity = provider
        .current()
        .context("no signed-in identity available")?;

    // ===== Backend wiring =====
    let backend = Arc::new(HttpChatBackend::new(config.backend.base_url.as_str()));
    let feed = SseChangeFeed::new(config.subscribe_url());

    // One-shot profile bootstrap; failures never block the session.
    let bootstrap = UsernameBootstrap::with_config(backend.clone(), &config.profile);
    match bootstrap.run(&identity).await {
        Ok(Some(username)) => println!("{}", format!("signed in as @{username}").dimmed()),
        Ok(None) => {}
        Err(err) => warn!(error = %err, "profile bootstrap failed"),
    }

    // ===== Conversation registry =====
    let registry = Arc::new(RegistryService::new());
    match backend.list_conversations(&identity.id).await {
        Ok(rows) => registry.seed(rows).await,
        Err(err) => warn!(error = %err, "could not load the conversation list"),
    }
    match feed.subscribe(&identity.id).await {
        Ok(subscription) => registry.attach(subscription),
        Err(err) => warn!(error = %err, "change feed unavailable; the thread list may go stale"),
    }

    // ===== Controllers =====
    let view = Arc::new(ViewState::new());
    let coordinator = Arc::new(
        ConversationCoordinator::new(
            backend.clone(),
            registry.clone(),
            view.clone(),
            identity.clone(),
        )
        .with_default_model(config.chat.default_model.clone()),
    );

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let exchange = Arc::new(MessageExchange::new(
        backend.clone(),
        coordinator.clone(),
        view.clone(),
        identity.clone(),
        events_tx,
    ));

    if let Err(err) = exchange
        .load_models(config.chat.default_model.as_deref())
        .await
    {
        warn!(error = %err, "model catalog unavailable");
    }

    // Render view events as they arrive: replies in cyan, notices in yellow.
    let printer = exchange.clone();
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                ViewEvent::MessagesAppended { .. } => {}
                ViewEvent::MessageResolved { message_id, .. } => {
                    let messages = printer.messages().await;
                    if let Some(message) = messages.iter().find(|m| m.id == message_id) {
                        println!("{}", message.content.bright_cyan());
                    }
                }
                ViewEvent::Notice(text) => println!("{}", text.yellow()),
            }
        }
    });

    println!("{}", "Threadline".bright_cyan().bold());
    println!(
        "{}",
        "Type a message, or /threads /new /open /delete /models /model /export /quit".dimmed()
    );

    let mut rl: Editor<ReplHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(ReplHelper::new()));

    loop {
        let prompt = match view.binding() {
            Some(_) => "you> ".to_string(),
            None => "new> ".to_string(),
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                if let Some(command) = line.strip_prefix('/') {
                    if !handle_command(command, &registry, &coordinator, &exchange, &config).await {
                        break;
                    }
                } else {
                    if exchange.is_streaming() {
                        println!("{}", "still waiting for the previous reply".dimmed());
                        continue;
                    }
                    if let Err(err) = exchange.send_message(&line).await {
                        if !err.is_validation() {
                            println!("{}", format!("send failed: {err}").red());
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", format!("readline error: {err}").red());
                break;
            }
        }
    }

    registry.detach();
    println!("{}", "bye".dimmed());
    Ok(())
}

/// Handles one slash command; returns `false` to quit.
async fn handle_command(
    command: &str,
    registry: &Arc<RegistryService>,
    coordinator: &Arc<ConversationCoordinator>,
    exchange: &Arc<MessageExchange>,
    config: &RootConfig,
) -> bool {
    let (name, arg) = match command.split_once(' ') {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "quit" | "q" => return false,
        "threads" => {
            let threads = registry.snapshot().await;
            if threads.is_empty() {
                println!("{}", "no threads yet".dimmed());
            }
            for (index, thread) in threads.iter().enumerate() {
                let marker = if Some(&thread.id) == exchange.binding().as_ref() {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {} {}", format!("[{index}]").dimmed(), thread.title);
            }
        }
        "new" => match coordinator.create_conversation(arg).await {
            Ok(conversation) => println!("{}", format!("started '{}'", conversation.title).dimmed()),
            Err(err) => println!("{}", format!("create failed: {err}").red()),
        },
        "open" => match pick(registry, arg).await {
            Some(thread) => match exchange.open_conversation(&thread.id).await {
                Ok(()) => {
                    println!("{}", format!("opened '{}'", thread.title).dimmed());
                    for message in exchange.messages().await {
                        if message.role == MessageRole::Assistant {
                            println!("{}", message.content.bright_cyan());
                        } else {
                            println!("{}", message.content);
                        }
                    }
                }
                Err(err) => println!("{}", format!("open failed: {err}").red()),
            },
            None => println!("{}", "usage: /open <thread number>".dimmed()),
        },
        "delete" => match pick(registry, arg).await {
            Some(thread) => match coordinator.delete_conversation(&thread.id).await {
                Ok(()) => {
                    exchange.purge_conversation(&thread.id).await;
                    println!("{}", format!("deleted '{}'", thread.title).dimmed());
                }
                Err(err) => println!("{}", format!("delete failed: {err}").red()),
            },
            None => println!("{}", "usage: /delete <thread number>".dimmed()),
        },
        "models" => match exchange.load_models(None).await {
            Ok(catalog) => {
                let selected = exchange.selected_model();
                for model in catalog {
                    let marker = if Some(&model.id) == selected.as_ref() { "*" } else { " " };
                    let status = if model.available { "" } else { " (unavailable)" };
                    println!("{marker} {} - {}{status}", model.id, model.name);
                }
            }
            Err(err) => println!("{}", format!("models unavailable: {err}").red()),
        },
        "model" => match exchange.select_model(arg).await {
            Ok(()) => println!("{}", format!("model set to {arg}").dimmed()),
            Err(err) => println!("{}", format!("{err}").red()),
        },
        "export" => match exchange.export_transcript().await {
            Ok(text) => {
                let dir = config
                    .chat
                    .export_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("."));
                let name = exchange
                    .binding()
                    .map(|id| format!("threadline-{id}.txt"))
                    .unwrap_or_else(|| "threadline-export.txt".to_string());
                let path = dir.join(name);
                match std::fs::write(&path, text) {
                    Ok(()) => println!("{}", format!("exported to {}", path.display()).dimmed()),
                    Err(err) => println!("{}", format!("export failed: {err}").red()),
                }
            }
            Err(err) => println!("{}", format!("export failed: {err}").red()),
        },
        other => println!("{}", format!("unknown command: /{other}").dimmed()),
    }

    true
}

/// Resolves a `/open` or `/delete` argument to a thread by list index.
async fn pick(registry: &Arc<RegistryService>, arg: &str) -> Option<Conversation> {
    let index: usize = arg.parse().ok()?;
    registry.snapshot().await.into_iter().nth(index)
}
