//! ragchat terminal client.
//!
//! Resolves configuration, binds a chat view to a session, and runs the
//! interactive REPL. Plain input is sent as a chat question; `/` commands
//! manage sessions and documents. Ctrl-C during a send cancels that send
//! and nothing else.

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::match_same_arms)]

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use ragchat::api::ApiClient;
use ragchat::api::types::{EmbedRequest, SessionInfo};
use ragchat::chat::transcript::MessageRole;
use ragchat::chat::{ChatSnapshot, ChatView, SendPhase};
use ragchat::config::{AppConfig, Cli};
use ragchat::error::ChatError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (M-LOG-STRUCTURED)
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env())
        .init();

    // Load .env (if present)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli).context("failed to load configuration")?;

    info!(
        name: "config.loaded",
        base_url = %config.api.base_url,
        streaming = config.chat.streaming,
        "configuration loaded"
    );

    let api = ApiClient::new(&config.api_config()).context("invalid backend configuration")?;
    let view = ChatView::new(api.clone(), config.tuning());

    let mut repl = Repl {
        api,
        view,
        config,
        sessions: Vec::new(),
    };
    repl.start(cli.session).await?;
    repl.run().await
}

struct Repl {
    api: ApiClient,
    view: ChatView,
    config: AppConfig,
    sessions: Vec<SessionInfo>,
}

impl Repl {
    /// Bind the view to the requested session, the most recent one, or a
    /// freshly created one when the backend has none.
    async fn start(&mut self, requested: Option<String>) -> anyhow::Result<()> {
        self.refresh_sessions().await;

        let session_id = match requested {
            Some(id) => id,
            None => match self.sessions.first() {
                Some(session) => session.session_id.clone(),
                None => {
                    let created = self
                        .api
                        .create_session(None)
                        .await
                        .context("could not create a session")?;
                    created.session_id
                }
            },
        };

        self.view
            .open_session(session_id.as_str(), self.config.chat.history_limit)
            .await
            .context("could not open session")?;

        let count = self.view.snapshot().messages.len();
        println!("session {session_id} ({count} messages). /help for commands.");
        Ok(())
    }

    async fn run(&mut self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("you> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break; // EOF
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(command) = line.strip_prefix('/') {
                if !self.dispatch(command).await {
                    break;
                }
            } else {
                self.send(line.to_string()).await;
            }
        }
        Ok(())
    }

    /// Handle one `/command`. Returns `false` when the REPL should exit.
    async fn dispatch(&mut self, command: &str) -> bool {
        let (name, arg) = command
            .split_once(char::is_whitespace)
            .unwrap_or((command, ""));
        let arg = arg.trim();

        match name {
            "quit" | "exit" => return false,
            "help" => print_help(),
            "sessions" => {
                self.refresh_sessions().await;
                let current = self.view.session_id();
                for session in &self.sessions {
                    let marker = if current.as_deref() == Some(session.session_id.as_str()) {
                        '*'
                    } else {
                        ' '
                    };
                    println!(
                        "{marker} {}  {}  ({} messages)",
                        session.session_id, session.title, session.message_count
                    );
                }
            }
            "new" => match self.api.create_session((!arg.is_empty()).then_some(arg)).await {
                Ok(created) => {
                    println!("created session {}", created.session_id);
                    self.open(&created.session_id).await;
                    self.refresh_sessions().await;
                }
                Err(e) => eprintln!("[error] {e}"),
            },
            "open" => {
                if arg.is_empty() {
                    println!("usage: /open <session-id>");
                } else {
                    self.open(arg).await;
                }
            }
            "delete" => {
                if arg.is_empty() {
                    println!("usage: /delete <session-id>");
                } else {
                    match self.api.delete_session(arg).await {
                        Ok(()) => {
                            println!("deleted {arg}");
                            self.refresh_sessions().await;
                        }
                        Err(e) => eprintln!("[error] {e}"),
                    }
                }
            }
            "docs" => match self.api.list_documents().await {
                Ok(list) => {
                    for doc in &list.documents {
                        let marker = if doc.selected { '*' } else { ' ' };
                        println!(
                            "{marker} {}  {}  ({} bytes, {})",
                            doc.id, doc.filename, doc.size, doc.file_type
                        );
                    }
                    println!("{} documents", list.total);
                }
                Err(e) => eprintln!("[error] {e}"),
            },
            "upload" => {
                if arg.is_empty() {
                    println!("usage: /upload <path>");
                } else {
                    match self.api.upload_document(Path::new(arg)).await {
                        Ok(doc) => println!("uploaded {} as {}", doc.filename, doc.id),
                        Err(e) => eprintln!("[error] {e}"),
                    }
                }
            }
            "embed" => {
                if arg.is_empty() {
                    println!("usage: /embed <document-id>");
                } else {
                    match self.api.embed_document(arg, &EmbedRequest::default()).await {
                        Ok(result) => println!(
                            "embedded {}: {} chunks, {} vectors ({})",
                            result.document_id,
                            result.chunks_created,
                            result.vectors_stored,
                            result.status
                        ),
                        Err(e) => eprintln!("[error] {e}"),
                    }
                }
            }
            "health" => match self.api.health().await {
                Ok(health) => println!("{} - {} (v{})", health.status, health.message, health.version),
                Err(e) => eprintln!("[error] {e}"),
            },
            other => println!("unknown command: /{other} (try /help)"),
        }
        true
    }

    async fn open(&mut self, session_id: &str) {
        match self
            .view
            .open_session(session_id, self.config.chat.history_limit)
            .await
        {
            Ok(()) => {
                let count = self.view.snapshot().messages.len();
                println!("session {session_id} ({count} messages)");
            }
            Err(e) => eprintln!("[error] {e}"),
        }
    }

    /// Run one send, rendering the reply as it streams. Ctrl-C cancels the
    /// send; the REPL keeps running either way.
    async fn send(&mut self, text: String) {
        let printer = tokio::spawn(print_reply(self.view.subscribe()));

        let result = {
            let send = async {
                if self.config.chat.streaming {
                    self.view.send_streaming(&text).await
                } else {
                    self.view.send(&text).await
                }
            };
            tokio::pin!(send);
            loop {
                tokio::select! {
                    result = &mut send => break result,
                    _ = tokio::signal::ctrl_c() => self.view.cancel(),
                }
            }
        };
        // Rejections before any I/O publish no transition, so the printer
        // would wait forever; everything else settles back to idle and the
        // printer exits on its own.
        match &result {
            Err(ChatError::Validation(_) | ChatError::Busy) => printer.abort(),
            _ => {
                let _ = printer.await;
            }
        }

        match result {
            // Committed: the session's stored metadata (title, counts) moved.
            Ok(()) => self.refresh_sessions().await,
            Err(ChatError::Cancelled) => println!("[cancelled]"),
            Err(e) => eprintln!("[error] {e}"),
        }
    }

    async fn refresh_sessions(&mut self) {
        match self.api.list_sessions().await {
            Ok(list) => self.sessions = list.sessions,
            Err(e) => tracing::warn!(error = %e, "could not refresh session list"),
        }
    }
}

/// Render one send from published snapshots: the draft's growing suffix as
/// tokens arrive, then the committed reply for single-shot sends that never
/// streamed. Exits when the view settles back to idle.
async fn print_reply(mut updates: watch::Receiver<ChatSnapshot>) {
    let mut printed = 0usize;
    let mut sources_shown = false;

    loop {
        if updates.changed().await.is_err() {
            return;
        }
        let snapshot: ChatSnapshot = updates.borrow_and_update().clone();

        if !sources_shown {
            if let Some(count) = snapshot.sources_count {
                println!("[{count} source chunks]");
                sources_shown = true;
            }
        }

        if let Some(draft) = &snapshot.streaming {
            if draft.content.len() > printed {
                print!("{}", &draft.content[printed..]);
                let _ = std::io::stdout().flush();
                printed = draft.content.len();
            }
        }

        if snapshot.phase == SendPhase::Idle {
            if printed == 0 && snapshot.last_error.is_none() {
                if let Some(last) = snapshot.messages.last() {
                    if last.role == MessageRole::Assistant {
                        print!("{}", last.content);
                    }
                }
            }
            println!();
            return;
        }
    }
}

fn print_help() {
    println!("  <text>           send a chat message (Ctrl-C cancels mid-stream)");
    println!("  /sessions        list chat sessions");
    println!("  /new [title]     create and open a session");
    println!("  /open <id>       switch to a session");
    println!("  /delete <id>     delete a session");
    println!("  /docs            list documents");
    println!("  /upload <path>   upload a document");
    println!("  /embed <doc-id>  chunk and embed a document");
    println!("  /health          backend health check");
    println!("  /quit            exit");
}
