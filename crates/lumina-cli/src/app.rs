//! Application state and command handling for the REPL.

use anyhow::{Context as _, Result, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use colored::Colorize;
use lumina_core::memory::{MemoryItem, MemoryRepository};
use lumina_core::mode::ChatMode;
use lumina_core::session::{Attachment, Message, MessageRole, Session, SessionRepository};
use lumina_core::user::UserIdentity;
use lumina_infrastructure::UserProfileStore;
use lumina_interaction::{ResponseOrchestrator, TurnInput};
use std::io::Write as IoWrite;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use strum::IntoEnumIterator;

/// What the REPL loop should do after handling one line.
pub enum LoopSignal {
    Continue,
    Quit,
}

/// The live application: the in-progress conversation plus its stores.
pub struct ChatApp {
    orchestrator: ResponseOrchestrator,
    history: Arc<dyn SessionRepository>,
    memory: Arc<dyn MemoryRepository>,
    profile: UserProfileStore,
    messages: Vec<Message>,
    mode: ChatMode,
    user: Option<UserIdentity>,
}

impl ChatApp {
    pub fn new(
        orchestrator: ResponseOrchestrator,
        history: Arc<dyn SessionRepository>,
        memory: Arc<dyn MemoryRepository>,
        profile: UserProfileStore,
    ) -> Result<Self> {
        let user = profile.load()?;
        Ok(Self {
            orchestrator,
            history,
            memory,
            profile,
            messages: Vec::new(),
            mode: ChatMode::default(),
            user,
        })
    }

    /// True until the user has introduced themselves.
    pub fn needs_introduction(&self) -> bool {
        self.user.is_none()
    }

    /// Stores the user's name from the first-run prompt.
    pub fn introduce(&mut self, name: &str) -> Result<()> {
        let identity = UserIdentity::named(name.trim());
        self.profile.save(&identity)?;
        self.user = Some(identity);
        Ok(())
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.name.as_str())
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    /// Dispatches one line of input: a `/` command or a chat message.
    pub async fn handle_line(&mut self, line: &str) -> Result<LoopSignal> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(LoopSignal::Continue);
        }
        if trimmed == "quit" || trimmed == "exit" {
            self.archive_current().await?;
            return Ok(LoopSignal::Quit);
        }
        if let Some(command) = trimmed.strip_prefix('/') {
            self.handle_command(command).await?;
            return Ok(LoopSignal::Continue);
        }
        self.send(trimmed.to_string(), None).await?;
        Ok(LoopSignal::Continue)
    }

    async fn handle_command(&mut self, command: &str) -> Result<()> {
        let (name, rest) = match command.split_once(' ') {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };

        match name {
            "new" => self.cmd_new().await,
            "history" => self.cmd_history().await,
            "resume" => self.cmd_resume(rest).await,
            "mode" => self.cmd_mode(rest),
            "memory" => self.cmd_memory().await,
            "remember" => self.cmd_remember(rest).await,
            "forget" => self.cmd_forget(rest).await,
            "attach" => self.cmd_attach(rest).await,
            "help" => {
                print_help();
                Ok(())
            }
            other => {
                println!("{}", format!("Unknown command: /{other}").bright_black());
                Ok(())
            }
        }
    }

    // ===== Turn driving =====

    /// Runs one full turn: appends the user message, streams the response
    /// into a trailing assistant message, and prints as fragments arrive.
    async fn send(&mut self, text: String, attachment: Option<Attachment>) -> Result<()> {
        let input = TurnInput {
            mode: self.mode,
            history: self.messages.clone(),
            text: text.clone(),
            attachment: attachment.clone(),
            memory: self.memory.list_all().await?,
            user: self.user.clone(),
        };

        self.messages.push(Message::user(text, attachment));
        self.messages.push(Message::assistant_placeholder());

        let mut rx = self.orchestrator.stream(input);
        let mut content = String::new();
        let mut citations = None;

        while let Some(update) = rx.recv().await {
            if let Some(delta) = update.text {
                if is_internal_fragment(&delta) {
                    continue;
                }
                print!("{}", delta.bright_blue());
                std::io::stdout().flush().ok();
                content.push_str(&delta);
            }
            if let Some(list) = update.citations {
                citations = Some(list);
            }
        }
        println!();

        if let Some(ref list) = citations {
            let links: Vec<_> = list.iter().filter_map(|c| c.link()).collect();
            if !links.is_empty() {
                println!("{}", "Sources:".bright_magenta());
                for (uri, title) in links {
                    println!("  {} {}", title.magenta(), uri.bright_black());
                }
            }
        }

        // Fill the placeholder in place.
        if let Some(last) = self.messages.last_mut() {
            last.content = content;
            last.citations = citations;
        }
        Ok(())
    }

    // ===== Commands =====

    /// Archives the current conversation (if it has any content) and
    /// starts a fresh one.
    async fn cmd_new(&mut self) -> Result<()> {
        if self.archive_current().await? {
            println!("{}", "Conversation archived. Fresh start.".bright_green());
        } else {
            println!("{}", "Nothing to archive. Fresh start.".bright_black());
        }
        Ok(())
    }

    async fn archive_current(&mut self) -> Result<bool> {
        let has_content = self.messages.iter().any(|m| {
            m.role == MessageRole::User || !m.content.is_empty()
        });
        if !has_content {
            self.messages.clear();
            return Ok(false);
        }
        let session = Session::archive(std::mem::take(&mut self.messages));
        self.history.save(&session).await?;
        Ok(true)
    }

    async fn cmd_history(&mut self) -> Result<()> {
        let sessions = self.history.list_all().await?;
        if sessions.is_empty() {
            println!("{}", "No archived conversations.".bright_black());
            return Ok(());
        }
        for (index, session) in sessions.iter().enumerate() {
            println!(
                "{} {} {}",
                format!("{:>3}.", index + 1).bright_black(),
                session.title.bright_cyan(),
                format!("({} messages)", session.messages.len()).bright_black(),
            );
        }
        println!(
            "{}",
            "Use /resume <number> to continue a conversation.".bright_black()
        );
        Ok(())
    }

    /// Resumes an archived conversation, taking it out of the archive. The
    /// current conversation is archived first so nothing is lost.
    async fn cmd_resume(&mut self, arg: &str) -> Result<()> {
        let sessions = self.history.list_all().await?;
        let session = resolve_session(&sessions, arg)
            .ok_or_else(|| anyhow!("No archived conversation matches '{arg}'"))?
            .clone();

        self.archive_current().await?;
        self.history.delete(&session.id).await?;
        println!(
            "{}",
            format!("Resumed: {}", session.title).bright_green()
        );
        for message in &session.messages {
            match message.role {
                MessageRole::User => println!("{}", format!("> {}", message.content).green()),
                MessageRole::Assistant => {
                    for line in message.content.lines() {
                        println!("{}", line.bright_blue());
                    }
                }
            }
        }
        self.messages = session.messages;
        Ok(())
    }

    fn cmd_mode(&mut self, arg: &str) -> Result<()> {
        if arg.is_empty() {
            println!("{}", format!("Current mode: {}", self.mode.label()).bright_cyan());
            for mode in ChatMode::iter() {
                println!(
                    "  {} {}",
                    format!("{mode}").bright_cyan(),
                    format!("- {}", mode.label()).bright_black()
                );
            }
            return Ok(());
        }
        match ChatMode::from_str(arg) {
            Ok(mode) => {
                self.mode = mode;
                println!("{}", format!("Mode set: {}", mode.label()).bright_green());
            }
            Err(_) => {
                println!("{}", format!("Unknown mode: {arg}").yellow());
            }
        }
        Ok(())
    }

    async fn cmd_memory(&mut self) -> Result<()> {
        let items = self.memory.list_all().await?;
        if items.is_empty() {
            println!("{}", "Nothing remembered yet. Use /remember <fact>.".bright_black());
            return Ok(());
        }
        for (index, item) in items.iter().enumerate() {
            println!(
                "{} {} {}",
                format!("{:>3}.", index + 1).bright_black(),
                item.fact.bright_cyan(),
                format!("[{}]", item.category).bright_black(),
            );
        }
        Ok(())
    }

    async fn cmd_remember(&mut self, arg: &str) -> Result<()> {
        if arg.is_empty() {
            println!("{}", "Usage: /remember <fact>".bright_black());
            return Ok(());
        }
        self.memory.add(&MemoryItem::new(arg, "general")).await?;
        println!("{}", "Remembered.".bright_green());
        Ok(())
    }

    async fn cmd_forget(&mut self, arg: &str) -> Result<()> {
        let items = self.memory.list_all().await?;
        let item = arg
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| items.get(i))
            .or_else(|| items.iter().find(|i| i.id == arg))
            .ok_or_else(|| anyhow!("No memory item matches '{arg}'"))?;
        let id = item.id.clone();
        let fact = item.fact.clone();
        self.memory.delete(&id).await?;
        println!("{}", format!("Forgot: {fact}").bright_green());
        Ok(())
    }

    /// `/attach <path> <prompt...>`: sends a message with an inline file.
    async fn cmd_attach(&mut self, arg: &str) -> Result<()> {
        let Some((path, prompt)) = arg.split_once(' ') else {
            println!("{}", "Usage: /attach <path> <prompt>".bright_black());
            return Ok(());
        };
        let prompt = prompt.trim();
        if prompt.is_empty() {
            println!("{}", "Usage: /attach <path> <prompt>".bright_black());
            return Ok(());
        }
        let attachment = load_attachment(Path::new(path))
            .with_context(|| format!("Failed to read attachment '{path}'"))?;
        self.send(prompt.to_string(), Some(attachment)).await
    }
}

/// Reads and encodes a file as an inline attachment.
fn load_attachment(path: &Path) -> Result<Attachment> {
    let bytes = std::fs::read(path)?;
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();
    Ok(Attachment {
        data: BASE64.encode(bytes),
        mime_type,
    })
}

/// Matches a session by 1-based list position or by ID.
fn resolve_session<'a>(sessions: &'a [Session], arg: &str) -> Option<&'a Session> {
    arg.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| sessions.get(i))
        .or_else(|| sessions.iter().find(|s| s.id == arg))
}

/// Detects leaked tool-protocol fragments that should never reach the
/// transcript. Deliberately blunt: dropping a rare legitimate delta is
/// better than rendering protocol noise.
fn is_internal_fragment(text: &str) -> bool {
    let t = text.to_lowercase();
    t.contains("action_input")
        || t.contains("tool")
        || t.contains("function_call")
        || t.contains("arguments")
}

fn print_help() {
    let commands = [
        ("/new", "archive the current conversation and start fresh"),
        ("/history", "list archived conversations"),
        ("/resume <n>", "continue an archived conversation"),
        ("/mode [name]", "show or switch the chat mode"),
        ("/memory", "list remembered facts"),
        ("/remember <fact>", "remember a fact"),
        ("/forget <n>", "forget a fact"),
        ("/attach <path> <prompt>", "send a message with a file"),
        ("quit", "archive and exit"),
    ];
    for (command, description) in commands {
        println!("  {} {}", command.bright_cyan(), description.bright_black());
    }
}
