mod app;

use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rustyline::Editor;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use tracing_subscriber::EnvFilter;

use app::{ChatApp, LoopSignal};
use lumina_core::config::load_secret_config_from;
use lumina_infrastructure::{
    JsonHistoryRepository, JsonMemoryRepository, LuminaPaths, UserProfileStore,
};
use lumina_interaction::{GeminiClient, ResponseOrchestrator};

const COMMANDS: &[&str] = &[
    "/new", "/history", "/resume", "/mode", "/memory", "/remember", "/forget", "/attach", "/help",
];

/// Rustyline helper: completion, highlighting, and hints for `/` commands.
#[derive(Clone)]
struct CliHelper;

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = COMMANDS
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.to_string(),
                    replacement: cmd.to_string(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
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

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            COMMANDS
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // ===== Backend Initialization =====
    let secret_path = LuminaPaths::ensure_secret_file()?;
    let config = load_secret_config_from(&secret_path)?;
    let has_key = config
        .gemini
        .as_ref()
        .is_some_and(|g| !g.api_key.trim().is_empty());
    if !has_key {
        println!(
            "{}",
            format!(
                "No API key configured. Add your Gemini key to {} and run again.",
                secret_path.display()
            )
            .yellow()
        );
        return Ok(());
    }

    let backend = GeminiClient::try_from_config(&config)?;
    let orchestrator = ResponseOrchestrator::new(Arc::new(backend));

    let history = Arc::new(JsonHistoryRepository::new(LuminaPaths::history_file()?));
    let memory = Arc::new(JsonMemoryRepository::new(LuminaPaths::memory_file()?));
    let profile = UserProfileStore::new(LuminaPaths::profile_file()?);

    let mut app = ChatApp::new(orchestrator, history, memory, profile)?;

    // ===== REPL Setup =====
    let mut rl: Editor<CliHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(CliHelper));

    println!("{}", "=== LUMINA ===".bright_magenta().bold());

    if app.needs_introduction() {
        println!("{}", "Welcome. What should I call you?".bright_cyan());
        if let Ok(name) = rl.readline("name> ") {
            if !name.trim().is_empty() {
                app.introduce(&name)?;
            }
        }
    }
    match app.user_name() {
        Some(name) => println!("{}", format!("Hello, {name}.").bright_cyan()),
        None => println!("{}", "Hello.".bright_cyan()),
    }
    println!(
        "{}",
        "Type '/help' for commands, or 'quit' to exit.".bright_black()
    );
    println!();

    // ===== Main REPL Loop =====
    loop {
        let readline = rl.readline(&format!("[{}]> ", app.mode()));

        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match app.handle_line(trimmed).await {
                    Ok(LoopSignal::Continue) => {}
                    Ok(LoopSignal::Quit) => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    Err(err) => {
                        eprintln!("{}", format!("Error: {err:#}").red());
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                let _ = app.handle_line("quit").await;
                println!("{}", "Goodbye!".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        }
    }

    Ok(())
}
