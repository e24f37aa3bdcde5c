//! sqlchat — terminal chat front end for a natural-language-to-SQL query service
//!
//! Ask questions about the database in plain language; each answer comes back
//! as the generated SQL, an explanation, and the result table.
//!
//! # Subcommands
//! - `chat`                     — interactive session (default)
//! - `ask <question> [--json]`  — one question, print the answer and exit
//! - `status`                   — show query service health

mod paint;

use std::io::{self, Write};

use clap::{Parser, Subcommand};
use sqlchat_core::render::render_entry;
use sqlchat_core::{
    Conversation, HttpTransport, RejectReason, SqlChatConfig, SqlChatError, SubmitOutcome,
    TypingIndicator,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing_subscriber::{fmt, EnvFilter};

use crate::paint::Painter;

const DEFAULT_CONFIG: &str = "sqlchat.toml";
const INPUT_HINT: &str =
    "Press Enter to send, end a line with \\ to continue it, /history to repaint, /quit to leave.";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "sqlchat",
    version,
    about = "Ask questions about your data in natural language"
)]
struct Cli {
    /// Config file (TOML); missing file means defaults
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: String,

    /// Query service URL (overrides the config file)
    #[arg(long, env = "SQLCHAT_SERVER")]
    server: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive chat session
    Chat,

    /// Ask a single question and print the answer
    Ask {
        /// Question in natural language
        question: String,

        /// Print the new conversation entries as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Show query service status
    Status,
}

fn load_config(cli: &Cli) -> Result<SqlChatConfig, SqlChatError> {
    let mut config = SqlChatConfig::load(&cli.config)?;
    if let Some(server) = &cli.server {
        config.service.base_url = server.clone();
    }
    Ok(config)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

// ============================================================================
// Session driving
// ============================================================================

/// Paint entries the terminal has not shown yet; returns the new count.
fn paint_new(conversation: &Conversation, seen: usize, painter: &Painter) -> io::Result<usize> {
    let fresh = conversation.entries_since(seen);
    let mut stdout = io::stdout().lock();
    for entry in &fresh {
        painter.paint_entry(&mut stdout, &render_entry(entry))?;
    }
    stdout.flush()?;
    Ok(seen + fresh.len())
}

/// Run `submit`, painting the user's entry right away and animating the
/// typing indicator until the answer settles.
async fn submit_with_indicator(
    conversation: &Conversation,
    question: &str,
    indicator: &mut TypingIndicator,
    painter: &Painter,
    seen: &mut usize,
) -> io::Result<SubmitOutcome> {
    let submit = conversation.submit(question);
    tokio::pin!(submit);

    let mut ticker = tokio::time::interval(indicator.frame_interval());
    indicator.reset();

    let outcome = loop {
        tokio::select! {
            outcome = &mut submit => break outcome,
            _ = ticker.tick() => {
                painter.clear_typing(&mut io::stdout())?;
                *seen = paint_new(conversation, *seen, painter)?;
                if conversation.is_awaiting_response() {
                    painter.paint_typing(&mut io::stdout(), &indicator.next_frame())?;
                }
            }
        }
    };

    painter.clear_typing(&mut io::stdout())?;
    *seen = paint_new(conversation, *seen, painter)?;
    Ok(outcome)
}

/// Read one question. A line ending in `\` continues onto the next line.
/// Returns `None` at end of input.
async fn read_question<R>(lines: &mut Lines<R>) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut question = String::new();
    loop {
        let Some(line) = lines.next_line().await? else {
            return Ok((!question.is_empty()).then_some(question));
        };
        match line.strip_suffix('\\') {
            Some(head) => {
                question.push_str(head);
                question.push('\n');
            }
            None => {
                question.push_str(&line);
                return Ok(Some(question));
            }
        }
    }
}

fn prompt() -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "> ")?;
    stdout.flush()
}

// ============================================================================
// Commands
// ============================================================================

async fn run_chat(config: &SqlChatConfig) -> anyhow::Result<()> {
    let conversation = Conversation::over_http(config)?;
    let painter = Painter::for_stdout();
    let mut indicator = TypingIndicator::from_config(&config.chat);

    tracing::info!(
        session_id = %conversation.session_id(),
        server = %config.service.base_url,
        "Chat session started"
    );

    let mut seen = paint_new(&conversation, 0, &painter)?;
    println!("{INPUT_HINT}\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let Some(question) = read_question(&mut lines).await? else {
            println!();
            break;
        };

        match question.trim() {
            "/quit" | "/exit" => break,
            "/history" => {
                seen = paint_new(&conversation, 0, &painter)?;
                continue;
            }
            _ => {}
        }

        conversation.set_pending_input(question.as_str());
        submit_with_indicator(
            &conversation,
            &question,
            &mut indicator,
            &painter,
            &mut seen,
        )
        .await?;
    }

    tracing::info!(session_id = %conversation.session_id(), "Chat session ended");
    Ok(())
}

async fn run_ask(config: &SqlChatConfig, question: &str, json: bool) -> anyhow::Result<()> {
    let conversation = Conversation::over_http(config)?;
    let seen = conversation.len();

    let outcome = conversation.submit(question).await;
    if outcome == SubmitOutcome::Rejected(RejectReason::EmptyInput) {
        anyhow::bail!("question is empty");
    }

    let fresh = conversation.entries_since(seen);
    if json {
        println!("{}", serde_json::to_string_pretty(&fresh)?);
    } else {
        let painter = Painter::for_stdout();
        let mut stdout = io::stdout().lock();
        for entry in &fresh {
            painter.paint_entry(&mut stdout, &render_entry(entry))?;
        }
    }

    if let SubmitOutcome::Failed { .. } = outcome {
        anyhow::bail!("query service request failed");
    }
    Ok(())
}

async fn run_status(config: &SqlChatConfig) -> anyhow::Result<()> {
    let transport = HttpTransport::new(&config.service)?;
    let health = transport.health().await.map_err(|e| {
        anyhow::anyhow!("cannot reach {}: {}", transport.base_url(), e)
    })?;

    let field = |key: &str| match &health[key] {
        serde_json::Value::Null => "?".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    println!("Query service: {}", field("status"));
    println!("Service:       {}", field("service"));
    println!("Database:      {}", field("database"));
    println!("Students:      {}", field("student_count"));
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("sqlchat: failed to load config from {}: {}", cli.config, e);
            std::process::exit(1);
        }
    };

    init_logging(&config.log.level);

    let result = match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(&config).await,
        Commands::Ask { question, json } => run_ask(&config, &question, json).await,
        Commands::Status => run_status(&config).await,
    };

    if let Err(e) = result {
        eprintln!("sqlchat: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
