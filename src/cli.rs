//! Driah CLI - terminal front end for the Driah assistant
//!
//! Usage:
//!   driah                            Start an interactive chat
//!   driah ask "who are you?"         One exchange, no typing delay
//!   driah teach <term> <meaning>     Teach a word
//!   driah words                      List the dictionary
//!   driah history                    Show the conversation
//!   driah delete <id>                Delete one message
//!   driah export --format text       Export the conversation
//!   driah import <file>              Replace the conversation with a JSON snapshot
//!   driah theme --toggle             Switch between light and dark

use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use driah::{
    Assistant, AssistantConfig, AssistantConfigBuilder, DownloadOutcome, Message, Sender,
    StorageKind,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_DOWNLOAD: &str = "driah_chat_history.txt";

#[derive(Parser)]
#[command(name = "driah")]
#[command(about = "Driah AI - a friendly chatbot that learns words from you")]
#[command(version)]
struct Cli {
    /// Path to data directory
    #[arg(short, long, env = "DRIAH_DATA_DIR", default_value = "./driah_data")]
    data_dir: PathBuf,

    /// Keep everything in memory for this run
    #[arg(long)]
    ephemeral: bool,

    /// Reply immediately instead of simulating typing
    #[arg(long)]
    no_delay: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (default)
    Chat,

    /// Send one message and print the reply
    Ask {
        /// Message text
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Teach Driah a word
    Teach {
        /// The word or phrase
        term: String,

        /// What it means
        meaning: String,

        /// An example sentence
        #[arg(short, long)]
        example: Option<String>,
    },

    /// List known words
    Words,

    /// Show the conversation
    History {
        /// Only the last N messages
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Delete a message by id (or unique id prefix)
    Delete {
        /// Message ID
        id: String,
    },

    /// Export the conversation
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export format
        #[arg(short, long, value_enum, default_value = "text")]
        format: ExportFormat,
    },

    /// Replace the conversation with a JSON snapshot
    Import {
        /// Input file
        input: PathBuf,
    },

    /// Show or switch the colour theme
    Theme {
        /// Switch between light and dark
        #[arg(short, long)]
        toggle: bool,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum ExportFormat {
    Text,
    Json,
}

/// Colours for the current theme
#[derive(Debug, Clone, Copy)]
struct Palette {
    user: Color,
    assistant: Color,
    accent: Color,
}

impl Palette {
    fn for_theme(dark_mode: bool) -> Self {
        if dark_mode {
            Self {
                user: Color::BrightCyan,
                assistant: Color::BrightWhite,
                accent: Color::BrightMagenta,
            }
        } else {
            Self {
                user: Color::Blue,
                assistant: Color::Black,
                accent: Color::Magenta,
            }
        }
    }

    fn sender(&self, sender: Sender) -> Color {
        match sender {
            Sender::User => self.user,
            Sender::Assistant => self.assistant,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "warn,driah=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = build_config(&cli);
    let mut assistant = Assistant::open(config).await?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => cmd_chat(&mut assistant).await,
        Commands::Ask { text } => cmd_ask(&mut assistant, text.join(" ")).await,
        Commands::Teach {
            term,
            meaning,
            example,
        } => cmd_teach(&mut assistant, term, meaning, example).await,
        Commands::Words => cmd_words(&assistant),
        Commands::History { limit } => cmd_history(&assistant, limit),
        Commands::Delete { id } => cmd_delete(&mut assistant, id).await,
        Commands::Export { output, format } => cmd_export(&mut assistant, output, format).await,
        Commands::Import { input } => cmd_import(&mut assistant, input).await,
        Commands::Theme { toggle } => cmd_theme(&mut assistant, toggle).await,
    }
}

fn build_config(cli: &Cli) -> AssistantConfig {
    let mut builder = AssistantConfigBuilder::new().data_dir(&cli.data_dir);
    if cli.ephemeral {
        builder = builder.storage(StorageKind::Memory);
    }
    if cli.no_delay {
        builder = builder.instant();
    }
    builder.build()
}

fn print_message(message: &Message, palette: Palette) {
    let label = format!("{}:", message.sender.transcript_label())
        .color(palette.sender(message.sender))
        .bold();
    println!("{} {}", label, message.text.color(palette.sender(message.sender)));
    println!();
}

/// Route Ctrl-C for the whole chat session.
///
/// While a reply is pending the signal is forwarded on the returned channel so
/// the chat loop can cancel it. Anywhere else it ends the process. Every write
/// is awaited before the prompt comes back, so nothing is lost on exit.
fn spawn_interrupt_handler(typing: Arc<AtomicBool>) -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let signals = || async { tokio::signal::ctrl_c().await.is_ok() };
        if route_interrupts(signals, &typing, &tx).await {
            println!();
            std::process::exit(130);
        }
    });
    rx
}

/// Forward signals that arrive while `typing` is set. Returns `true` on the
/// first signal outside a pending reply, `false` once the signal source or
/// the chat loop goes away.
async fn route_interrupts<F, Fut>(
    mut next_signal: F,
    typing: &AtomicBool,
    cancel: &mpsc::UnboundedSender<()>,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    while next_signal().await {
        if !typing.load(Ordering::SeqCst) {
            return true;
        }
        if cancel.send(()).is_err() {
            return false;
        }
    }
    false
}

async fn cmd_chat(assistant: &mut Assistant) -> anyhow::Result<()> {
    let mut palette = Palette::for_theme(assistant.dark_mode());
    let typing = Arc::new(AtomicBool::new(false));
    let mut interrupts = spawn_interrupt_handler(Arc::clone(&typing));

    println!("{}", "=== Driah AI ===".color(palette.accent).bold());
    println!("{}", "Type /help for commands, /quit to leave".dimmed());
    println!();

    for message in assistant.history().all() {
        print_message(message, palette);
    }

    if assistant.history().is_empty() {
        tokio::time::sleep(assistant.config().welcome_delay).await;
        if let Some(welcome) = assistant.welcome().await? {
            print_message(&welcome, palette);
        }
    }

    loop {
        print!("{} ", ">".color(palette.user).bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if let Some(command) = input.strip_prefix('/') {
            let (name, args) = command
                .split_once(char::is_whitespace)
                .map(|(n, a)| (n, a.trim()))
                .unwrap_or((command, ""));

            match name {
                "quit" | "exit" => break,
                "help" => print_chat_help(),
                "dict" => cmd_words(assistant)?,
                "history" => cmd_history(assistant, None)?,
                "teach" => {
                    let mut parts = args.splitn(3, '|').map(str::trim);
                    let term = parts.next().unwrap_or("");
                    let meaning = parts.next().unwrap_or("");
                    match assistant.teach(term, meaning, parts.next()).await? {
                        Some(text) => println!("{}\n", text.color(palette.assistant)),
                        None => println!(
                            "{}\n",
                            "Usage: /teach <term> | <meaning> [| <example>]".yellow()
                        ),
                    }
                }
                "delete" => match assistant.resolve_message(args) {
                    Some(id) => {
                        assistant.delete(&id).await?;
                        println!("{}\n", "Message deleted".green());
                    }
                    None => println!("{}\n", format!("No single message matches '{}'", args).red()),
                },
                "download" => {
                    let path = if args.is_empty() { DEFAULT_DOWNLOAD } else { args };
                    let outcome = assistant.download_transcript(path).await?;
                    if let Some(note) = assistant.history().all().last() {
                        print_message(note, palette);
                    }
                    if let DownloadOutcome::Written { path, bytes } = outcome {
                        println!("{}\n", format!("({} bytes -> {})", bytes, path.display()).dimmed());
                    }
                }
                "theme" => {
                    let dark = assistant.toggle_dark_mode().await?;
                    palette = Palette::for_theme(dark);
                    println!("{}\n", format!("Theme: {}", theme_name(dark)).color(palette.accent));
                }
                _ => println!("{}\n", format!("Unknown command '/{}'", name).yellow()),
            }
            continue;
        }

        let Some(message) = assistant.accept(input).await? else {
            continue;
        };

        print!("{}", "Driah AI is typing...".dimmed().italic());
        io::stdout().flush()?;
        let delay = assistant.typing_delay();

        while interrupts.try_recv().is_ok() {}
        typing.store(true, Ordering::SeqCst);
        let cancelled = tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = interrupts.recv() => true,
        };
        typing.store(false, Ordering::SeqCst);
        print!("\r\x1b[2K");

        if cancelled {
            println!("{}\n", "(reply cancelled)".dimmed());
            continue;
        }

        let reply = assistant.reply_to(&message).await?;
        print_message(&reply.message, palette);
    }

    println!("{}", "Goodbye!".color(palette.accent));
    Ok(())
}

fn print_chat_help() {
    println!("{}", "Commands:".bold());
    println!("  /dict                                  List known words");
    println!("  /teach <term> | <meaning> [| <example>] Teach a word");
    println!("  /history                               Show messages with ids");
    println!("  /delete <id>                           Delete a message");
    println!("  /download [path]                       Save the transcript");
    println!("  /theme                                 Toggle dark mode");
    println!("  /quit                                  Leave");
    println!();
    println!("{}", "Or just talk: \"define chatbot\", \"learn word: meaning: example\"".dimmed());
    println!();
}

async fn cmd_ask(assistant: &mut Assistant, text: String) -> anyhow::Result<()> {
    match assistant.send(&text).await? {
        Some(reply) => println!("{}", reply.text),
        None => println!("{}", "Nothing to send".yellow()),
    }
    Ok(())
}

async fn cmd_teach(
    assistant: &mut Assistant,
    term: String,
    meaning: String,
    example: Option<String>,
) -> anyhow::Result<()> {
    match assistant.teach(&term, &meaning, example.as_deref()).await? {
        Some(text) => println!("{}", text.green()),
        None => println!("{}", "A word needs both a term and a meaning".red()),
    }
    Ok(())
}

fn cmd_words(assistant: &Assistant) -> anyhow::Result<()> {
    let palette = Palette::for_theme(assistant.dark_mode());
    let entries = assistant.dictionary().all();

    println!(
        "{}",
        format!("Dictionary ({} words)", entries.len()).bold().underline()
    );
    println!();

    for entry in entries {
        println!("{}", entry.term.color(palette.accent).bold());
        println!("  Meaning: {}", entry.meaning);
        println!("  Example: {}", entry.example.italic());
    }
    println!();

    Ok(())
}

fn cmd_history(assistant: &Assistant, limit: Option<usize>) -> anyhow::Result<()> {
    let palette = Palette::for_theme(assistant.dark_mode());
    let messages = assistant.history().all();

    if messages.is_empty() {
        println!("{}", "No messages yet".yellow());
        return Ok(());
    }

    let skip = limit.map_or(0, |n| messages.len().saturating_sub(n));
    for message in &messages[skip..] {
        println!(
            "{} {} {} {}",
            message.short_id().dimmed(),
            message.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            format!("{}:", message.sender.transcript_label())
                .color(palette.sender(message.sender))
                .bold(),
            message.text
        );
    }

    Ok(())
}

async fn cmd_delete(assistant: &mut Assistant, id: String) -> anyhow::Result<()> {
    let Some(full_id) = assistant.resolve_message(&id) else {
        println!("{}", format!("Message '{}' not found", id).red());
        return Ok(());
    };

    if assistant.delete(&full_id).await? {
        println!("{}", "Message deleted".green());
    }
    Ok(())
}

async fn cmd_export(
    assistant: &mut Assistant,
    output: Option<PathBuf>,
    format: ExportFormat,
) -> anyhow::Result<()> {
    match (format, output) {
        (ExportFormat::Text, Some(path)) => match assistant.download_transcript(&path).await? {
            DownloadOutcome::Empty => println!("{}", "There's no chat history to export yet".yellow()),
            DownloadOutcome::Written { path, bytes } => println!(
                "{}",
                format!("Exported {} bytes to {}", bytes, path.display()).green()
            ),
        },
        (ExportFormat::Text, None) => print!("{}", assistant.export_transcript()),
        (ExportFormat::Json, Some(path)) => {
            tokio::fs::write(&path, assistant.export_snapshot()?).await?;
            println!(
                "{}",
                format!(
                    "Exported {} messages to {}",
                    assistant.history().len(),
                    path.display()
                )
                .green()
            );
        }
        (ExportFormat::Json, None) => println!("{}", assistant.export_snapshot()?),
    }
    Ok(())
}

async fn cmd_import(assistant: &mut Assistant, input: PathBuf) -> anyhow::Result<()> {
    let json = tokio::fs::read_to_string(&input).await?;
    let count = assistant.import_snapshot(&json).await?;
    println!("{}", format!("Imported {} messages", count).green());
    Ok(())
}

async fn cmd_theme(assistant: &mut Assistant, toggle: bool) -> anyhow::Result<()> {
    let dark = if toggle {
        assistant.toggle_dark_mode().await?
    } else {
        assistant.dark_mode()
    };
    println!("Theme: {}", theme_name(dark).bold());
    Ok(())
}

fn theme_name(dark_mode: bool) -> &'static str {
    if dark_mode {
        "dark"
    } else {
        "light"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(count: usize) -> impl FnMut() -> std::future::Ready<bool> {
        let mut left = count;
        move || {
            let fired = left > 0;
            left = left.saturating_sub(1);
            std::future::ready(fired)
        }
    }

    #[tokio::test]
    async fn interrupt_while_typing_cancels_the_reply() {
        let typing = AtomicBool::new(true);
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert!(!route_interrupts(signals(2), &typing, &tx).await);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn interrupt_at_the_prompt_asks_to_exit() {
        let typing = AtomicBool::new(false);
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert!(route_interrupts(signals(1), &typing, &tx).await);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn interrupt_after_a_reply_still_exits() {
        let typing = AtomicBool::new(true);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut fired = 0;
        let next = || {
            fired += 1;
            if fired == 2 {
                typing.store(false, Ordering::SeqCst);
            }
            std::future::ready(true)
        };

        assert!(route_interrupts(next, &typing, &tx).await);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
