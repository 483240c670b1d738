use std::io::{IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use coda_core::agent::{ResumeTarget, SessionOptions, build_session};
use coda_core::config::constants::defaults;
use coda_core::convo::store::MessageStore;
use coda_core::llm::provider::ThinkingBudget;

#[derive(Parser, Debug)]
#[command(
    name = "coda",
    version,
    about = "Agentic coding assistant for the terminal"
)]
struct Cli {
    /// The task or question for the agent. Read from stdin when omitted.
    prompt: Vec<String>,

    /// Model alias or id, e.g. claude-3-5-sonnet, gpt-4o, deepseek-chat
    #[arg(short, long)]
    model: Option<String>,

    /// Continue a conversation: the latest one, or a specific id
    /// (`--continue=ID`)
    #[arg(
        short = 'c',
        long = "continue",
        value_name = "ID",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = ""
    )]
    continue_conversation: Option<String>,

    /// Start a fresh conversation (the default)
    #[arg(long, conflicts_with = "continue_conversation")]
    new: bool,

    /// Base URL override for the model's API endpoint
    #[arg(long)]
    custom_url: Option<String>,

    /// Maximum tokens to generate
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Nucleus sampling cutoff
    #[arg(long)]
    top_p: Option<f32>,

    /// Top-k sampling cutoff
    #[arg(long)]
    top_k: Option<u32>,

    /// Frequency penalty
    #[arg(long)]
    frequency_penalty: Option<f32>,

    /// Presence penalty
    #[arg(long)]
    presence_penalty: Option<f32>,

    /// Stop sequence (repeatable)
    #[arg(long = "stop", value_name = "SEQ")]
    stop_sequences: Vec<String>,

    /// Thinking budget: off, low, medium, or high
    #[arg(long, value_name = "LEVEL")]
    thinking: Option<ThinkingBudget>,

    /// List stored conversations and exit
    #[arg(long)]
    list_conversations: bool,

    /// Print a stored conversation and exit
    #[arg(long, value_name = "ID")]
    print_conversation: Option<String>,

    /// Delete a stored conversation and exit
    #[arg(long, value_name = "ID")]
    delete_conversation: Option<String>,

    /// With --delete-conversation, also delete descendants
    #[arg(long, requires = "delete_conversation")]
    cascade: bool,
}

fn store_path() -> PathBuf {
    PathBuf::from(defaults::STORE_FILE)
}

fn list_conversations() -> Result<()> {
    let store = MessageStore::open(store_path())?;
    let summaries = store.list();
    if summaries.is_empty() {
        println!("no stored conversations");
        return Ok(());
    }
    for summary in summaries {
        println!(
            "{}  {}  {}  {}",
            summary.id,
            summary.created_at.format("%Y-%m-%d %H:%M"),
            summary.model,
            summary.preview
        );
    }
    Ok(())
}

fn print_conversation(id: &str) -> Result<()> {
    let store = MessageStore::open(store_path())?;
    let (dialog, model) = store.dialog_from_leaf(id)?;
    println!("model: {model}\n");
    for message in dialog {
        println!("[{:?}]", message.role);
        let text = message.text();
        if !text.is_empty() {
            println!("{text}");
        }
        for (_, name, arguments) in message.tool_calls() {
            println!("-> {name} {arguments}");
        }
        println!();
    }
    Ok(())
}

fn delete_conversation(id: &str, cascade: bool) -> Result<()> {
    let mut store = MessageStore::open(store_path())?;
    let removed = store.delete(id, cascade)?;
    println!("deleted {removed} message(s)");
    Ok(())
}

fn read_prompt(args: &[String]) -> Result<String> {
    if !args.is_empty() {
        return Ok(args.join(" "));
    }
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        bail!("no prompt given; pass it as an argument or pipe it on stdin");
    }
    let mut prompt = String::new();
    stdin
        .read_to_string(&mut prompt)
        .context("failed to read prompt from stdin")?;
    let prompt = prompt.trim().to_string();
    if prompt.is_empty() {
        bail!("empty prompt on stdin");
    }
    Ok(prompt)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.list_conversations {
        return list_conversations();
    }
    if let Some(id) = &cli.print_conversation {
        return print_conversation(id);
    }
    if let Some(id) = &cli.delete_conversation {
        return delete_conversation(id, cli.cascade);
    }

    let prompt = read_prompt(&cli.prompt)?;
    let resume = match cli.continue_conversation {
        Some(id) if id.is_empty() => ResumeTarget::Latest,
        Some(id) => ResumeTarget::Conversation(id),
        None => ResumeTarget::New,
    };

    let workspace_root = std::env::current_dir().context("cannot determine current directory")?;
    let mut executor = build_session(SessionOptions {
        model: cli.model,
        custom_url: cli.custom_url,
        resume,
        store_path: store_path(),
        workspace_root,
        max_tokens: cli.max_tokens,
        temperature: cli.temperature,
        top_p: cli.top_p,
        top_k: cli.top_k,
        frequency_penalty: cli.frequency_penalty,
        presence_penalty: cli.presence_penalty,
        stop_sequences: cli.stop_sequences,
        thinking: cli.thinking,
    })?;

    executor.run(&prompt).await?;
    Ok(())
}
