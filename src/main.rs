mod citations;
mod client;
mod config;
mod controller;
mod conversation;
mod error;
mod logging;
mod parks;
mod session;
mod tui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{CommandFactory, Parser};
use config::{ConfigFile, Overrides, ResolvedConfig};
use conversation::EmploymentType;

#[derive(Parser, Debug)]
#[command(
    name = "backster",
    about = "Chat with Backster, the staff assistant for the parks",
    long_about = None,
)]
struct Args {
    /// Question to ask directly (omit to enter interactive TUI mode)
    query: Option<String>,

    /// Profile to use from config file
    #[arg(short, long, env = "BACKSTER_PROFILE")]
    profile: Option<String>,

    /// Override the answering service URL
    #[arg(long, env = "BACKSTER_ENDPOINT")]
    endpoint: Option<String>,

    /// Override the access key
    #[arg(long, env = "BACKSTER_KEY")]
    key: Option<String>,

    /// Park short code: gl, fv, km, ss
    #[arg(long, env = "BACKSTER_PARK")]
    park: Option<String>,

    /// Employment type for single-shot mode (Tillsvidare or Säsong/Visstid)
    #[arg(short, long)]
    employment: Option<EmploymentType>,

    /// Show timestamps on messages
    #[arg(long)]
    timestamps: bool,

    /// Write logs here instead of the default state directory
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Write a default config file to ~/.config/backster/config.toml and exit
    #[arg(long)]
    init: bool,

    /// List available profiles and exit
    #[arg(long)]
    profiles: bool,

    /// Generate shell completions and print to stdout (bash, zsh, fish, elvish)
    #[arg(long, value_name = "SHELL")]
    completions: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // ── --init ────────────────────────────────────────────────────────────────
    if args.init {
        let path = ConfigFile::write_default_if_missing()?;
        println!("Config written to: {}", path.display());
        println!("Edit it, then run: backster");
        return Ok(());
    }

    // ── --completions ─────────────────────────────────────────────────────────
    if let Some(shell_name) = &args.completions {
        return generate_completions(shell_name);
    }

    let file = ConfigFile::load()?;

    // ── --profiles ────────────────────────────────────────────────────────────
    if args.profiles {
        print_profiles(&file);
        return Ok(());
    }

    let resolved = ResolvedConfig::resolve(
        &file,
        &Overrides {
            profile: args.profile.as_deref(),
            endpoint: args.endpoint.as_deref(),
            key: args.key.as_deref(),
            park: args.park.as_deref(),
            timestamps: args.timestamps,
        },
    );

    // ── Single-shot mode (non-TUI) ────────────────────────────────────────────
    if let Some(query) = args.query {
        let _log_guard = match &args.log_file {
            Some(path) => logging::init(logging::Sink::File(path))?,
            None => logging::init(logging::Sink::Stderr)?,
        };
        let Some(employment) = args.employment else {
            bail!("single-shot mode needs --employment (Tillsvidare or Säsong/Visstid)");
        };
        return run_single_shot(query, employment, resolved).await;
    }

    // ── Interactive TUI mode ──────────────────────────────────────────────────
    let log_path = args.log_file.unwrap_or_else(logging::default_log_path);
    // Flushes the background log writer when the TUI exits
    let _log_guard = logging::init(logging::Sink::File(&log_path))?;
    tracing::info!(profile = %resolved.profile_name, park = resolved.park.name, "starting");

    tui::run(resolved).await
}

// ── Single-shot mode (plain stdout, no TUI) ───────────────────────────────────

async fn run_single_shot(query: String, employment: EmploymentType, resolved: ResolvedConfig) -> Result<()> {
    let Some(key) = resolved.key.as_deref() else {
        bail!("no access key configured (set `key` in the profile, --key or BACKSTER_KEY)");
    };

    let service = Arc::new(client::HttpAnsweringService::new(
        resolved.endpoint.clone(),
        resolved.referer.clone(),
        resolved.timeout,
    )?);

    let session = session::acquire_token(service.as_ref(), key).await?;

    let mut chat = controller::ConversationController::new(service, session, resolved.park)
        .restore_draft_on_failure(resolved.restore_draft_on_failure);
    chat.classify(employment);
    chat.set_input(query);

    match chat.submit_input().await {
        controller::DispatchOutcome::Answered => {}
        controller::DispatchOutcome::Rejected(reason) => {
            bail!("question not sent ({reason}): {:?}", chat.input())
        }
        controller::DispatchOutcome::Failed(e) => {
            if e.looks_like_expired_token() {
                bail!("{e} (the session token may have expired)");
            }
            bail!(e);
        }
    }

    if let Some(answer) = chat.snapshot().conversation.log.last() {
        println!();
        println!("{}", answer.text);
    }

    if chat.open_citations() {
        let mut walk = chat.snapshot().citations.set().clone();
        println!();
        println!("  Sources");
        for i in 0..walk.len() {
            if let Some((label, body)) = walk.current() {
                println!();
                println!("  [{}] {label}", i + 1);
                for line in body.to_plain_text().lines() {
                    println!("      {line}");
                }
            }
            walk.next();
        }
    }
    println!();
    Ok(())
}

// ── Profiles listing (non-TUI) ────────────────────────────────────────────────

fn print_profiles(file: &ConfigFile) {
    println!();
    println!("  Profiles");
    for name in file.profile_names() {
        let Some(p) = file.profiles.get(name) else { continue };
        let marker = if name == file.default_profile { " ←" } else { "" };
        let park = parks::resolve(&p.park);
        let key = if p.key.is_some() { "set" } else { "none" };
        println!("  {name}{marker}");
        println!("    endpoint  {}", p.endpoint);
        println!("    park      {}", park.name);
        println!("    key       {key}");
        println!();
    }
    let codes: Vec<&str> = parks::all().iter().map(|p| p.code).collect();
    println!("  Parks: {}", codes.join(", "));
    println!();
}

// ── Shell completions ─────────────────────────────────────────────────────────

fn generate_completions(shell_name: &str) -> Result<()> {
    use clap_complete::{Shell, generate};

    let shell: Shell = match shell_name.to_lowercase().as_str() {
        "bash"    => Shell::Bash,
        "zsh"     => Shell::Zsh,
        "fish"    => Shell::Fish,
        "elvish"  => Shell::Elvish,
        _ => {
            eprintln!("Unknown shell: {shell_name}");
            eprintln!("Supported: bash, zsh, fish, elvish");
            std::process::exit(1);
        }
    };

    let mut cmd = Args::command();
    generate(shell, &mut cmd, "backster", &mut std::io::stdout());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_single_shot() {
        let args = Args::try_parse_from(["backster", "--park", "km", "-e", "Tillsvidare", "Hur får jag lön?"]).unwrap();
        assert_eq!(args.query.as_deref(), Some("Hur får jag lön?"));
        assert_eq!(args.park.as_deref(), Some("km"));
        assert_eq!(args.employment, Some(EmploymentType::Permanent));
    }

    #[test]
    fn test_args_reject_unknown_employment() {
        assert!(Args::try_parse_from(["backster", "-e", "konsult", "fråga"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Args::command().debug_assert();
    }
}
