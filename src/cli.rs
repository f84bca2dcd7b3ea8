//! Command-line surface: argument parsing and the thin wiring around the
//! pipeline. No resolution logic lives here.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use clap::Parser;

use crate::client::{HistoryRecord, Outcome, SmslClient};
use crate::config::{ConfigStore, StdinPrompt, profile, resolve_profile};
use crate::contacts::all_contacts;
use crate::domain::{MessageText, segment_count};
use crate::transport::UrlTemplate;

#[derive(Parser, Debug)]
#[command(
    name = "smsl",
    version,
    about = "Send command-line SMS via the HTTP API of your provider"
)]
pub struct Cli {
    /// Number or contact you wish to send the sms to. Separate several
    /// recipients with commas.
    pub to: Option<String>,

    /// The message text. Use quotes, otherwise the shell mangles '*?' and
    /// other special characters.
    pub text: Vec<String>,

    /// Select the profile.
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Just print the constructed url, do not send the message.
    #[arg(short, long)]
    pub test: bool,

    /// Count characters in the message, do not send.
    #[arg(short, long)]
    pub count: bool,

    /// Show all available contacts.
    #[arg(short, long)]
    pub show: bool,

    /// Show the url template fields of the selected profile and their
    /// current defaults.
    #[arg(short, long)]
    pub options: bool,

    /// Override a url template field, e.g. --param user=alice. May be
    /// given several times.
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_owned(), value.to_owned()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.count {
        return count_characters(&cli);
    }

    let store = ConfigStore::load_default()?;

    if cli.show {
        return show_contacts(&store);
    }

    let overrides: BTreeMap<String, String> = cli.params.iter().cloned().collect();

    if cli.options {
        return show_options(&store, cli.profile.as_deref(), &overrides);
    }

    let to = cli
        .to
        .as_deref()
        .context("no recipient given (see --help)")?;
    let message = MessageText::new(cli.text.join(" "))?;
    let profile = resolve_profile(&store, cli.profile.as_deref(), &overrides, &StdinPrompt)?;
    let book = store.contacts()?;
    let csv = store.csv_contacts()?;

    let client = SmslClient::new();
    match client
        .send(&profile, &book, csv.as_ref(), to, &message, cli.test)
        .await?
    {
        Outcome::Test { request } => println!("Constructed url: {request}"),
        Outcome::Sent {
            answer,
            verdict,
            record,
            ..
        } => {
            if profile.print_answer() {
                println!("{}", answer.trim());
            }
            if let Some(path) = profile.history() {
                append_history(path, &record).with_context(|| {
                    format!("could not append to history file {}", path.display())
                })?;
            }
            if !verdict.success {
                anyhow::bail!("provider rejected the message: {}", verdict.summary());
            }
            tracing::info!("message accepted: {}", verdict.summary());
        }
    }
    Ok(())
}

/// `-c`: report length and estimated segment count of all positional words.
fn count_characters(cli: &Cli) -> anyhow::Result<()> {
    let words: Vec<&str> = cli
        .to
        .iter()
        .map(String::as_str)
        .chain(cli.text.iter().map(String::as_str))
        .collect();
    let text = words.join(" ");
    let chars = text.chars().count();
    println!(
        "The message has {chars} characters. That is {} sms with 160 (145) characters.",
        segment_count(chars)
    );
    Ok(())
}

/// `-s`: print the merged contact listing, sorted by name.
fn show_contacts(store: &ConfigStore) -> anyhow::Result<()> {
    let book = store.contacts()?;
    let csv = store.csv_contacts()?;
    let contacts = all_contacts(&book, csv.as_ref())?;
    if contacts.is_empty() {
        println!("No contacts found.");
        return Ok(());
    }
    println!("{:>30} {}", "contact", "number");
    println!("{:>30} {}", "-".repeat(10), "-".repeat(10));
    for (name, number) in contacts {
        println!("{name:>30} {number}");
    }
    Ok(())
}

/// `-o`: print the selected profile's template fields with their current
/// defaults, without prompting for anything.
fn show_options(
    store: &ConfigStore,
    selector: Option<&str>,
    overrides: &BTreeMap<String, String>,
) -> anyhow::Result<()> {
    let name = store.select_profile(selector)?;
    let template = profile::profile_template(store, name)?;
    println!("profile: {name}");
    println!("url: {}", template.as_str());
    for placeholder in template.placeholders() {
        if placeholder == UrlTemplate::TO || placeholder == UrlTemplate::TEXT {
            continue;
        }
        match overrides
            .get(placeholder)
            .cloned()
            .or_else(|| profile::lookup_field(store, name, placeholder))
        {
            Some(value) => println!("  --param {placeholder}=... (default: {value})"),
            None => println!("  --param {placeholder}=... (mandatory)"),
        }
    }
    Ok(())
}

/// Append one send to the history file, creating it if needed.
fn append_history(path: &Path, record: &HistoryRecord) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(
        file,
        "profile: {} receiver: {} msg: '{}' response: {}",
        record.profile,
        record.recipients,
        record.message,
        record.answer.trim()
    )
}
