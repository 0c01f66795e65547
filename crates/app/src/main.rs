use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use fiscus_core::Account;
use fiscus_import::{CsvStatementParser, ImportSession, SessionPhase};
use fiscus_remote::{BudgetStore, RestClient};
use fiscus_storage::SqliteSessionStore;

mod config;

#[derive(Parser)]
#[command(name = "fiscus", about = "Envelope-budget statement import", version)]
struct Args {
    /// Statement file to import.
    file: PathBuf,
    /// Name or id of the account the statement belongs to.
    account: String,
    /// Import every candidate that is not flagged as a duplicate.
    #[arg(long)]
    commit: bool,
    /// Config file location (defaults to the platform config directory).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let dirs = directories::ProjectDirs::from("money", "fiscus", "Fiscus")
        .context("could not locate a home directory")?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| dirs.config_dir().join("fiscus.toml"));
    let config = config::Config::load(&config_path)?;

    let store = RestClient::new(&config.store_url, &config.budget_id);

    let db_path = config
        .database_path
        .clone()
        .unwrap_or_else(|| dirs.data_dir().join("sessions.db"));
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("could not create {}", parent.display()))?;
    }
    let sessions = SqliteSessionStore::open(&db_path).await?;
    if ImportSession::has_saved_session(&sessions).await? {
        println!("Note: an earlier import session was left unfinished; starting a new one replaces it.");
    }

    let target = find_account(&store, &args.account).await?;
    let target_name = target.name.clone();

    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("could not read {}", args.file.display()))?;
    let parser = CsvStatementParser::new(config.statement_profile.clone().unwrap_or_default());

    let mut session = ImportSession::new(sessions);
    session.select_account(target)?;
    let count = session.start_import(&store, &parser, &bytes).await?;
    println!("{count} candidate transaction(s) for {target_name}");

    for (index, candidate) in session.candidates().iter().enumerate() {
        let draft = &candidate.draft;
        println!(
            "#{index} {} {:>12} {}",
            draft.date,
            format_cents(draft.amount_cents),
            draft.note
        );
        if let Some(name) = &candidate.source_account_name {
            if draft.source_account_id.is_none() {
                println!("      new source account: {name}");
            }
        }
        if let Some(name) = &candidate.destination_account_name {
            if draft.destination_account_id.is_none() {
                println!("      new destination account: {name}");
            }
        }
        if let Some(envelope) = &draft.envelope_id {
            println!("      envelope: {envelope}");
        }
        let duplicates = candidate.duplicate_ids().len();
        if duplicates > 0 {
            println!("      warning: matches {duplicates} existing transaction(s)");
        }
    }

    if !args.commit {
        session.cancel().await?;
        println!("Preview only; nothing imported. Re-run with --commit to import.");
        return Ok(());
    }

    let mut imported = 0usize;
    let mut dismissed = 0usize;
    while session.phase() == SessionPhase::Previewing {
        let current = session.current().context("cursor has no candidate")?;
        if !current.duplicate_ids().is_empty() {
            dismissed += 1;
            session.dismiss_current().await?;
            continue;
        }
        let tx = session.commit_current(&store).await?;
        imported += 1;
        tracing::debug!(id = ?tx.id, "imported transaction");
    }
    println!("Imported {imported} transaction(s); dismissed {dismissed} duplicate(s).");
    Ok(())
}

/// Accept an account by id or by exact name.
async fn find_account(store: &RestClient, needle: &str) -> anyhow::Result<Account> {
    if let Ok(account) = store.get::<Account>(needle).await {
        return Ok(account);
    }
    let accounts = store.list_accounts().await?;
    accounts
        .into_iter()
        .find(|account| account.name == needle)
        .with_context(|| format!("no account named \"{needle}\""))
}

fn format_cents(cents: i64) -> String {
    format!("${}.{:02}", cents / 100, (cents % 100).abs())
}
