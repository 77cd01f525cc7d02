//! `ronda` - CLI for rondaguard
//!
//! This binary records inspection rounds, lists and reports on the history,
//! and merges rounds queued while offline.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::Parser;

use rondaguard::cli::{
    Cli, Command, ConfigCommand, HistoryCommand, LoginCommand, OutputFormat, ReportCommand,
    RoundCommand, SettingsCommand, SubmitArgs, TaskCommand, TemplateCommand, UserCommand,
};
use rondaguard::history::{Facets, RoundFilter, Summary};
use rondaguard::model::{ChecklistItem, ChecklistTemplate, RoundLog, Task, User};
use rondaguard::sync::{Ack, SyncTrigger};
use rondaguard::{init_logging, App, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Config(cmd) => handle_config(&config, cmd),
        command => {
            let path = config.database_path();
            let app = App::open(config, cli.offline)
                .with_context(|| format!("failed to open store at {}", path.display()))?;
            let launched = app.launch_sync().await;
            run(&app, command, launched).await
        }
    }
}

async fn run(app: &App, command: Command, launched: SyncTrigger) -> anyhow::Result<()> {
    match command {
        Command::Round(cmd) => handle_round(app, cmd),
        Command::History(cmd) => handle_history(app, &cmd),
        Command::Sync => handle_sync(app, launched).await,
        Command::Status(cmd) => handle_status(app, cmd.json),
        Command::Report(cmd) => handle_report(app, &cmd),
        Command::Task(cmd) => handle_task(app, cmd),
        Command::Template(cmd) => handle_template(app, cmd),
        Command::User(cmd) => handle_user(app, cmd),
        Command::Login(cmd) => handle_login(app, &cmd),
        Command::Settings(cmd) => handle_settings(app, cmd),
        Command::Config(cmd) => handle_config(app.config(), cmd),
    }
}

fn handle_round(app: &App, cmd: RoundCommand) -> anyhow::Result<()> {
    match cmd {
        RoundCommand::Submit(args) => submit_round(app, args),
        RoundCommand::Show { id, json } => {
            let Some(round) = app.history().find(&id)? else {
                bail!("round not found: {id}");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&round)?);
            } else {
                print_round_detail(&round);
            }
            Ok(())
        }
    }
}

fn submit_round(app: &App, args: SubmitArgs) -> anyhow::Result<()> {
    let task = app.catalog().task(&args.task)?;
    let end = args.end.unwrap_or_else(Utc::now);
    if end < args.start {
        bail!("round cannot end before it starts");
    }

    let mut round = RoundLog::for_task(&task, args.start.timestamp_millis(), end.timestamp_millis());
    for id in &args.checked {
        if !round.checklist_state.iter().any(|item| &item.id == id) {
            bail!("task {} has no checklist item {id}", task.id);
        }
    }
    round.set_checked(&args.checked);
    round.observations = args.observations;
    round.issues_detected = args.issues;
    round.signature = args.signature;
    round.photos = args.photos;
    round.seal();

    let id = round.id.clone();
    let token = round.validation_token.clone().unwrap_or_default();
    let ack = app
        .submitter()
        .submit_round(round)
        .context("round was NOT saved")?;

    match ack {
        Ack::Synced => println!("Round {id} saved (token {token})"),
        Ack::Queued => {
            println!("Round {id} saved offline (token {token})");
            println!("It will be merged into the history on the next sync.");
        }
    }
    Ok(())
}

fn handle_history(app: &App, cmd: &HistoryCommand) -> anyhow::Result<()> {
    let all = app.history().list_rounds()?;
    let mut rounds = if cmd.stored_order {
        all
    } else {
        cmd.filter().apply(&all)
    };
    rounds.truncate(cmd.limit);

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rounds)?),
        OutputFormat::Plain => {
            for round in &rounds {
                println!(
                    "{}  {}  {} / {}  {}{}",
                    format_time(round.start_time),
                    round.id,
                    round.sector,
                    round.task_title,
                    round.sync,
                    if round.issues_detected { "  issues" } else { "" }
                );
            }
        }
        OutputFormat::Table => {
            println!(
                "{:<17} {:<20} {:<28} {:<18} {:>8} {:<7} {:<7}",
                "STARTED", "SECTOR", "TASK", "RESPONSIBLE", "DURATION", "ISSUES", "SYNC"
            );
            for round in &rounds {
                println!(
                    "{:<17} {:<20} {:<28} {:<18} {:>8} {:<7} {:<7}",
                    format_time(round.start_time),
                    truncate(&round.sector, 20),
                    truncate(&round.task_title, 28),
                    truncate(&round.responsible, 18),
                    format_duration(round.duration_seconds),
                    if round.issues_detected { "yes" } else { "no" },
                    round.sync,
                );
            }
            if rounds.is_empty() {
                println!("(no rounds)");
            }
        }
    }
    Ok(())
}

async fn handle_sync(app: &App, launched: SyncTrigger) -> anyhow::Result<()> {
    let pending = app.history().pending_rounds()?.len();
    if !app.connectivity().is_online() {
        println!("Offline: {pending} round(s) waiting to sync.");
        return Ok(());
    }

    // The launch already reconciled once; only retry when it found nothing.
    let trigger = match launched {
        SyncTrigger::Reconciled(0) | SyncTrigger::Skipped => app.monitor().sync_now().await,
        other => other,
    };
    match trigger {
        SyncTrigger::Reconciled(0) => println!("Nothing to sync."),
        SyncTrigger::Reconciled(n) => println!("{n} record(s) synced."),
        SyncTrigger::Failed => bail!("sync failed; {pending} round(s) remain queued"),
        SyncTrigger::Skipped => println!("Sync skipped ({}).", app.monitor().status()),
    }
    Ok(())
}

fn handle_status(app: &App, json: bool) -> anyhow::Result<()> {
    let stats = app.store().stats()?;
    let status = app.monitor().status();

    if json {
        let value = serde_json::json!({
            "status": status,
            "online": app.connectivity().is_online(),
            "synced_rounds": stats.synced_rounds,
            "pending_rounds": stats.pending_rounds,
            "database_path": app.store().path(),
            "database_size_bytes": stats.db_size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("ronda status");
        println!("------------");
        println!("Connectivity:  {status}");
        println!("Synced rounds: {}", stats.synced_rounds);
        println!("Pending:       {}", stats.pending_rounds);
        println!("Database:      {}", app.store().path().display());
        println!("Size:          {} bytes", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_report(app: &App, cmd: &ReportCommand) -> anyhow::Result<()> {
    let filter = RoundFilter {
        since: cmd.since,
        until: cmd.until,
        ..RoundFilter::default()
    };
    let rounds = filter.apply(&app.history().list_rounds()?);
    let summary = Summary::from_rounds(&rounds);
    let facets = Facets::from_rounds(&rounds);
    let settings = app.catalog().settings()?;

    if cmd.json {
        let value = serde_json::json!({
            "company": settings.company_name,
            "summary": summary,
            "facets": facets,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", settings.company_name);
    println!("{}", "=".repeat(settings.company_name.chars().count()));
    println!();
    println!("Total rounds:      {}", summary.total_rounds);
    println!("With issues:       {}", summary.rounds_with_issues);
    println!(
        "Average duration:  {}",
        format_duration(summary.average_duration_seconds)
    );
    println!();
    println!("[Rounds by sector]");
    for tally in &summary.rounds_by_sector {
        println!("  {:<24} {}", tally.name, tally.count);
    }
    println!();
    println!("[Most active]");
    for tally in &summary.top_responsibles {
        println!("  {:<24} {}", tally.name, tally.count);
    }
    println!();
    println!("[Sectors with most issues]");
    for tally in &summary.top_issue_sectors {
        println!("  {:<24} {}", tally.name, tally.count);
    }
    Ok(())
}

fn handle_task(app: &App, cmd: TaskCommand) -> anyhow::Result<()> {
    let catalog = app.catalog();
    match cmd {
        TaskCommand::List { json } => {
            let tasks = catalog.tasks()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else {
                for task in &tasks {
                    println!(
                        "{}  {} / {}  ({}, {} items)",
                        task.id,
                        task.sector,
                        task.title,
                        task.responsible,
                        task.checklist.len()
                    );
                }
            }
        }
        TaskCommand::Add {
            sector,
            title,
            responsible,
            ticket,
            description,
            template,
            items,
        } => {
            let mut task = Task::new(sector, title, responsible);
            task.ticket_id = ticket;
            task.description = description;
            task.checklist = match template {
                Some(id) => catalog
                    .templates()?
                    .into_iter()
                    .find(|t| t.id == id)
                    .with_context(|| format!("template not found: {id}"))?
                    .instantiate(),
                None => items
                    .iter()
                    .enumerate()
                    .map(|(i, label)| ChecklistItem::new(format!("item-{}", i + 1), label.clone()))
                    .collect(),
            };
            let id = task.id.clone();
            catalog.save_task(task)?;
            println!("Task {id} created");
        }
        TaskCommand::Delete { id } => {
            catalog.delete_task(&id)?;
            println!("Task {id} deleted");
        }
        TaskCommand::Duplicate { id } => {
            let copy = catalog.duplicate_task(&id)?;
            println!("Task {id} copied to {}", copy.id);
        }
    }
    Ok(())
}

fn handle_template(app: &App, cmd: TemplateCommand) -> anyhow::Result<()> {
    let catalog = app.catalog();
    match cmd {
        TemplateCommand::List { json } => {
            let templates = catalog.templates()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&templates)?);
            } else {
                for template in &templates {
                    println!("{}  {}", template.id, template.name);
                    for item in &template.items {
                        println!("    - {item}");
                    }
                }
            }
        }
        TemplateCommand::Add { name, items } => {
            let template = ChecklistTemplate::new(name, items);
            let id = template.id.clone();
            catalog.save_template(template)?;
            println!("Template {id} created");
        }
        TemplateCommand::Delete { id } => {
            catalog.delete_template(&id)?;
            println!("Template {id} deleted");
        }
    }
    Ok(())
}

fn handle_user(app: &App, cmd: UserCommand) -> anyhow::Result<()> {
    let catalog = app.catalog();
    match cmd {
        UserCommand::List { json } => {
            let users = catalog.users()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&users)?);
            } else {
                for user in &users {
                    println!(
                        "{:<38} {:<24} {:<28} {:<11} {}",
                        user.id,
                        user.name,
                        user.email,
                        user.role,
                        if user.active { "active" } else { "inactive" }
                    );
                }
            }
        }
        UserCommand::Add {
            name,
            email,
            password,
            role,
        } => {
            let user = User {
                id: uuid::Uuid::now_v7().to_string(),
                name,
                email,
                password,
                role: role.into(),
                active: true,
                avatar: None,
            };
            let id = user.id.clone();
            catalog.save_user(user)?;
            println!("User {id} created");
        }
        UserCommand::Activate { id } => {
            let user = catalog.set_user_active(&id, true)?;
            println!("{} can log in", user.name);
        }
        UserCommand::Deactivate { id } => {
            let user = catalog.set_user_active(&id, false)?;
            println!("{} can no longer log in", user.name);
        }
    }
    Ok(())
}

fn handle_login(app: &App, cmd: &LoginCommand) -> anyhow::Result<()> {
    let user = app.catalog().login(&cmd.email, &cmd.password)?;
    println!("Logged in as {} ({})", user.name, user.role);
    println!("  Manage tasks:  {}", yes_no(user.role.can_manage_tasks()));
    println!("  Delete tasks:  {}", yes_no(user.role.can_delete_tasks()));
    println!("  View reports:  {}", yes_no(user.role.can_view_stats()));
    println!("  Manage users:  {}", yes_no(user.role.can_manage_users()));
    Ok(())
}

fn handle_settings(app: &App, cmd: SettingsCommand) -> anyhow::Result<()> {
    let catalog = app.catalog();
    match cmd {
        SettingsCommand::Show { json } => {
            let settings = catalog.settings()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                println!("Company name:  {}", settings.company_name);
                println!("Header color:  {}", settings.header_color);
                println!(
                    "Logo:          {}",
                    settings.logo.as_deref().unwrap_or("(none)")
                );
            }
        }
        SettingsCommand::Set {
            company_name,
            header_color,
            logo,
        } => {
            let mut settings = catalog.settings()?;
            if let Some(name) = company_name {
                settings.company_name = name;
            }
            if let Some(color) = header_color {
                settings.header_color = color;
            }
            if logo.is_some() {
                settings.logo = logo;
            }
            catalog.save_settings(&settings)?;
            println!("Settings saved");
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Quota (bytes):      {}", config.storage.quota_bytes);
                println!("  Seed default users: {}", config.storage.seed_default_users);
                println!();
                println!("[Sync]");
                println!("  Assume online:      {}", config.sync.assume_online);
                println!("  Status display ms:  {}", config.sync.status_display_ms);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn print_round_detail(round: &RoundLog) {
    println!("Round {}", round.id);
    println!("  Task:        {} ({})", round.task_title, round.task_id);
    if let Some(ticket) = &round.ticket_id {
        println!("  Ticket:      {ticket}");
    }
    println!("  Sector:      {}", round.sector);
    println!("  Responsible: {}", round.responsible);
    println!("  Started:     {}", format_time(round.start_time));
    println!("  Ended:       {}", format_time(round.end_time));
    println!("  Duration:    {}", format_duration(round.duration_seconds));
    println!("  Issues:      {}", yes_no(round.issues_detected));
    println!("  Sync:        {}", round.sync);
    println!(
        "  Token:       {} ({})",
        round.validation_token.as_deref().unwrap_or("(none)"),
        if round.verify_token() { "valid" } else { "invalid" }
    );
    println!("  Checklist:");
    for item in &round.checklist_state {
        println!("    [{}] {}", if item.checked { "x" } else { " " }, item.label);
    }
    if !round.observations.is_empty() {
        println!("  Observations: {}", round.observations);
    }
}

fn format_time(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map_or_else(|| ms.to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string())
}

fn format_duration(seconds: u64) -> String {
    format!("{}m{:02}s", seconds / 60, seconds % 60)
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut short: String = value.chars().take(width.saturating_sub(1)).collect();
        short.push('…');
        short
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
