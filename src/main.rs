mod ai;
mod api;
mod cli;
mod config;
mod db;
mod journal;

use crate::ai::GeminiClient;
use crate::cli::{AiCommands, Cli, Commands, ConfigCommands, GoalCommands};
use crate::config::Config;
use crate::db::Store;
use crate::journal::dates;
use crate::journal::patch::EntryPatch;
use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, Timelike};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default()?;
    // Lazy: nothing touches the database until the first store operation.
    let store = Store::new(&config.db_path);

    match cli.command {
        Commands::Add {
            description,
            date,
            start,
            end,
            category,
        } => handle_add(&store, &description.join(" "), date, start, end, &category).await,
        Commands::List { date, offset } => {
            let date = dates::shift_days(dates::parse_optional_date(date.as_deref())?, offset)?;
            print_day(&store, date).await
        }
        Commands::Update {
            id,
            start,
            end,
            description,
            category,
        } => {
            let patch = EntryPatch {
                start_time: start,
                end_time: end,
                description,
                category,
                ..EntryPatch::default()
            };
            handle_update(&store, id, patch).await
        }
        Commands::Delete { id } => {
            store.delete_entry(id).await?;
            println!("Entry #{id} deleted");
            Ok(())
        }
        Commands::Goal { command } => handle_goal_command(&store, command).await,
        Commands::Summary { date } => handle_summary(&config, &store, date).await,
        Commands::Serve => {
            info!(db = %store.path().display(), "starting LinearDay API");
            api::run_server(Arc::new(config), store).await
        }
        Commands::Config { command } => handle_config_command(config, command),
        Commands::Ai { command } => handle_ai_command(config, command).await,
        Commands::Doctor => handle_doctor(&config, &store).await,
    }
}

async fn handle_add(
    store: &Store,
    description: &str,
    date: Option<String>,
    start: Option<String>,
    end: Option<String>,
    category: &str,
) -> Result<()> {
    let date = dates::parse_optional_date(date.as_deref())?;
    let (default_start, default_end) = dates::default_time_range(Local::now().hour());

    let entry = journal::prepare_entry(
        date,
        start.as_deref().unwrap_or(&default_start),
        end.as_deref().unwrap_or(&default_end),
        description,
        Some(category),
    )?;

    if !journal::SUGGESTED_CATEGORIES.contains(&entry.category.as_str()) {
        info!(category = %entry.category, "using a custom category");
    }

    let id = store.add_entry(entry).await?;
    println!("Entry #{id} added");

    print_day(store, date).await
}

async fn handle_update(store: &Store, id: i64, patch: EntryPatch) -> Result<()> {
    if patch.is_empty() {
        bail!("Nothing to update. Pass at least one of --start, --end, --description, --category");
    }

    let patch = journal::prepare_patch(patch)?;
    journal::apply_patch(store, id, patch)
        .await
        .with_context(|| format!("Failed to update entry #{id}"))?;

    println!("Entry #{id} updated");
    Ok(())
}

async fn handle_goal_command(store: &Store, command: GoalCommands) -> Result<()> {
    match command {
        GoalCommands::Daily { goal, date } => {
            let date = dates::parse_optional_date(date.as_deref())?;

            if let Some(goal) = goal.filter(|goal| !goal.trim().is_empty()) {
                store.set_daily_goal(journal::daily_goal(date, &goal)).await?;
            }

            let key = dates::format_date(date);
            match store.daily_goal(&key).await? {
                Some(goal) => println!("Goal for {key}: {}", goal.goal),
                None => println!("No goal set for {key}"),
            }
            Ok(())
        }
        GoalCommands::Weekly { goal, date } => {
            let date = dates::parse_optional_date(date.as_deref())?;

            if let Some(goal) = goal.filter(|goal| !goal.trim().is_empty()) {
                store.set_weekly_goal(journal::weekly_goal(date, &goal)).await?;
            }

            let key = dates::format_date(dates::week_start(date));
            match store.weekly_goal(&key).await? {
                Some(goal) => println!("Goal for week of {key}: {}", goal.goal),
                None => println!("No goal set for week of {key}"),
            }
            Ok(())
        }
    }
}

async fn handle_summary(config: &Config, store: &Store, date: Option<String>) -> Result<()> {
    let date = dates::format_date(dates::parse_optional_date(date.as_deref())?);
    let entries = store.entries_by_date(&date).await?;

    let client = GeminiClient::from_config(config);
    let summary = ai::summarize(&client, &date, &entries).await;

    println!("{summary}");
    Ok(())
}

async fn print_day(store: &Store, date: NaiveDate) -> Result<()> {
    let view = journal::load_day(store, date).await?;

    println!("{} ({})", view.label, view.date);
    println!(
        "- week goal ({}): {}",
        view.week_start,
        view.weekly_goal
            .map(|goal| goal.goal)
            .unwrap_or_else(|| "none".to_string())
    );
    println!(
        "- day goal: {}",
        view.daily_goal
            .map(|goal| goal.goal)
            .unwrap_or_else(|| "none".to_string())
    );

    if view.entries.is_empty() {
        println!("No entries yet.");
        return Ok(());
    }

    for entry in &view.entries {
        println!(
            "  #{:<4} {} - {}  {} [{}]",
            entry.id, entry.start_time, entry.end_time, entry.description, entry.category
        );
    }

    Ok(())
}

fn handle_config_command(mut config: Config, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            config.set_value(&key, &value)?;
            config.save()?;

            let masked = if key.contains("api_key") {
                "***hidden***".to_string()
            } else {
                value
            };
            println!("Config saved: {key} = {masked}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

async fn handle_ai_command(mut config: Config, command: AiCommands) -> Result<()> {
    match command {
        AiCommands::Test {
            key,
            base_url,
            model,
        } => {
            if let Some(value) = key {
                config.ai_api_key = Some(value);
            }
            if let Some(value) = base_url {
                config.ai_api_base_url = value;
            }
            if let Some(value) = model {
                config.ai_model = value;
            }

            let response = ai::test_connection(&GeminiClient::from_config(&config)).await?;
            println!("AI API connection successful");
            println!("{response}");

            Ok(())
        }
    }
}

async fn handle_doctor(config: &Config, store: &Store) -> Result<()> {
    let config_path = Config::config_path();
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing");
    }

    match store.schema_version().await {
        Ok(version) => println!(
            "[OK] SQLite reachable: {} (schema v{version})",
            store.path().display()
        ),
        Err(error) => {
            println!("[WARN] SQLite check failed: {error}");
            issues.push("db unreachable");
        }
    }

    if !config.ai_enabled {
        println!("[OK] AI summaries disabled");
    } else if config.resolve_api_key().is_some() {
        println!("[OK] AI API key is configured");
    } else {
        println!("[WARN] AI is enabled but API key is missing");
        issues.push("ai api key missing");
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}
