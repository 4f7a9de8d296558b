use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;

use chrono::{NaiveDate, NaiveTime};
use schedr::content::TemplateGenerator;
use schedr::domain::{Schedule, Task, TaskStatus};
use schedr::notify::LogNotifier;
use schedr::scheduler::TaskScheduler;
use schedr::store::{SqliteTaskRepository, TaskRepository};

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("schedr")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("schedr.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        // Default: run the daemon
        None | Some(Commands::Run) => run_daemon(config).await,
        Some(Commands::Tick) => handle_tick(config).await,
        Some(Commands::Add {
            description,
            kind,
            frequency,
            time,
            date,
            interval,
            target,
        }) => {
            handle_add(
                config,
                description,
                kind,
                frequency,
                time.as_deref(),
                date.as_deref(),
                *interval,
                target.as_deref(),
            )
            .await
        }
        Some(Commands::List { status }) => handle_list(config, status.as_deref()).await,
        Some(Commands::Deactivate { id }) => handle_deactivate(config, id).await,
    }
}

fn open_repository(config: &Config) -> Result<Arc<SqliteTaskRepository>> {
    Ok(Arc::new(SqliteTaskRepository::open_at(
        &config.storage.data_dir,
    )?))
}

async fn run_daemon(config: &Config) -> Result<()> {
    let repo = open_repository(config)?;
    let mut scheduler = TaskScheduler::with_config(
        repo,
        Arc::new(TemplateGenerator::new()),
        Arc::new(LogNotifier::new()),
        config.scheduler.to_scheduler_config(),
    );

    scheduler.start().await;
    println!(
        "{}",
        format!(
            "Scheduler running (poll every {}ms), press Ctrl-C to stop",
            config.scheduler.poll_interval_ms
        )
        .cyan()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    scheduler.stop();
    println!("{}", "Scheduler stopped".cyan());
    Ok(())
}

async fn handle_tick(config: &Config) -> Result<()> {
    let repo = open_repository(config)?;
    let scheduler = TaskScheduler::with_config(
        repo,
        Arc::new(TemplateGenerator::new()),
        Arc::new(LogNotifier::new()),
        config.scheduler.to_scheduler_config(),
    );

    let executed = scheduler.trigger().await?;
    println!("Tick complete: {} task(s) executed", executed);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn handle_add(
    config: &Config,
    description: &str,
    kind: &str,
    frequency: &str,
    time: Option<&str>,
    date: Option<&str>,
    interval: Option<u32>,
    target: Option<&str>,
) -> Result<()> {
    let schedule = build_schedule(frequency, time, date, interval)?;
    let target = target.unwrap_or(description);

    let task = match kind {
        "reminder" => Task::new_reminder(description, target, Some(schedule)),
        "summary" => Task::new_summary(description, target, Some(schedule)),
        "fetch" => Task::new_fetch(description, target, Some(schedule)),
        "learning" => Task::new_learning(description, target, Some(schedule)),
        other => return Err(eyre!("Unknown task kind: {}", other)),
    };

    let repo = open_repository(config)?;
    repo.create(&task).await?;

    println!("{} {}", "Created task".green(), task.id.bold());
    Ok(())
}

fn build_schedule(
    frequency: &str,
    time: Option<&str>,
    date: Option<&str>,
    interval: Option<u32>,
) -> Result<Schedule> {
    let time = time
        .map(|t| NaiveTime::parse_from_str(t, "%H:%M").context("Invalid time, expected HH:MM"))
        .transpose()?
        .ok_or_else(|| eyre!("A --time is required"))?;

    match frequency {
        "once" => {
            let date = date
                .map(|d| {
                    NaiveDate::parse_from_str(d, "%Y-%m-%d")
                        .context("Invalid date, expected YYYY-MM-DD")
                })
                .transpose()?
                .ok_or_else(|| eyre!("A --date is required for once tasks"))?;
            Ok(Schedule::once(date, time))
        }
        "hourly" => Ok(Schedule::hourly(time)),
        "daily" => Ok(Schedule::daily(time)),
        "weekly" => Ok(Schedule::weekly(time, None)),
        "monthly" => Ok(Schedule::monthly(time)),
        "every_x_minutes" => {
            let interval =
                interval.ok_or_else(|| eyre!("An --interval is required for every_x_minutes"))?;
            Ok(Schedule::every_minutes(interval, time))
        }
        other => Err(eyre!("Unknown frequency: {}", other)),
    }
}

async fn handle_list(config: &Config, status: Option<&str>) -> Result<()> {
    let repo = open_repository(config)?;
    let tasks = repo.list_all().await?;

    let tasks: Vec<Task> = match status {
        Some(filter) => tasks
            .into_iter()
            .filter(|t| t.status.as_str() == filter)
            .collect(),
        None => tasks,
    };

    if tasks.is_empty() {
        println!("{}", "No tasks".yellow());
        return Ok(());
    }

    for task in tasks {
        let status = colored_status(task.status);
        let schedule = task
            .schedule
            .as_ref()
            .map(|s| s.frequency.as_str())
            .unwrap_or("ad-hoc");
        let next = task
            .next_execution_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {:<10} {:<16} next: {:<17} {}",
            task.id.bold(),
            status,
            schedule,
            next,
            task.description
        );
    }
    Ok(())
}

fn colored_status(status: TaskStatus) -> ColoredString {
    match status {
        TaskStatus::Pending => status.as_str().yellow(),
        TaskStatus::Running => status.as_str().cyan(),
        TaskStatus::Recurring => status.as_str().blue(),
        TaskStatus::Completed => status.as_str().green(),
        TaskStatus::Failed => status.as_str().red(),
    }
}

async fn handle_deactivate(config: &Config, id: &str) -> Result<()> {
    let repo = open_repository(config)?;
    repo.set_active(id, false).await?;
    println!("{} {}", "Deactivated task".green(), id.bold());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref())?;

    run_application(&cli, &config).await
}
