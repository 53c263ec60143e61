use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use calbridge::CalendarDispatcher;
use calbridge_core::config::CalbridgeConfig;
use calbridge_core::date_range::DateRange;
use calbridge_core::target::{BackendTarget, DEFAULT_CALENDAR_ID, RemoteTarget};
use calbridge_core::{AddMethod, EventModel};
use calbridge_provider_google::google::BrowserSurface;
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;

#[derive(Parser)]
#[command(name = "calbridge")]
#[command(about = "Add, remove and list events in your local calendar and Google Calendar")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Targets {
    /// Use the Google account signed in with this OAuth client id
    #[arg(long, value_name = "CLIENT_ID")]
    google: Option<String>,

    /// Google calendar to use
    #[arg(long, default_value = DEFAULT_CALENDAR_ID, requires = "google")]
    calendar: String,

    /// Use the local calendar too (it is used by default when --google is absent)
    #[arg(long)]
    local: bool,
}

#[derive(Args)]
struct When {
    /// Start date/time (e.g., "2025-03-20T15:00" or RFC 3339)
    #[arg(short, long)]
    start: String,

    /// End date/time
    #[arg(short, long, conflicts_with = "duration")]
    end: Option<String>,

    /// Duration (e.g., "30m", "1h", "2h 30m"); one hour when neither this nor --end is given
    #[arg(short, long)]
    duration: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an event
    Add {
        title: String,

        #[command(flatten)]
        when: When,

        /// Event description (HTML is rendered to text in the local calendar)
        #[arg(long)]
        description: Option<String>,

        /// Event location (local calendar only)
        #[arg(short, long)]
        location: Option<String>,

        /// Event URL (local calendar only)
        #[arg(long)]
        url: Option<String>,

        /// Reminder, in minutes before start (local calendar only)
        #[arg(long)]
        alarm: Option<i64>,

        #[command(flatten)]
        targets: Targets,
    },
    /// Remove the event matching an id, or a title and start/end
    Remove {
        title: String,

        #[command(flatten)]
        when: When,

        /// Event id, if known
        #[arg(long)]
        id: Option<String>,

        /// Search from this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Search until this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        #[command(flatten)]
        targets: Targets,
    },
    /// List events
    List {
        /// Show events from this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Show events until this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        #[command(flatten)]
        targets: Targets,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    calbridge::logging::init()?;

    let cli = Cli::parse();
    let config = CalbridgeConfig::load()?;
    let tz = config.resolve_time_zone()?;
    let dispatcher = CalendarDispatcher::from_config(&config)?;

    match cli.command {
        Commands::Add {
            title,
            when,
            description,
            location,
            url,
            alarm,
            targets,
        } => {
            let (start, end) = when.resolve(tz)?;
            let mut event = EventModel::new(start, end, title);
            event.description = description;
            event.location = location;
            event.url = url;
            event.alarm_minutes = alarm;

            let failures = AtomicUsize::new(0);
            dispatcher
                .add(
                    AddMethod::Easy(event),
                    &targets.resolve(),
                    report_success,
                    |target, error| report_error(&failures, target, error),
                )
                .await;
            finish(failures.into_inner())
        }
        Commands::Remove {
            title,
            when,
            id,
            from,
            to,
            targets,
        } => {
            let (start, end) = when.resolve(tz)?;
            let mut event = EventModel::new(start, end, title);
            event.id = id;

            let range = match (from, to) {
                (None, None) => None,
                (from, to) => Some(
                    DateRange::from_args(from.as_deref(), to.as_deref())
                        .map_err(|e| anyhow::anyhow!(e))?,
                ),
            };

            let failures = AtomicUsize::new(0);
            dispatcher
                .remove(
                    &event,
                    &targets.resolve(),
                    range,
                    report_success,
                    |target, error| report_error(&failures, target, error),
                )
                .await;
            finish(failures.into_inner())
        }
        Commands::List { from, to, targets } => {
            let range =
                DateRange::from_args(from.as_deref(), to.as_deref()).map_err(|e| anyhow::anyhow!(e))?;

            for target in targets.resolve() {
                let mut events = dispatcher
                    .events(&target, &range)
                    .await
                    .with_context(|| format!("Failed to list events of {}", target))?;
                events.sort_by_key(|e| e.start);

                println!("{}", target.to_string().bold());
                if events.is_empty() {
                    println!("  {}", "No events found".dimmed());
                }
                for event in &events {
                    let start = event.start.with_timezone(&tz).format("%a %b %-d %H:%M");
                    let id = format!("[{}]", event.id.as_deref().unwrap_or("-"));
                    println!("  {} {} {}", start, event.title, id.dimmed());
                }
            }
            Ok(())
        }
    }
}

impl Targets {
    fn resolve(self) -> Vec<BackendTarget> {
        let mut targets = Vec::new();

        if self.local || self.google.is_none() {
            targets.push(BackendTarget::Native);
        }
        if let Some(client_id) = self.google {
            let remote = RemoteTarget::new(Arc::new(BrowserSurface), client_id)
                .with_calendar_id(self.calendar);
            targets.push(BackendTarget::Remote(remote));
        }

        targets
    }
}

impl When {
    fn resolve(&self, tz: Tz) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let start = parse_datetime(&self.start, tz)?;

        let end = if let Some(end) = &self.end {
            parse_datetime(end, tz)?
        } else if let Some(duration) = &self.duration {
            let duration = humantime::parse_duration(duration)
                .with_context(|| format!("Invalid duration '{}'", duration))?;
            start + Duration::from_std(duration).context("Duration is too long")?
        } else {
            start + Duration::hours(1)
        };

        if end < start {
            anyhow::bail!("Event ends before it starts");
        }

        Ok((start, end))
    }
}

/// RFC 3339, or a wall-clock "YYYY-MM-DDTHH:MM" in `tz`.
fn parse_datetime(input: &str, tz: Tz) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M"))
        .with_context(|| format!("Invalid date/time '{}'. Expected YYYY-MM-DDTHH:MM", input))?;

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("{} does not exist in {}", input, tz))
}

fn report_success(target: &BackendTarget, status: String) {
    println!("{} {}: {}", "✓".green(), target, status);
}

fn report_error(failures: &AtomicUsize, target: &BackendTarget, error: calbridge_core::error::CalendarError) {
    failures.fetch_add(1, Ordering::SeqCst);
    println!("{} {}: {}", "✗".red(), target, error);
}

fn finish(failures: usize) -> Result<()> {
    if failures > 0 {
        anyhow::bail!("{} target(s) failed", failures);
    }
    Ok(())
}
